//! Visitor summary formatter for the `cgi_get_visitor_more` payload.

use chrono::{DateTime, Local};
use serde_json::{Map, Value};

use crate::models::value_i64;

fn source_label(src: i64) -> String {
    match src {
        0 => "visited space".to_string(),
        13 => "viewed feed".to_string(),
        32 => "mobile QQ".to_string(),
        41 => "QQ intl/TIM".to_string(),
        other => format!("unknown({other})"),
    }
}

/// Markdown-table-safe cell: single line, no pipes, capped length, never empty.
fn safe_cell(text: &str, max_len: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('|', "｜");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return "-".to_string();
    }
    if cleaned.chars().count() > max_len {
        let truncated: String = cleaned.chars().take(max_len).collect();
        return format!("{truncated}…");
    }
    cleaned.to_string()
}

/// Render recent visitors as a markdown table followed by the totals line.
pub fn parse_visitors(body: &Map<String, Value>) -> String {
    let empty = Map::new();
    let data = body.get("data").and_then(Value::as_object).unwrap_or(&empty);

    let items = match data.get("items").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => return "### Recent visitors\n\nNo visitor records".to_string(),
    };

    let mut lines = vec![
        "\n### Recent visitors\n".to_string(),
        "| Time | Visitor | Source | Status | Brought by |".to_string(),
        "| --- | --- | --- | --- | --- |".to_string(),
    ];

    for visitor in items.iter().filter_map(Value::as_object) {
        let time = DateTime::from_timestamp(value_i64(visitor.get("time")), 0)
            .map(|dt| dt.with_timezone(&Local).format("%m-%d %H:%M").to_string())
            .unwrap_or_default();

        let name = visitor
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("anonymous");

        let src = visitor.get("src").and_then(Value::as_i64).unwrap_or(-1);

        let mut status = Vec::new();
        let yellow = value_i64(visitor.get("yellow"));
        if yellow > 0 {
            status.push(format!("LV{yellow}"));
        }
        if value_i64(visitor.get("is_hide_visit")) != 0 {
            status.push("hidden".to_string());
        }

        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            safe_cell(&time, 16),
            safe_cell(name, 16),
            safe_cell(&source_label(src), 12),
            safe_cell(&status.join(" / "), 12),
            remark(visitor),
        ));
    }

    lines.push(format!(
        "Today: {} visitors, last 30 days: {} visitors",
        value_i64(data.get("todaycount")),
        value_i64(data.get("totalcount"))
    ));

    lines.join("\n")
}

/// One-line note: the post that brought the visitor, else the friends who did.
fn remark(visitor: &Map<String, Value>) -> String {
    let non_blank_names = |key: &str| -> Vec<String> {
        visitor
            .get(key)
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|item| item.get("name").and_then(Value::as_str))
                    .filter(|name| !name.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    if let Some(title) = non_blank_names("shuoshuoes").first() {
        return safe_cell(&format!("post:{title}"), 30);
    }
    let friends = non_blank_names("uins");
    if friends.is_empty() {
        "-".to_string()
    } else {
        safe_cell(&friends.join(", "), 30)
    }
}
