//! Wire-shape normalization.
//!
//! Upstream answers in three shapes: plain JSON, JSONP (`_preloadCallback({...})`)
//! and loose JSON carrying the bare token `undefined` as a value. Everything is
//! reduced to one JSON object here, then wrapped in an [`ApiResult`].

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, error};

use crate::constants::{CODE_OK, CODE_UNKNOWN, INTERNAL_HTTP_STATUS_KEY, INTERNAL_META_KEY};
use crate::error::{ParseError, QzoneError, Result};
use crate::models::value_string;

static RE_CALLBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)callback\s*\(\s*([^{]*(\{.*\})[^)]*)\s*\)").unwrap());

static RE_UNDEFINED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([:\[,]\s*)undefined(\s*[,}\]])").unwrap());

/// Reduce a raw response body to a JSON object.
///
/// Shape detection runs in order: callback envelope, then the span between
/// the first `{` and the last `}`. A strict parse is attempted before the
/// lenient JSON5 one.
pub fn parse_response(text: &str) -> std::result::Result<Map<String, Value>, ParseError> {
    let span = match RE_CALLBACK.captures(text).and_then(|caps| caps.get(2)) {
        Some(inner) => inner.as_str(),
        None => match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => &text[start..=end],
            _ => text,
        },
    };

    let json = undefined_to_null(span);
    let json = json.trim();
    if json.is_empty() {
        return Err(ParseError::Empty);
    }

    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(strict) => json5::from_str(json).map_err(|lenient| {
            error!(strict = %strict, lenient = %lenient, "JSON parse failed");
            ParseError::InvalidJson(strict.to_string())
        })?,
    };

    match value {
        Value::Object(map) => Ok(map),
        other => {
            debug!(kind = %json_kind(&other), "JSON root is not an object");
            Err(ParseError::NonObject)
        }
    }
}

/// Rewrite `undefined` in value position only; string contents are left alone.
fn undefined_to_null(span: &str) -> String {
    let mut json = span.to_string();
    // Adjacent items share a delimiter, so one pass can miss every other one
    while RE_UNDEFINED.is_match(&json) {
        json = RE_UNDEFINED.replace_all(&json, "${1}null${2}").into_owned();
    }
    json
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Canonical result
// =============================================================================

/// Which upstream fields carry the code, message and payload of a response.
#[derive(Debug, Clone, Copy)]
pub struct ResultKeys {
    pub code_key: &'static str,
    pub msg_keys: &'static [&'static str],
    /// Take `data` from this sub-object instead of the whole body
    pub data_key: Option<&'static str>,
    pub success_code: i64,
}

impl Default for ResultKeys {
    fn default() -> Self {
        Self {
            code_key: "code",
            msg_keys: &["message", "msg"],
            data_key: None,
            success_code: CODE_OK,
        }
    }
}

impl ResultKeys {
    /// Image upload endpoint reports `ret` / `msg`.
    pub fn upload() -> Self {
        Self {
            code_key: "ret",
            msg_keys: &["msg"],
            ..Default::default()
        }
    }
}

/// Canonical outcome of one upstream call.
///
/// `ok` is true iff `code` equals the success sentinel. A failed result has
/// empty `data` and a populated `message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResult {
    pub ok: bool,
    pub code: i64,
    pub message: Option<String>,
    pub data: Map<String, Value>,
    #[serde(skip)]
    pub raw: Map<String, Value>,
    /// HTTP status injected by the executor, when known
    pub http_status: Option<u16>,
}

impl ApiResult {
    pub fn from_raw(raw: Map<String, Value>) -> Self {
        Self::from_raw_with(raw, ResultKeys::default())
    }

    pub fn from_raw_with(raw: Map<String, Value>, keys: ResultKeys) -> Self {
        let code = read_code(raw.get(keys.code_key));
        let http_status = raw
            .get(INTERNAL_META_KEY)
            .and_then(|meta| meta.get(INTERNAL_HTTP_STATUS_KEY))
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok());

        if code == keys.success_code {
            let data = match keys.data_key {
                None => {
                    let mut data = raw.clone();
                    data.remove(INTERNAL_META_KEY);
                    data
                }
                Some(key) => raw
                    .get(key)
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            };
            return Self {
                ok: true,
                code,
                message: None,
                data,
                raw,
                http_status,
            };
        }

        let message = read_message(&raw, keys.msg_keys).unwrap_or_else(|| code.to_string());
        Self {
            ok: false,
            code,
            message: Some(message),
            data: Map::new(),
            raw,
            http_status,
        }
    }

    /// A failed result carrying only the error's code and message.
    pub fn from_error(err: &QzoneError) -> Self {
        let http_status = match err {
            QzoneError::Transport { status, .. } => Some(*status),
            _ => None,
        };
        Self {
            ok: false,
            code: err.code(),
            message: Some(err.to_string()),
            data: Map::new(),
            raw: Map::new(),
            http_status,
        }
    }

    /// Field of `data`, `None` on failure.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if !self.ok {
            return None;
        }
        self.data.get(key)
    }

    /// Payload of a successful result, or the matching error.
    pub fn into_data(self) -> Result<Map<String, Value>> {
        if self.ok {
            Ok(self.data)
        } else {
            Err(QzoneError::from_failed(&self))
        }
    }
}

impl fmt::Display for ApiResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ok {
            write!(f, "ok (code={})", self.code)
        } else {
            write!(
                f,
                "failed (code={}): {}",
                self.code,
                self.message.as_deref().unwrap_or("-")
            )
        }
    }
}

/// Business code as an integer: ints, floats (`-3000.0`) and numeric strings.
pub(crate) fn code_value(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

fn read_code(value: Option<&Value>) -> i64 {
    code_value(value).unwrap_or(CODE_UNKNOWN)
}

/// First non-empty message field at the top level, then under `data`.
fn read_message(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let nested = raw.get("data").and_then(Value::as_object);
    [Some(raw), nested]
        .into_iter()
        .flatten()
        .flat_map(|scope| keys.iter().filter_map(move |key| scope.get(*key)))
        .map(|value| value_string(Some(value)))
        .find(|message| !message.is_empty())
}
