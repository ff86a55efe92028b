mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use qzone_client::{ApiResult, Comment, Post, PublishReceipt, QzoneApi, StaticCookies};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[derive(Parser)]
#[command(name = "qzone")]
#[command(about = "Operate a QQ Zone account from the terminal", long_about = None)]
struct Cli {
    /// Print posts as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List posts of an account
    Feeds {
        uin: i64,
        #[arg(long, default_value_t = 0)]
        pos: u32,
        #[arg(long, default_value_t = 5)]
        num: u32,
    },
    /// List the friends feed
    Recent {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one post with all comments
    Detail { uin: i64, tid: String },
    /// Like a post
    Like { uin: i64, tid: String },
    /// Comment on a post
    Comment {
        uin: i64,
        tid: String,
        content: String,
    },
    /// Reply to a comment
    Reply {
        uin: i64,
        tid: String,
        comment_uin: i64,
        comment_tid: i64,
        content: String,
    },
    /// Delete one of your own posts
    Delete { tid: String },
    /// Show recent visitors
    Visitors,
    /// Publish a post
    Publish {
        text: String,
        /// Image URL or base64:// payload, repeatable
        #[arg(long = "image")]
        images: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,qzone_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        timeout_secs = config.timeout_secs,
        max_auth_retries = config.max_auth_retries,
        "Configuration loaded"
    );

    let credentials = Arc::new(StaticCookies::new(config.cookies.expose()));
    let api = QzoneApi::new(credentials, config.client_config());

    match cli.command {
        Commands::Feeds { uin, pos, num } => {
            let posts = api.get_feeds(uin, pos, num).await?;
            print_posts(&posts, cli.json)?;
        }
        Commands::Recent { page } => {
            let posts = api.get_recent_feeds(page).await?;
            print_posts(&posts, cli.json)?;
        }
        Commands::Detail { uin, tid } => {
            let post = api.get_detail(&target(uin, tid)).await?;
            print_posts(std::slice::from_ref(&post), cli.json)?;
        }
        Commands::Like { uin, tid } => {
            report(api.like(&target(uin, tid)).await?)?;
        }
        Commands::Comment { uin, tid, content } => {
            report(api.comment(&target(uin, tid), &content).await?)?;
        }
        Commands::Reply {
            uin,
            tid,
            comment_uin,
            comment_tid,
            content,
        } => {
            let comment = Comment {
                uin: comment_uin,
                tid: comment_tid,
                ..Default::default()
            };
            report(api.reply(&target(uin, tid), &comment, &content).await?)?;
        }
        Commands::Delete { tid } => {
            report(api.delete(&tid).await?)?;
        }
        Commands::Visitors => {
            println!("{}", api.visitor_summary().await?);
        }
        Commands::Publish { text, images } => {
            let uin = api.uin().await?;
            let mut post = Post::draft(uin, "", text).with_images(images);
            let result = api.publish(&post).await?;
            if let Some(receipt) = PublishReceipt::from_result(&result) {
                post.apply_receipt(&receipt);
                println!("Published tid={}", post.tid);
            }
            report(result)?;
        }
    }

    Ok(())
}

fn target(uin: i64, tid: String) -> Post {
    Post {
        uin,
        tid,
        ..Default::default()
    }
}

fn print_posts(posts: &[Post], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(posts)?);
        return Ok(());
    }
    if posts.is_empty() {
        println!("No posts");
    }
    for post in posts {
        println!("{}\n", post.to_display());
    }
    Ok(())
}

fn report(result: ApiResult) -> Result<()> {
    println!("{result}");
    if !result.ok {
        warn!(
            code = result.code,
            http_status = ?result.http_status,
            message = result.message.as_deref().unwrap_or("-"),
            "Request failed"
        );
        bail!("request failed with code {}", result.code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qzone_client::QzoneError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context as LayerContext, Layer};

    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn count_warnings(f: impl FnOnce() -> Result<()>) -> (Result<()>, usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(count.clone()));
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, count.load(Ordering::SeqCst))
    }

    #[test]
    fn test_report_failure_logs_and_errors() {
        let failed = ApiResult::from_error(&QzoneError::PermissionDenied {
            message: "permission denied".into(),
        });

        let (result, warnings) = count_warnings(|| report(failed));

        let err = result.unwrap_err();
        assert!(err.to_string().contains("403"));
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_report_success_is_quiet() {
        let ok = ApiResult::from_raw(json!({"code": 0}).as_object().cloned().unwrap());

        let (result, warnings) = count_warnings(|| report(ok));

        assert!(result.is_ok());
        assert_eq!(warnings, 0);
    }
}
