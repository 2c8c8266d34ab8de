//! donation-scan: 统计视频评论中的捐赠金额的命令行工具
//!
//! Usage:
//!   donation-scan <video-id-or-url> [--comments <path>] [--config <path>] [--json]

use anyhow::Context;
use donation_scan::report::render_text;
use donation_scan::{AnalyzerConfig, DonationAnalyzer, JsonLinesSource};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    target: String,
    comments: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            println!("{}", usage());
            return Ok(());
        }
        Err(msg) => {
            eprintln!("Error: {msg}");
            eprintln!();
            eprintln!("{}", usage());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = AnalyzerConfig::load_or_default(cli.config.as_deref());
    let analyzer = DonationAnalyzer::new(config).context("invalid analyzer configuration")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            on_interrupt.cancel();
        }
    });

    info!(video = %cli.target, "analyzing comments");
    let reader: Box<dyn AsyncBufRead + Send + Unpin> = match &cli.comments {
        Some(path) => match tokio::fs::File::open(path).await {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                // Unreachable source: report on nothing rather than fail.
                error!(path = %path.display(), error = %e, "could not open comment source");
                Box::new(tokio::io::empty())
            }
        },
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut source = JsonLinesSource::new(reader);

    let report = analyzer.analyze(&mut source, &cancel).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report, analyzer.config()));
    }
    Ok(())
}

/// `Ok(None)` means help was requested.
fn parse_args(args: &[String]) -> Result<Option<CliArgs>, String> {
    let mut cli = CliArgs::default();
    let mut target = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "help" | "--help" | "-h" => return Ok(None),
            "--json" => cli.json = true,
            "--comments" => {
                let path = iter.next().ok_or("--comments needs a path")?;
                cli.comments = Some(PathBuf::from(path));
            }
            "--config" => {
                let path = iter.next().ok_or("--config needs a path")?;
                cli.config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option: {flag}")),
            value => {
                if target.replace(value.to_string()).is_some() {
                    return Err(format!("unexpected argument: {value}"));
                }
            }
        }
    }
    cli.target = target.ok_or("missing <video-id-or-url>")?;
    Ok(Some(cli))
}

fn usage() -> &'static str {
    r#"donation-scan: 统计视频评论中的捐赠金额

USAGE:
    donation-scan <video-id-or-url> [OPTIONS]

OPTIONS:
    --comments <path>    Read comments as JSON lines from <path> (default: stdin)
    --config <path>      JSON or YAML analyzer configuration
    --json               Print the report as JSON
    --help               Show this help message

ENVIRONMENT:
    RUST_LOG                          Log filter (default: info)
    DONATION_MAX_WORKERS              Worker pool size
    DONATION_BATCH_SIZE               Comments per batch
    DONATION_BATCH_TIMEOUT_SECS       Wait budget for draining older batches
    DONATION_PROCESSING_TIMEOUT_SECS  Wait budget per batch
    DONATION_RATE_API                 Exchange-rate endpoint
    DONATION_REFERENCE_CURRENCY       Currency totals are converted into"#
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_positional_and_flags() {
        let cli = parse_args(&args(&["abc123", "--json", "--comments", "c.jsonl"]))
            .unwrap()
            .unwrap();
        assert_eq!(cli.target, "abc123");
        assert!(cli.json);
        assert_eq!(cli.comments, Some(PathBuf::from("c.jsonl")));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_missing_target_is_error() {
        assert!(parse_args(&[]).is_err());
        assert!(parse_args(&args(&["--json"])).is_err());
    }

    #[test]
    fn test_help() {
        assert_eq!(parse_args(&args(&["--help"])), Ok(None));
    }

    #[test]
    fn test_rejects_extra_and_unknown() {
        assert!(parse_args(&args(&["a", "b"])).is_err());
        assert!(parse_args(&args(&["a", "--verbose"])).is_err());
        assert!(parse_args(&args(&["a", "--config"])).is_err());
    }
}
