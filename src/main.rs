use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

use scout_config::{log_level_to_filter, CapabilityMode, Config};
use scout_server::{DebugServer, ToolRequest};

/// Parsed command-line options.
struct Options {
    mode: Option<CapabilityMode>,
    config_path: Option<PathBuf>,
    log_level: Option<String>,
}

const USAGE: &str = "usage: scout [--mode readonly|full] [--config <path>] [--log-level <level>]

Speaks the tool protocol on stdin/stdout; logs go to stderr.";

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options {
        mode: None,
        config_path: None,
        log_level: None,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--mode" => {
                let value = iter.next().context("--mode requires a value")?;
                options.mode = Some(
                    CapabilityMode::parse(value)
                        .with_context(|| format!("invalid mode {value:?}: use readonly or full"))?,
                );
            }
            "--config" => {
                let value = iter.next().context("--config requires a path")?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--log-level" => {
                let value = iter.next().context("--log-level requires a value")?;
                options.log_level = Some(value.clone());
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }
    Ok(options)
}

fn load_config(options: &Options) -> Result<Config> {
    let mut config = Config::load(options.config_path.as_deref())
        .context("failed to load server configuration")?;
    // Flags override the file.
    if let Some(mode) = options.mode {
        config.mode = mode;
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

/// Serve the tool protocol over stdio: one JSON object per line in, one
/// JSON reply per line out. The protocol never fails; malformed input gets
/// an error payload like any other tool error.
async fn serve(server: &DebugServer) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => {
                let name = value
                    .get("tool")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default()
                    .to_string();
                let arguments = value
                    .get("arguments")
                    .and_then(|a| a.as_object())
                    .cloned()
                    .unwrap_or_default();

                if name == "list_tools" {
                    serde_json::json!({ "tools": server.tools() })
                } else {
                    server.dispatch(&ToolRequest::new(name, arguments)).await
                }
            }
            Err(e) => scout_server::DebugError::invalid_json(
                "request",
                &e,
                r#"{"tool": "debug_list_sessions", "arguments": {}}"#,
            )
            .to_payload(),
        };

        let mut bytes = serde_json::to_vec(&reply)?;
        bytes.push(b'\n');
        stdout.write_all(&bytes).await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_args(&args)?;
    let config = load_config(&options)?;

    // Logs go to stderr; stdout carries the tool protocol.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level_to_filter(&config.log_level).into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!(
        mode = ?config.mode,
        max_sessions = config.max_sessions,
        "scout starting"
    );

    let server = DebugServer::new(config);
    let result = serve(&server).await;
    server.close().await;

    match result {
        Ok(()) => {
            info!("scout exiting cleanly");
            Ok(())
        }
        Err(e) => {
            error!("serve loop failed: {e:#}");
            Err(e)
        }
    }
}

fn main() {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("scout: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run()) {
        eprintln!("scout: {e:#}");
        std::process::exit(1);
    }
}
