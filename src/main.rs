//! CLI for jobcast
//!
//! Subcommands:
//! - `server`: run the WebSocket status server standalone. It serves
//!   snapshots already in the configured store; live events need a producer
//!   in the same process, through `jobcast::JobcastServer::publisher`
//! - `watch`: subscribe to job ids on a running server and print every event

use anyhow::Context;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use jobcast::JobcastServer;
use jobcast::config::{Settings, load_config};
use jobcast::utils::logging;
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "jobcast")]
enum Command {
    /// Start the WebSocket server (standalone; no in-process producer)
    Server,
    /// Subscribe to one or more jobs and print their status events
    Watch {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Job id to watch; repeat for several jobs
        #[arg(long = "job-id", required = true)]
        job_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cmd = Command::parse();
    let settings = load_config().context("failed to load configuration")?;
    logging::init(&settings.log.level);

    match cmd {
        Command::Server => run_server(settings).await,
        Command::Watch { url, job_ids } => run_watch(&url, &job_ids).await,
    }
}

async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let path = settings.store.path.clone();
    let server = JobcastServer::new(settings)
        .with_context(|| format!("failed to open status store at {path}"))?;
    let (_addr, task) = server
        .start()
        .await
        .context("failed to start WebSocket server")?;

    tokio::select! {
        res = task => {
            if let Err(e) = res {
                error!(error = %e, "WebSocket server failed");
            } else {
                error!("WebSocket server exited unexpectedly.");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    server.flush().context("failed to flush status store")?;
    Ok(())
}

async fn run_watch(url: &str, job_ids: &[String]) -> anyhow::Result<()> {
    let (mut ws_stream, _response) = connect_async(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;

    for job_id in job_ids {
        let subscribe = json!({ "action": "subscribe", "job_id": job_id });
        ws_stream
            .send(WsMessage::Text(subscribe.to_string().into()))
            .await?;
    }
    info!(jobs = job_ids.len(), "watching");

    loop {
        tokio::select! {
            incoming = ws_stream.next() => match incoming {
                Some(Ok(WsMessage::Text(msg))) => println!("{}", msg.as_str()),
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!("server closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("connection failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                ws_stream.close(None).await.ok();
                break;
            }
        }
    }

    Ok(())
}
