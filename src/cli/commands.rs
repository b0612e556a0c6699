use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::app::{AppContext, McUpdateError, Result};
use crate::config::{format_interval, parse_interval, ConfigError};
use crate::daemon;
use crate::handlers::{Caller, Command};

/// Seeds every feed, then polls until SIGINT/SIGTERM.
pub async fn run(ctx: Arc<AppContext>, interval: Option<&str>, console: bool) -> Result<()> {
    let mut daemon_config = ctx.daemon_config();
    if let Some(interval) = interval {
        let secs = parse_interval(interval).map_err(ConfigError::Invalid)?;
        daemon_config.poll_interval = Duration::from_secs(secs);
    }

    info!(
        "mcupdate starting (interval: {}, feeds: {})",
        format_interval(daemon_config.poll_interval.as_secs()),
        ctx.engine.feeds().len()
    );

    let seed = ctx.engine.initialize().await;
    info!(
        seeded = seed.seeded.len(),
        failed = seed.failed.len(),
        "Baseline recorded"
    );

    let poller = daemon::spawn(ctx.engine.clone(), daemon_config);
    let console_task = console.then(|| tokio::spawn(run_console(ctx.clone())));

    daemon::shutdown_signal().await;
    info!("Shutdown requested");

    if let Some(task) = console_task {
        task.abort();
    }
    poller.stop().await;

    info!("mcupdate stopped");
    Ok(())
}

/// Dispatches `<caller-id> <command>` lines from stdin until EOF.
async fn run_console(ctx: Arc<AppContext>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Console input error: {}", e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(char::is_whitespace) {
            Some((caller, command)) => {
                let reply = ctx.handler.dispatch(&Caller::user(caller), command).await;
                println!("{}", reply.text);
            }
            None => println!("Usage: <caller-id> <command>"),
        }
    }
}

/// Runs a single command as the local operator against persisted state.
pub async fn one_shot(ctx: &AppContext, command: Command) -> Result<()> {
    ctx.engine.load();
    let reply = ctx.handler.handle(&Caller::Operator, command).await;

    if reply.ok {
        println!("{}", reply.text);
        Ok(())
    } else {
        Err(McUpdateError::Other(reply.text))
    }
}
