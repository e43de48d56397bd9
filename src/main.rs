use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use webhook_catcher::args::TopLevelCmd;
use webhook_catcher::{logging, run_cli};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Launched with no arguments at all (e.g. double-clicked): ask for the mode
    let interactive = std::env::args_os().len() == 1;
    let args: TopLevelCmd = argh::from_env();
    let log_guard = logging::init(args.verbose, args.color(), args.log_file.as_deref())?;

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C");
            ctrl_c_token.cancel();
        }
    });

    if let Err(e) = run_cli(args, interactive, cancel_token).await {
        error!("{e}");
        drop(log_guard);
        std::process::exit(1);
    }

    info!("Shutting down gracefully...");
    Ok(())
}
