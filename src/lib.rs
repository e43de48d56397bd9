use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use args::TopLevelCmd;
use catcher::Console;
use errors::AppError;
use listener::NetworkBinder;
use prompt::{LinePrompt, Mode};

pub mod app;
pub mod args;
pub mod catcher;
pub mod credentials;
pub mod env_file;
pub mod errors;
pub mod listener;
pub mod logging;
pub mod pretty;
pub mod prompt;

pub use app::{run, Options};

/// Runs the catcher from parsed command line arguments on stdin/stdout.
///
/// `interactive` asks for the listen mode before starting, used when the
/// binary was launched without any arguments.
pub async fn run_cli(
    args: TopLevelCmd,
    interactive: bool,
    cancel_token: CancellationToken,
) -> Result<(), AppError> {
    let mut prompt = LinePrompt::stdio();
    let mut options = Options::from(&args);
    if interactive {
        options.tunnel = prompt::choose_mode(&mut prompt)? == Mode::Tunnel;
    }
    let console = Arc::new(Console::stdout(args.color()));
    run(options, &NetworkBinder, &mut prompt, console, cancel_token).await
}
