use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::args::TopLevelCmd;
use crate::catcher::{Catcher, Console};
use crate::credentials::{CredentialResolver, TOKEN_VAR};
use crate::env_file;
use crate::errors::AppError;
use crate::listener::{serve, Binder, Endpoint, RelayOptions};
use crate::prompt::Prompt;

/// Runtime options for [`run`], independent of how they were parsed.
#[derive(Debug, Clone)]
pub struct Options {
    pub host: String,
    pub port: u16,
    pub tunnel: bool,
    pub relay_token: Option<String>,
    pub relay_region: Option<String>,
    pub relay_domain: Option<String>,
    pub env_file: PathBuf,
    /// Environment variable holding the authtoken
    pub token_var: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            tunnel: false,
            relay_token: None,
            relay_region: None,
            relay_domain: None,
            env_file: PathBuf::from(".env"),
            token_var: TOKEN_VAR.into(),
        }
    }
}

impl From<&TopLevelCmd> for Options {
    fn from(cmd: &TopLevelCmd) -> Self {
        Self {
            host: cmd.host.clone(),
            port: cmd.port,
            tunnel: cmd.tunnel,
            relay_token: cmd.relay_authtoken.clone(),
            relay_region: optional(&cmd.relay_region),
            relay_domain: optional(&cmd.relay_domain),
            env_file: cmd.env_file.clone(),
            ..Default::default()
        }
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Loads the env file, picks the listener and serves until `cancel_token` fires.
pub async fn run(
    options: Options,
    binder: &dyn Binder,
    prompt: &mut dyn Prompt,
    console: Arc<Console>,
    cancel_token: CancellationToken,
) -> Result<(), AppError> {
    if let Err(e) = env_file::load(&options.env_file) {
        warn!("{e}");
    }

    let endpoint = if options.tunnel {
        let resolver = CredentialResolver::new(
            options.relay_token.clone(),
            options.token_var.as_str(),
            options.env_file.as_path(),
        );
        let credential = resolver.resolve(prompt)?;
        resolver.remember(&credential);
        Endpoint::Relay(RelayOptions {
            token: credential.token,
            region: options.relay_region.clone(),
            domain: options.relay_domain.clone(),
        })
    } else {
        Endpoint::Local {
            host: options.host.clone(),
            port: options.port,
        }
    };

    info!("Webhook Catcher is running!");
    if options.tunnel {
        info!("Starting ngrok tunnel...");
    }
    let listener = binder.bind(&endpoint).await?;
    match endpoint {
        Endpoint::Local { .. } => info!("Listening on {}", listener.url()),
        Endpoint::Relay(_) => info!("Public URL: {}", listener.url()),
    }
    info!("All incoming requests will be printed below. Press Ctrl+C to stop.");

    serve(listener, Catcher::new(console), cancel_token).await
}
