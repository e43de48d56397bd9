use argh::FromArgs;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
/// Print every HTTP request that reaches this server. Run without arguments to pick a mode interactively.
pub struct TopLevelCmd {
    /// host/interface to bind (e.g. 0.0.0.0)
    #[argh(option, default = "String::from(\"127.0.0.1\")")]
    pub host: String,
    /// port to listen on
    #[argh(option, short = 'p', default = "3000")]
    pub port: u16,
    /// expose the server through an ngrok tunnel and print its public URL
    #[argh(switch)]
    pub tunnel: bool,
    /// ngrok authtoken (defaults to the NGROK_AUTHTOKEN env var)
    #[argh(option)]
    pub relay_authtoken: Option<String>,
    /// ngrok region, e.g. us, eu, ap
    #[argh(option)]
    pub relay_region: Option<String>,
    /// reserved ngrok domain to use
    #[argh(option)]
    pub relay_domain: Option<String>,
    /// env file to load at startup and save the authtoken into
    #[argh(option, default = "PathBuf::from(\".env\")")]
    pub env_file: PathBuf,
    /// don't color request reports or logs
    #[argh(switch)]
    pub no_color: bool,
    /// log debug messages
    #[argh(switch, short = 'v')]
    pub verbose: bool,
    /// also write logs to this file (rotated at 5 MiB)
    #[argh(option)]
    pub log_file: Option<PathBuf>,
}

impl TopLevelCmd {
    /// Colors are on unless disabled by flag or a non-empty `NO_COLOR`.
    pub fn color(&self) -> bool {
        let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        !self.no_color && !no_color_env
    }
}
