use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env_file;
use crate::errors::{AppError, TOKEN_URL};
use crate::prompt::Prompt;

pub const TOKEN_VAR: &str = "NGROK_AUTHTOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    Explicit,
    Environment,
    PersistedFile,
    Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub origin: TokenOrigin,
}

/// Finds the tunnel authtoken, trying each source in priority order:
/// explicit value, environment, env file, then asking the user.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    explicit: Option<String>,
    var: String,
    env_file: PathBuf,
}

impl CredentialResolver {
    pub fn new(explicit: Option<String>, var: impl Into<String>, env_file: impl Into<PathBuf>) -> Self {
        Self {
            explicit,
            var: var.into(),
            env_file: env_file.into(),
        }
    }

    /// Everything except the interactive prompt.
    pub fn resolve_quietly(&self) -> Option<Credential> {
        if let Some(token) = non_empty(self.explicit.as_deref()) {
            return Some(Credential::new(token, TokenOrigin::Explicit));
        }
        if let Some(token) = non_empty(std::env::var(&self.var).ok().as_deref()) {
            return Some(Credential::new(token, TokenOrigin::Environment));
        }
        match env_file::lookup(&self.env_file, &self.var) {
            Ok(value) => non_empty(value.as_deref())
                .map(|token| Credential::new(token, TokenOrigin::PersistedFile)),
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }

    pub fn resolve(&self, prompt: &mut dyn Prompt) -> Result<Credential, AppError> {
        if let Some(credential) = self.resolve_quietly() {
            debug!("Using authtoken from {:?}", credential.origin);
            return Ok(credential);
        }
        let answer = ask_for_token(prompt).map_err(AppError::Prompt)?;
        non_empty(Some(answer.as_str()))
            .map(|token| Credential::new(token, TokenOrigin::Prompt))
            .ok_or(AppError::MissingToken)
    }

    /// Exports a freshly entered token and saves it for future runs.
    ///
    /// Saving is best-effort, the token stays usable for this process either way.
    pub fn remember(&self, credential: &Credential) {
        if credential.origin != TokenOrigin::Prompt {
            return;
        }
        std::env::set_var(&self.var, &credential.token);
        save_token(&self.env_file, &self.var, &credential.token);
    }
}

impl Credential {
    fn new(token: &str, origin: TokenOrigin) -> Self {
        Self {
            token: token.to_owned(),
            origin,
        }
    }
}

fn ask_for_token(prompt: &mut dyn Prompt) -> std::io::Result<String> {
    prompt.say("[INFO] Welcome to Webhook Catcher!")?;
    prompt.say("[INFO] It looks like this is your first time enabling tunneling.")?;
    prompt.say(&format!("[PROMPT] Open {TOKEN_URL}"))?;
    prompt.ask("[PROMPT] Paste your ngrok Authtoken here: ")
}

fn save_token(path: &Path, var: &str, token: &str) {
    match env_file::upsert(path, var, token) {
        Ok(()) => info!("Saved {var} to {} for future runs.", path.display()),
        Err(e) => warn!("Failed to persist token: {e}"),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::LinePrompt;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn prompt(input: &str) -> LinePrompt<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn explicit_wins() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("WHC_CRED_EXPLICIT", "from_env");
        let resolver = CredentialResolver::new(
            Some(" flag ".into()),
            "WHC_CRED_EXPLICIT",
            dir.path().join(".env"),
        );
        let credential = resolver.resolve(&mut prompt("")).unwrap();
        assert_eq!(credential, Credential::new("flag", TokenOrigin::Explicit));
    }

    #[test]
    fn blank_explicit_falls_through_to_environment() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("WHC_CRED_ENV", "from_env");
        let resolver =
            CredentialResolver::new(Some("  ".into()), "WHC_CRED_ENV", dir.path().join(".env"));
        let credential = resolver.resolve(&mut prompt("")).unwrap();
        assert_eq!(credential, Credential::new("from_env", TokenOrigin::Environment));
    }

    #[test]
    fn persisted_file_is_used() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "WHC_CRED_FILE=\"saved\"\n").unwrap();
        let resolver = CredentialResolver::new(None, "WHC_CRED_FILE", &path);
        assert_eq!(
            resolver.resolve_quietly(),
            Some(Credential::new("saved", TokenOrigin::PersistedFile))
        );
    }

    #[test]
    fn prompts_last_and_remembers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        let resolver = CredentialResolver::new(None, "WHC_CRED_PROMPT", &path);
        let mut prompt = prompt("typed-token\n");

        let credential = resolver.resolve(&mut prompt).unwrap();
        assert_eq!(credential, Credential::new("typed-token", TokenOrigin::Prompt));
        let shown = String::from_utf8(prompt.into_output()).unwrap();
        assert!(shown.contains(TOKEN_URL));

        resolver.remember(&credential);
        assert_eq!(std::env::var("WHC_CRED_PROMPT").unwrap(), "typed-token");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "WHC_CRED_PROMPT=typed-token\n"
        );
    }

    #[test]
    fn empty_answer_is_missing_token() {
        let dir = TempDir::new().unwrap();
        let resolver = CredentialResolver::new(None, "WHC_CRED_MISSING", dir.path().join(".env"));
        let err = resolver.resolve(&mut prompt("\n")).unwrap_err();
        assert!(matches!(err, AppError::MissingToken));
    }

    #[test]
    fn remember_skips_non_prompt_tokens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        let resolver = CredentialResolver::new(None, "WHC_CRED_SKIP", &path);
        resolver.remember(&Credential::new("x", TokenOrigin::Explicit));
        assert!(!path.exists());
        assert!(std::env::var_os("WHC_CRED_SKIP").is_none());
    }

    #[test]
    fn failed_save_still_exports() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be
        let path = dir.path().join("blocked");
        std::fs::create_dir_all(path.join("inner")).unwrap();
        let resolver = CredentialResolver::new(None, "WHC_CRED_BLOCKED", &path);
        resolver.remember(&Credential::new("still-here", TokenOrigin::Prompt));
        assert_eq!(std::env::var("WHC_CRED_BLOCKED").unwrap(), "still-here");
    }
}
