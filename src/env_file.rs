//! Reading and updating `KEY=VALUE` files (`.env` style).

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::AppError;

/// Parses `contents` into ordered `(key, value)` pairs.
///
/// Blank lines, `#` comments and lines without a key are skipped.
/// Keys and values are trimmed and one layer of matching quotes is
/// removed from the value.
pub fn parse(contents: &str) -> Vec<(String, String)> {
    normalize(contents)
        .lines()
        .filter_map(|raw| split_entry(raw.trim()))
        .map(|(key, value)| (key.to_owned(), unquote(value).to_owned()))
        .collect()
}

/// Loads the file at `path` into the process environment.
///
/// A missing file is a no-op. Variables that are already set are left
/// untouched, so the environment always wins over the file.
/// Returns the number of variables that were set.
pub fn load(path: &Path) -> Result<usize, AppError> {
    let Some(contents) = read_optional(path)? else {
        debug!("No env file at {}", path.display());
        return Ok(0);
    };
    let mut applied = 0;
    for (key, value) in parse(&contents) {
        if std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(&key, value);
        applied += 1;
    }
    debug!("Loaded {applied} variable(s) from {}", path.display());
    Ok(applied)
}

/// Finds `key` in the file without touching the environment.
pub fn lookup(path: &Path, key: &str) -> Result<Option<String>, AppError> {
    let Some(contents) = read_optional(path)? else {
        return Ok(None);
    };
    Ok(parse(&contents)
        .into_iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v))
}

/// Inserts or replaces `key` in the file at `path`.
///
/// Existing lines keep their order, a new key is appended at the end and
/// the key appears at most once afterwards.
/// The new contents are written to a temporary file next to the target
/// (owner read/write only) and renamed over it.
pub fn upsert(path: &Path, key: &str, value: &str) -> Result<(), AppError> {
    let entry = format!("{key}={value}");
    let mut lines: Vec<String> = match read_optional(path)? {
        Some(contents) => normalize(&contents).lines().map(str::to_owned).collect(),
        None => Vec::new(),
    };

    // First occurrence is replaced in place, later duplicates are dropped
    let mut updated = false;
    lines.retain_mut(|line| {
        if !matches!(split_entry(line.trim()), Some((k, _)) if k == key) {
            return true;
        }
        if updated {
            return false;
        }
        line.clone_from(&entry);
        updated = true;
        true
    });
    if !updated {
        lines.push(entry);
    }

    let mut contents = lines.join("\n");
    contents.push('\n');
    write_private(path, contents.as_bytes()).map_err(|source| AppError::WriteEnvFile {
        path: path.to_owned(),
        source,
    })
}

fn read_optional(path: &Path) -> Result<Option<String>, AppError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(AppError::ReadEnvFile {
            path: path.to_owned(),
            source,
        }),
    }
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    // NamedTempFile is created with 0600 on Unix
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn normalize(contents: &str) -> String {
    contents.replace("\r\n", "\n")
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_skips_comments_and_bad_lines() {
        let contents = "# comment\nFOO=bar\nQUOTED=\"baz qux\"\nSPACED = value\nBADLINE\n\n=nokey\n";
        assert_eq!(
            parse(contents),
            pairs(&[("FOO", "bar"), ("QUOTED", "baz qux"), ("SPACED", "value")])
        );
    }

    #[test]
    fn parse_handles_crlf_and_single_quotes() {
        let contents = "A='one'\r\nB=two=three\r\nC=\"mismatched'\r\n";
        assert_eq!(
            parse(contents),
            pairs(&[("A", "one"), ("B", "two=three"), ("C", "\"mismatched'")])
        );
    }

    #[test]
    fn parse_strips_only_one_layer_of_quotes() {
        assert_eq!(parse("X=\"'inner'\""), pairs(&[("X", "'inner'")]));
    }

    #[test]
    fn load_sets_environment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# comment\nWHC_LOAD_FOO=bar\nWHC_LOAD_QUOTED=\"baz qux\"\nWHC_LOAD_SPACED = value\nWHC_LOAD_BADLINE\n",
        )
        .unwrap();

        assert_eq!(load(&path).unwrap(), 3);
        assert_eq!(std::env::var("WHC_LOAD_FOO").unwrap(), "bar");
        assert_eq!(std::env::var("WHC_LOAD_QUOTED").unwrap(), "baz qux");
        assert_eq!(std::env::var("WHC_LOAD_SPACED").unwrap(), "value");
        assert!(std::env::var_os("WHC_LOAD_BADLINE").is_none());
    }

    #[test]
    fn load_keeps_existing_variables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "WHC_LOAD_EXISTING=from_file\n").unwrap();
        std::env::set_var("WHC_LOAD_EXISTING", "from_env");

        assert_eq!(load(&path).unwrap(), 0);
        assert_eq!(std::env::var("WHC_LOAD_EXISTING").unwrap(), "from_env");
    }

    #[test]
    fn load_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load(&dir.path().join("nope.env")).unwrap(), 0);
    }

    #[test]
    fn upsert_replaces_existing_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# token\nFOO=bar\nOTHER=1\n").unwrap();

        upsert(&path, "FOO", "new").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "# token\nFOO=new\nOTHER=1\n");
        assert!(!contents.contains("FOO=bar"));
    }

    #[test]
    fn upsert_collapses_duplicate_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "FOO=a\nBAR=1\n FOO = b\nFOOD=c\n").unwrap();

        upsert(&path, "FOO", "new").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "FOO=new\nBAR=1\nFOOD=c\n");
        assert_eq!(contents.matches("FOO=").count(), 1);
        assert_eq!(lookup(&path, "FOO").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn upsert_appends_new_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "FOO=bar\r\n# keep me\r\n").unwrap();

        upsert(&path, "NEW", "x").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "FOO=bar\n# keep me\nNEW=x\n");
    }

    #[test]
    fn upsert_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");

        upsert(&path, "NGROK_AUTHTOKEN", "tok").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "NGROK_AUTHTOKEN=tok\n");
        assert_eq!(lookup(&path, "NGROK_AUTHTOKEN").unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn upsert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");

        upsert(&path, "K", "1").unwrap();
        upsert(&path, "K", "2").unwrap();
        upsert(&path, "K", "2").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "K=2\n");
    }

    #[cfg(unix)]
    #[test]
    fn upsert_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        upsert(&path, "SECRET", "s").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn lookup_ignores_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "A=1\nB='2'\n").unwrap();

        assert_eq!(lookup(&path, "B").unwrap().as_deref(), Some("2"));
        assert_eq!(lookup(&path, "C").unwrap(), None);
        assert_eq!(lookup(&dir.path().join("missing"), "A").unwrap(), None);
    }
}
