use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crossterm::style::{StyledContent, Stylize};

use super::RequestSnapshot;
use crate::pretty::pretty_json;

const SEPARATOR_WIDTH: usize = 50;

/// Where request reports are printed.
///
/// Each report is written as one block while holding the lock, so reports
/// from concurrent requests never interleave. Writes happen on the
/// blocking pool.
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
    color: bool,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static, color: bool) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
            color,
        }
    }

    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }

    pub async fn report(&self, snapshot: &RequestSnapshot) -> io::Result<()> {
        let mut block = render(snapshot);
        if !self.color {
            block = strip_ansi_escapes::strip_str(&block);
        }
        let out = Arc::clone(&self.out);
        tokio::task::spawn_blocking(move || {
            let mut out = out
                .lock()
                .map_err(|_| io::Error::other("console lock poisoned"))?;
            out.write_all(block.as_bytes())?;
            out.flush()
        })
        .await
        .map_err(io::Error::other)?
    }
}

/// Renders the colored report block for one request.
pub fn render(snapshot: &RequestSnapshot) -> String {
    let timestamp = snapshot.received_at.format("%Y-%m-%d %H:%M:%S");
    let mut out = String::new();

    let banner = format!("--- WEBHOOK RECEIVED ({timestamp}) ---");
    out.push_str(&format!("\n{}\n\n", banner.bold()));
    out.push_str(&format!(
        "{} {} {}\n\n",
        "Method:".cyan(),
        color_method(&snapshot.method),
        snapshot.path.as_str().yellow()
    ));

    out.push_str("Headers:\n");
    for (name, values) in &snapshot.headers {
        out.push_str(&format!("  {}: {}\n", name.as_str().blue(), values.join(", ")));
    }
    out.push('\n');

    out.push_str("Body:\n");
    if let Some(pretty) = pretty_json(&snapshot.body) {
        out.push_str(&format!("{}\n", pretty.as_str().green()));
    } else if !snapshot.body.is_empty() {
        out.push_str(&String::from_utf8_lossy(&snapshot.body));
        out.push('\n');
    } else {
        out.push_str("<empty>\n");
    }

    out.push_str(&"-".repeat(SEPARATOR_WIDTH));
    out.push('\n');
    out
}

fn color_method(method: &str) -> StyledContent<&str> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => method.green(),
        "POST" => method.yellow(),
        "PUT" => method.magenta(),
        "DELETE" => method.red(),
        _ => method.cyan(),
    }
}
