use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Local};
use http::header::CONTENT_TYPE;
use http::{request::Parts, HeaderValue, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

pub mod report;

pub use report::Console;

/// Bodies are read up to this many bytes, the rest is dropped.
pub const MAX_BODY_BYTES: usize = 10 << 20;

const OK_BODY: &str = "ok";
const BAD_BODY: &str = "failed to read body";

/// Everything the console report needs from one request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
    /// Canonical header name -> values in arrival order
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Bytes,
    pub received_at: DateTime<Local>,
}

impl RequestSnapshot {
    pub fn new(parts: &Parts, body: Bytes) -> Self {
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in parts.headers.iter() {
            headers
                .entry(canonical_header_name(name.as_str()))
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        Self {
            method: parts.method.to_string(),
            path: parts.uri.path().to_owned(),
            headers,
            body,
            received_at: Local::now(),
        }
    }
}

/// `content-type` -> `Content-Type`
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    let mut word = first.to_ascii_uppercase().to_string();
                    word.push_str(&chars.as_str().to_ascii_lowercase());
                    word
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Collects at most `limit` bytes of `body`.
///
/// Reaching the limit isn't an error; the remaining frames are never polled.
pub async fn read_capped<B>(mut body: B, limit: usize) -> Result<Bytes, B::Error>
where
    B: Body<Data = Bytes> + Unpin,
{
    let mut buf = BytesMut::new();
    while buf.len() < limit {
        let Some(frame) = body.frame().await else {
            break;
        };
        if let Ok(data) = frame?.into_data() {
            let take = data.len().min(limit - buf.len());
            buf.extend_from_slice(&data[..take]);
        }
    }
    Ok(buf.freeze())
}

/// The catch-all request handler.
///
/// Answers every request with `200 ok` and prints it to the shared
/// [`Console`] afterwards. Clones share the console and the set of
/// pending reports.
#[derive(Clone)]
pub struct Catcher {
    console: Arc<Console>,
    body_limit: usize,
    reports: TaskTracker,
}

impl Catcher {
    pub fn new(console: Arc<Console>) -> Self {
        Self {
            console,
            body_limit: MAX_BODY_BYTES,
            reports: TaskTracker::new(),
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Display,
    {
        let (parts, body) = request.into_parts();
        let body = match read_capped(body, self.body_limit).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read request body: {e}");
                return text_response(StatusCode::BAD_REQUEST, BAD_BODY);
            }
        };
        debug!("{} {} ({} bytes)", parts.method, parts.uri.path(), body.len());

        let snapshot = RequestSnapshot::new(&parts, body);
        let console = Arc::clone(&self.console);
        // The response goes out as soon as we return; printing happens after.
        self.reports.spawn(async move {
            if let Err(e) = console.report(&snapshot).await {
                warn!("Failed to print request: {e}");
            }
        });

        text_response(StatusCode::OK, OK_BODY)
    }

    /// Waits until every report spawned so far has been printed.
    pub async fn flush_reports(&self) {
        self.reports.close();
        self.reports.wait().await;
    }
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
