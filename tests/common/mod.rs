#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use webhook_catcher::errors::AppError;
use webhook_catcher::listener::{Binder, Connection, Endpoint, Listener};

pub const SEPARATOR: &str = "--------------------------------------------------";

/// Console output captured in memory.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // Small pieces so an unguarded writer would interleave
        let n = buf.len().min(16);
        self.0.lock().unwrap().extend_from_slice(&buf[..n]);
        std::thread::yield_now();
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Polls `buffer` until it holds `reports` complete report blocks.
pub async fn wait_for_reports(buffer: &SharedBuffer, reports: usize) -> String {
    for _ in 0..1000 {
        let text = buffer.text();
        if text.matches(SEPARATOR).count() >= reports {
            return text;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {reports} reports, got:\n{}", buffer.text());
}

/// Never hands out a connection; serving only ends through cancellation.
pub struct IdleListener(pub String);

#[async_trait]
impl Listener for IdleListener {
    async fn accept(&mut self) -> Result<Connection, AppError> {
        std::future::pending().await
    }

    fn url(&self) -> String {
        self.0.clone()
    }
}

/// Remembers every endpoint it was asked to bind.
#[derive(Default)]
pub struct RecordingBinder {
    pub endpoints: Mutex<Vec<Endpoint>>,
    pub fail_with: Mutex<Option<AppError>>,
}

impl RecordingBinder {
    pub fn failing(error: AppError) -> Self {
        Self {
            endpoints: Mutex::default(),
            fail_with: Mutex::new(Some(error)),
        }
    }

    pub fn bound(&self) -> Vec<Endpoint> {
        self.endpoints.lock().unwrap().clone()
    }
}

#[async_trait]
impl Binder for RecordingBinder {
    async fn bind(&self, endpoint: &Endpoint) -> Result<Box<dyn Listener>, AppError> {
        self.endpoints.lock().unwrap().push(endpoint.clone());
        if let Some(error) = self.fail_with.lock().unwrap().take() {
            return Err(error);
        }
        Ok(Box::new(IdleListener("http://fake".into())))
    }
}
