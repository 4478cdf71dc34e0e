// Upstream event stream client - newline-delimited JSON with bounded reconnects
use crate::application::live_session::LiveSession;
use crate::application::session::SessionEvent;
use crate::infrastructure::wire::decode_line;
use anyhow::{Context, Result};
use bytes::{Buf, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Whether another attempt is allowed after `failures` consecutive failures
    pub fn allows(&self, failures: u32) -> bool {
        failures < self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            max_attempts: 10,
        }
    }
}

/// Longest line accepted from the upstream feed
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into lines, carrying partial lines across chunks.
/// Lines longer than the cap are dropped up to their terminating newline.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: BytesMut,
    // Bytes already searched for a newline
    scanned: usize,
    max_line: usize,
    discarding: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_line,
            discarding: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(self.scanned + offset);
            self.buffer.advance(1);
            self.scanned = 0;

            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if line.len() > self.max_line {
                tracing::warn!(bytes = line.len(), "dropping oversized event line");
                continue;
            }
            lines.push(String::from_utf8_lossy(&line).trim_end_matches('\r').to_string());
        }

        if self.buffer.len() > self.max_line {
            if !self.discarding {
                tracing::warn!(
                    max_bytes = self.max_line,
                    "event line exceeds limit, dropping until next newline"
                );
            }
            self.buffer.clear();
            self.discarding = true;
        }
        self.scanned = self.buffer.len();
        lines
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventSourceClient {
    url: String,
    policy: ReconnectPolicy,
    client: reqwest::Client,
}

impl EventSourceClient {
    pub fn new(url: String, policy: ReconnectPolicy) -> Self {
        Self {
            url,
            policy,
            client: reqwest::Client::new(),
        }
    }

    /// Feed the session until the retry budget is spent. Once it returns the
    /// session stays disconnected.
    pub async fn run(self, session: Arc<LiveSession>) {
        let mut failures: u32 = 0;

        loop {
            match self.open().await {
                Ok(response) => {
                    failures = 0;
                    tracing::info!(url = %self.url, "connected to event source");
                    dispatch(&session, SessionEvent::Connected).await;

                    match self.pump(response, &session).await {
                        Ok(()) => tracing::warn!("event source closed the stream"),
                        Err(e) => tracing::warn!(error = %e, "event stream interrupted"),
                    }
                    dispatch(&session, SessionEvent::Disconnected).await;
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        attempt = failures,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "could not reach event source"
                    );
                }
            }

            if !self.policy.allows(failures) {
                tracing::error!(
                    attempts = failures,
                    "giving up on event source, restart required to reconnect"
                );
                dispatch(&session, SessionEvent::ReconnectExhausted).await;
                return;
            }

            tokio::time::sleep(self.policy.delay).await;
        }
    }

    async fn open(&self) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/x-ndjson")
            .send()
            .await
            .context("Failed to connect to event source")?;

        if !response.status().is_success() {
            anyhow::bail!("Event source responded with status {}", response.status());
        }
        Ok(response)
    }

    async fn pump(&self, response: reqwest::Response, session: &LiveSession) -> Result<()> {
        let mut lines = Box::pin(event_lines(response.bytes_stream()));

        while let Some(line) = lines.next().await {
            let line = line?;
            match decode_line(&line, chrono::Utc::now()) {
                Ok(Some(event)) => dispatch(session, event).await,
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "skipping undecodable event"),
            }
        }
        Ok(())
    }
}

fn event_lines<S>(chunks: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = reqwest::Result<bytes::Bytes>>,
{
    async_stream::try_stream! {
        let mut decoder = LineDecoder::new();
        futures::pin_mut!(chunks);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.context("Failed to read from event source")?;
            for line in decoder.push(&chunk) {
                yield line;
            }
        }
    }
}

async fn dispatch(session: &LiveSession, event: SessionEvent) {
    if let Err(e) = session.dispatch(event).await {
        tracing::warn!(error = %e, "dropped inbound event");
    }
}
