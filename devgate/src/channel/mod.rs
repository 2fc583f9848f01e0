//! Channel layer: prompt-driven reads over a terminal transport.
//!
//! The channel owns the transport, accumulates ANSI-stripped output and
//! returns it once a prompt pattern appears at the tail. Every byte read and
//! every line sent can be mirrored into a per-host transcript file.

mod buffer;
mod patterns;

pub use buffer::{DEFAULT_SEARCH_DEPTH, PatternBuffer};
pub use patterns::{GENERIC_PROMPT, any_of, compile_prompt_pattern};

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use regex::bytes::Regex;
use tokio::time::Instant;

use crate::error::{ChannelError, Result};
use crate::transport::TerminalTransport;

/// Append-only session transcript.
///
/// Write failures are logged once and disable the transcript; they never
/// fail the session.
#[derive(Debug)]
struct Transcript {
    path: PathBuf,
    file: Option<File>,
}

impl Transcript {
    fn open(path: &Path) -> Self {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    warn!("cannot create transcript directory {}: {e}", dir.display());
                }
            }
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("cannot open transcript {}: {e}", path.display());
                None
            }
        };

        Self {
            path: path.to_path_buf(),
            file,
        }
    }

    fn record(&mut self, data: &[u8]) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = file.write_all(data) {
            warn!("transcript {} disabled: {e}", self.path.display());
            self.file = None;
        }
    }
}

/// Interactive channel over a connected transport.
pub struct TerminalChannel {
    transport: Box<dyn TerminalTransport>,
    buffer: PatternBuffer,
    transcript: Option<Transcript>,
}

impl TerminalChannel {
    pub fn new(transport: Box<dyn TerminalTransport>) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::default(),
            transcript: None,
        }
    }

    /// Mirror all traffic into `path` (appending).
    pub fn with_transcript(mut self, path: &Path) -> Self {
        self.transcript = Some(Transcript::open(path));
        self
    }

    /// Send one line followed by `line_ending`.
    pub async fn send(&mut self, line: &str, line_ending: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + line_ending.len());
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(line_ending.as_bytes());
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.record(&data);
        }
        self.transport.write(&data).await
    }

    /// Send a line that must not appear in the transcript (passwords).
    pub async fn send_hidden(&mut self, line: &str, line_ending: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + line_ending.len());
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(line_ending.as_bytes());
        self.transport.write(&data).await
    }

    /// Read until `pattern` matches the tail of the output.
    ///
    /// Returns everything accumulated since the previous match.
    pub async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.buffer.tail_contains(pattern) {
                return Ok(self.buffer.take());
            }

            let chunk = tokio::time::timeout_at(deadline, self.transport.read())
                .await
                .map_err(|_| {
                    debug!(
                        "no match for {:?}; tail: {:?}",
                        pattern.as_str(),
                        tail_preview(self.buffer.as_slice())
                    );
                    ChannelError::PatternTimeout(timeout)
                })??;

            if let Some(transcript) = self.transcript.as_mut() {
                transcript.record(&chunk);
            }
            self.buffer.extend(&chunk);
        }
    }

    /// Drop anything buffered without returning it.
    pub fn discard(&mut self) {
        self.buffer.clear();
    }

    pub async fn close(self) -> Result<()> {
        self.transport.close().await
    }
}

fn tail_preview(data: &[u8]) -> String {
    let start = data.len().saturating_sub(80);
    String::from_utf8_lossy(&data[start..]).into_owned()
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use crate::Error;

    fn prompt() -> Regex {
        compile_prompt_pattern(r"router#").unwrap()
    }

    #[tokio::test]
    async fn test_read_until_prompt() {
        let (transport, _) = ScriptedTransport::new("banner\r\nrouter#", &[]);
        let mut channel = TerminalChannel::new(Box::new(transport));
        let out = channel
            .read_until(&prompt(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out, b"banner\r\nrouter#");
    }

    #[tokio::test]
    async fn test_send_then_read() {
        let (transport, written) =
            ScriptedTransport::new("router#", &["show clock\r\n12:00\r\nrouter#"]);
        let mut channel = TerminalChannel::new(Box::new(transport));
        channel
            .read_until(&prompt(), Duration::from_secs(1))
            .await
            .unwrap();

        channel.send("show clock", "\n").await.unwrap();
        let out = channel
            .read_until(&prompt(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out), "show clock\r\n12:00\r\nrouter#");
        assert_eq!(written.lock().unwrap().as_slice(), ["show clock\n"]);
    }

    #[tokio::test]
    async fn test_pattern_timeout() {
        let (transport, _) = ScriptedTransport::new("Press any key", &[]);
        let mut channel = TerminalChannel::new(Box::new(transport));
        let err = channel
            .read_until(&prompt(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::PatternTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_transcript_records_traffic_but_not_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("session_r1.log");

        let (transport, _) = ScriptedTransport::new("router#", &["x", "y\r\nrouter#"]);
        let mut channel = TerminalChannel::new(Box::new(transport)).with_transcript(&path);
        channel
            .read_until(&prompt(), Duration::from_secs(1))
            .await
            .unwrap();
        channel.send_hidden("hunter2", "\n").await.unwrap();
        channel.send("show x", "\n").await.unwrap();
        channel
            .read_until(&prompt(), Duration::from_secs(1))
            .await
            .unwrap();
        channel.close().await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("show x\n"));
        assert!(!text.contains("hunter2"));
        assert!(text.ends_with("router#"));
    }
}
