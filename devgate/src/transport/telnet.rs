//! Telnet transport over a plain TCP stream.
//!
//! Option negotiation is kept to the minimum a device CLI needs: the server
//! may ECHO and SUPPRESS-GO-AHEAD, every other option is refused, and
//! subnegotiations are skipped. Login answers the username and password
//! prompts before handing the stream to the channel layer.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use log::debug;
use memchr::memchr;
use regex::bytes::Regex;
use secrecy::ExposeSecret;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::TerminalTransport;
use super::config::TelnetConfig;
use crate::error::{ChannelError, Result, TransportError};

/// Interpret As Command.
pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Subnegotiation end.
pub const SE: u8 = 240;

pub const OPT_ECHO: u8 = 1;
pub const OPT_SGA: u8 = 3;

static USERNAME_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(user(\s?name)?|login)\s*:\s*$").expect("static regex")
});

static PASSWORD_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pass(word|code)\s*:\s*$").expect("static regex"));

static LOGIN_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(login incorrect|authentication failed|access denied|% bad passwords?)")
        .expect("static regex")
});

/// Any CLI prompt reached without further login questions.
static SHELL_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[>#$%\]]\s*$").expect("static regex"));

/// Decoder state carried across reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Data,
    Iac,
    Option(u8),
    Sub,
    SubIac,
}

/// Output of one decode step.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Terminal data with protocol bytes removed.
    pub data: Vec<u8>,
    /// Negotiation replies to write back.
    pub replies: Vec<u8>,
}

/// Incremental telnet protocol decoder.
#[derive(Debug, Default)]
pub struct TelnetCodec {
    state: State,
    /// Options already answered, so repeated requests do not loop.
    answered: Vec<(u8, u8)>,
}

impl TelnetCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk from the wire.
    pub fn decode(&mut self, mut input: &[u8]) -> Decoded {
        let mut out = Decoded::default();

        while !input.is_empty() {
            if self.state == State::Data {
                let end = memchr(IAC, input).unwrap_or(input.len());
                out.data.extend_from_slice(&input[..end]);
                input = &input[end..];
                if input.is_empty() {
                    break;
                }
            }

            let byte = input[0];
            input = &input[1..];

            self.state = match self.state {
                State::Data => State::Iac,
                State::Iac => match byte {
                    IAC => {
                        out.data.push(IAC);
                        State::Data
                    }
                    DO | DONT | WILL | WONT => State::Option(byte),
                    SB => State::Sub,
                    _ => State::Data,
                },
                State::Option(verb) => {
                    self.answer(verb, byte, &mut out.replies);
                    State::Data
                }
                State::Sub => {
                    if byte == IAC {
                        State::SubIac
                    } else {
                        State::Sub
                    }
                }
                State::SubIac => {
                    if byte == SE {
                        State::Data
                    } else {
                        State::Sub
                    }
                }
            };
        }

        out
    }

    fn answer(&mut self, verb: u8, option: u8, replies: &mut Vec<u8>) {
        let reply = match verb {
            DO => WONT,
            WILL if matches!(option, OPT_ECHO | OPT_SGA) => DO,
            WILL => DONT,
            // DONT / WONT need no answer when we never agreed
            _ => return,
        };

        if self.answered.contains(&(verb, option)) {
            return;
        }
        self.answered.push((verb, option));
        replies.extend_from_slice(&[IAC, reply, option]);
    }
}

/// Escape IAC bytes in outgoing data.
pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out
}

/// Telnet transport.
pub struct TelnetTransport {
    stream: TcpStream,
    codec: TelnetCodec,
    /// Data decoded during login but not yet handed to the channel.
    pending: BytesMut,
}

impl TelnetTransport {
    /// Connect and log in.
    pub async fn connect(config: TelnetConfig) -> Result<Self> {
        debug!("connecting to {}:{} over telnet", config.host, config.port);

        let stream = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.connect_timeout))?
        .map_err(|source| TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;

        let mut transport = Self {
            stream,
            codec: TelnetCodec::new(),
            pending: BytesMut::new(),
        };
        transport.login(&config).await?;
        Ok(transport)
    }

    /// Answer login prompts until a CLI prompt appears.
    async fn login(&mut self, config: &TelnetConfig) -> Result<()> {
        let mut sent_username = false;
        let mut sent_password = false;

        loop {
            let chunk = self.read_timeout(config.login_timeout).await?;
            self.pending.extend_from_slice(&chunk);
            let seen = &self.pending[..];

            if LOGIN_FAILED.is_match(seen) {
                return Err(TransportError::AuthenticationFailed {
                    user: config.username.clone(),
                }
                .into());
            }

            if PASSWORD_PROMPT.is_match(seen) {
                if sent_password {
                    return Err(TransportError::AuthenticationFailed {
                        user: config.username.clone(),
                    }
                    .into());
                }
                self.send_line(config.password.expose_secret(), config.line_ending)
                    .await?;
                sent_password = true;
                self.pending.clear();
            } else if USERNAME_PROMPT.is_match(seen) {
                if sent_username {
                    return Err(TransportError::TelnetLogin(
                        "username prompt repeated".to_string(),
                    )
                    .into());
                }
                self.send_line(&config.username, config.line_ending).await?;
                sent_username = true;
                self.pending.clear();
            } else if SHELL_PROMPT.is_match(seen) {
                return Ok(());
            }
        }
    }

    async fn send_line(&mut self, line: &str, line_ending: &str) -> Result<()> {
        let mut data = escape(line.as_bytes());
        data.extend_from_slice(line_ending.as_bytes());
        self.write_raw(&data).await
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.stream
            .write_all(data)
            .await
            .map_err(TransportError::Io)?;
        Ok(())
    }

    async fn read_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        tokio::time::timeout(timeout, self.read_decoded())
            .await
            .map_err(|_| TransportError::TelnetLogin(format!("no login prompt within {timeout:?}")))?
    }

    /// Read until at least one byte of terminal data is available.
    async fn read_decoded(&mut self) -> Result<Vec<u8>> {
        let mut buf = [0u8; 4096];
        loop {
            let n = self
                .stream
                .read(&mut buf)
                .await
                .map_err(TransportError::Io)?;
            if n == 0 {
                return Err(ChannelError::Closed.into());
            }

            let decoded = self.codec.decode(&buf[..n]);
            if !decoded.replies.is_empty() {
                self.write_raw(&decoded.replies).await?;
            }
            if !decoded.data.is_empty() {
                return Ok(decoded.data);
            }
        }
    }
}

#[async_trait]
impl TerminalTransport for TelnetTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.write_raw(&escape(data)).await
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        if !self.pending.is_empty() {
            return Ok(self.pending.split().to_vec());
        }
        self.read_decoded().await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut stream = self.stream;
        stream.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }
}
