//! Terminal transports.
//!
//! A transport moves raw bytes to and from a remote CLI. Prompt detection,
//! paging and command semantics live above it in the channel and driver
//! layers, so SSH and telnet sessions behave identically once connected.

pub mod config;
mod ssh;
pub mod telnet;

pub use config::{HostKeyVerification, SshConfig, TelnetConfig};
pub use ssh::SshTransport;
pub use telnet::TelnetTransport;

use async_trait::async_trait;

use crate::error::Result;

/// Byte-level connection to an interactive device CLI.
#[async_trait]
pub trait TerminalTransport: Send {
    /// Write raw bytes to the remote terminal.
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Wait for the next chunk of output.
    ///
    /// Must be cancel-safe: callers wrap it in a timeout.
    async fn read(&mut self) -> Result<Vec<u8>>;

    /// Close the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}
