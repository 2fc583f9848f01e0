//! # Devgate
//!
//! Async command gateway for network devices, Windows hosts and BMCs.
//!
//! Devgate gives an automated caller one uniform way to run commands on
//! heterogeneous infrastructure while a safety gate blocks destructive
//! operations before anything touches the network.
//!
//! ## Features
//!
//! - Device inventory in TOML with a shared `default` section
//! - SSH (via russh) and telnet terminal sessions with per-vendor prompts,
//!   privilege escalation, paging control, commit and save
//! - WinRM remote shell commands over WS-Management
//! - IPMI v1.5 raw commands over RMCP
//! - Prefix-based destructive-command gate
//! - Every failure rendered as a tagged string (`Connection Error:`,
//!   `Configuration Error:`, `Error:`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use devgate::{DeviceRef, Gateway, GatewayConfig};
//! use devgate::params::TerminalProtocol;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), devgate::Error> {
//!     let gateway = Gateway::new(GatewayConfig::load(None)?);
//!     gateway.check_inventory()?;
//!
//!     let output = gateway
//!         .send_command(&DeviceRef::Name("core1".into()), "show version", TerminalProtocol::Ssh)
//!         .await?;
//!     println!("{output}");
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod inventory;
pub mod ipmi;
pub mod params;
pub mod platform;
pub mod safety;
pub mod transport;
pub mod winrm;

// Re-export main types for convenience
pub use config::GatewayConfig;
pub use driver::{Response, TerminalSession};
pub use error::{Error, ErrorClass, Result};
pub use gateway::{DeviceRef, Gateway, ToolRequest};
pub use inventory::{DeviceDescriptor, Inventory};
pub use platform::PlatformDefinition;
pub use safety::SafetyPolicy;
