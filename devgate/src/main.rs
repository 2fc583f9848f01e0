//! `devgate` command-line entry point.
//!
//! One-shot subcommands print the command output (or the tagged error on
//! stderr with exit status 2). `serve` reads one JSON tool request per stdin
//! line and writes one JSON-encoded response string per stdout line; logs
//! always go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use devgate::gateway::DeviceSpec;
use devgate::{Gateway, GatewayConfig, ToolRequest};

/// Command gateway for network devices, Windows hosts and BMCs.
#[derive(Parser, Debug)]
#[command(name = "devgate", version, about)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, value_name = "PATH", env = "DEVGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Inventory file, overriding the settings
    #[arg(short, long, value_name = "PATH")]
    inventory: Option<PathBuf>,

    /// Reject destructive commands ('clear', 'reload', 'write', ...)
    #[arg(long)]
    secured: bool,

    /// Debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Credentials for requests that bypass the inventory.
#[derive(clap::Args, Debug)]
struct Login {
    #[arg(short, long)]
    username: String,

    #[arg(short, long, env = "DEVGATE_PASSWORD", hide_env_values = true)]
    password: String,

    /// Port; the protocol default when omitted
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the inventory and exit
    Check,

    /// List inventory devices as JSON
    List,

    /// Show one inventory device as JSON
    Describe { name: String },

    /// Run a read command on an inventory device
    Show {
        device: String,
        command: String,
        #[arg(long, default_value = "ssh")]
        protocol: String,
    },

    /// Apply configuration commands to an inventory device
    Configure {
        device: String,
        #[arg(required = true)]
        commands: Vec<String>,
        #[arg(long, default_value = "ssh")]
        protocol: String,
    },

    /// Run a read command on a device given by address and credentials
    ExecInline {
        hostname: String,
        device_type: String,
        command: String,
        #[command(flatten)]
        login: Login,
        #[arg(long, default_value = "ssh")]
        protocol: String,
    },

    /// Run a command on a Windows host over WinRM
    Winrm {
        hostname: String,
        command: String,
        #[command(flatten)]
        login: Login,
        #[arg(long, default_value = "http")]
        scheme: String,
        #[arg(long, default_value = "basic")]
        transport: String,
        /// Validate the server certificate over https
        #[arg(long)]
        verify_tls: bool,
    },

    /// Send a raw IPMI command given as JSON, e.g. '{"netfn":6,"command":1}'
    Ipmi {
        hostname: String,
        payload: String,
        #[command(flatten)]
        login: Login,
    },

    /// Serve JSON tool requests on stdin
    Serve,
}

impl Command {
    fn uses_inventory(&self) -> bool {
        matches!(
            self,
            Self::Check | Self::List | Self::Describe { .. } | Self::Show { .. } | Self::Configure { .. } | Self::Serve
        )
    }

    /// The one-shot tool request, or `None` for `check` and `serve`.
    fn into_request(self) -> Option<ToolRequest> {
        let request = match self {
            Self::Check | Self::Serve => return None,
            Self::List => ToolRequest::ListDevices,
            Self::Describe { name } => ToolRequest::DescribeDevice { name },
            Self::Show {
                device,
                command,
                protocol,
            } => ToolRequest::SendCommand {
                device: DeviceSpec::Name(device),
                command,
                protocol,
            },
            Self::Configure {
                device,
                commands,
                protocol,
            } => ToolRequest::SendConfigSet {
                device: DeviceSpec::Name(device),
                commands,
                protocol,
            },
            Self::ExecInline {
                hostname,
                device_type,
                command,
                login,
                protocol,
            } => ToolRequest::SendCommand {
                device: DeviceSpec::Inline {
                    hostname,
                    device_type,
                    username: login.username,
                    password: login.password,
                    port: login.port,
                },
                command,
                protocol,
            },
            Self::Winrm {
                hostname,
                command,
                login,
                scheme,
                transport,
                verify_tls,
            } => ToolRequest::WinrmCommand {
                hostname,
                username: login.username,
                password: login.password,
                port: login.port,
                command,
                scheme,
                transport,
                verify_tls,
            },
            Self::Ipmi {
                hostname,
                payload,
                login,
            } => ToolRequest::IpmiRaw {
                hostname,
                username: login.username,
                password: login.password,
                port: login.port,
                command: payload,
            },
        };
        Some(request)
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut config = GatewayConfig::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(inventory) = &cli.inventory {
        config.inventory = inventory.clone();
    }
    if cli.secured {
        config.secured = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    if config.secured {
        info!("secured mode: destructive commands are rejected");
    }
    let gateway = Arc::new(Gateway::new(config));

    if cli.command.uses_inventory() {
        let devices = gateway
            .check_inventory()
            .map_err(|e| anyhow::anyhow!(e.render()))
            .context("inventory self-check failed")?;
        if matches!(cli.command, Command::Check) {
            println!("inventory ok: {devices} devices");
            return Ok(ExitCode::SUCCESS);
        }
    }

    if matches!(cli.command, Command::Serve) {
        serve(gateway).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(request) = cli.command.into_request() else {
        return Ok(ExitCode::SUCCESS);
    };
    match gateway.execute(request).await {
        Ok(output) => {
            println!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e.render());
            Ok(ExitCode::from(2))
        }
    }
}

/// Answer JSON tool requests from stdin until EOF.
async fn serve(gateway: Arc<Gateway>) -> Result<()> {
    watch_reload(gateway.clone());
    info!("serving tool requests on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await.context("reading request")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = gateway.handle_line(&line).await;
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Re-read the inventory on SIGHUP.
#[cfg(unix)]
fn watch_reload(gateway: Arc<Gateway>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!("cannot watch SIGHUP, inventory reload disabled: {e}");
            return;
        }
    };
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            match gateway.reload() {
                Ok(devices) => info!("inventory reloaded ({devices} devices)"),
                Err(e) => warn!("inventory reload failed, keeping previous: {}", e.render()),
            }
        }
    });
}

#[cfg(not(unix))]
fn watch_reload(_gateway: Arc<Gateway>) {}
