//! Alice CLI - accept a connection invitation and talk to the inviter
//!
//! Starts (or attaches to) an agent, asks for an invitation, waits for the
//! connection, then offers a small command menu until the user exits.

mod terminal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use alice_core::config::{EndorserRole, StartupConfig, WalletType};
use alice_core::lifecycle::run_lifecycle;
use alice_core::runtime::AdminRuntime;
use terminal::TerminalConsole;

#[derive(Parser)]
#[command(name = "alice")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Accept a connection invitation and interact with the inviter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to <config dir>/alice/config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// First port of the block the agent listens on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host name other agents use to reach this one
    #[arg(long)]
    host: Option<String>,

    /// Agent label
    #[arg(long)]
    label: Option<String>,

    /// Disable auto-accept of connections and exchanges
    #[arg(long)]
    no_auto: bool,

    /// Aries interop profile (10 or 20)
    #[arg(long)]
    aip: Option<u8>,

    /// Endorser role: none, author or endorser
    #[arg(long)]
    endorser_role: Option<EndorserRole>,

    /// Run the agent in multi-tenant mode
    #[arg(long)]
    multitenant: bool,

    /// Wallet type: askar, askar-anoncreds or indy
    #[arg(long)]
    wallet_type: Option<WalletType>,

    /// Tails server base URL, required with --revocation
    #[arg(long)]
    tails_server_base_url: Option<String>,

    /// Enable credential revocation
    #[arg(long)]
    revocation: bool,

    /// Show timing diagnostics on exit
    #[arg(long)]
    timing: bool,

    /// Enable mediation
    #[arg(long)]
    mediation: bool,

    /// Admin API of an already running agent
    #[arg(long)]
    admin_url: Option<String>,

    /// Agent executable to spawn
    #[arg(long, env = "ALICE_AGENT_COMMAND")]
    agent_command: Option<String>,

    /// Ledger genesis URL for a spawned agent
    #[arg(long, env = "GENESIS_URL")]
    genesis_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the agent and the interactive session (default)
    Run,

    /// Decode an invitation and print it
    Decode {
        /// Invitation URL, base64 payload, or JSON
        invite: String,
    },

    /// Show the effective configuration
    Config,
}

impl Cli {
    /// Command-line flags override values from the config file
    fn apply(&self, config: &mut StartupConfig) {
        if let Some(port) = self.port {
            config.start_port = port;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(label) = &self.label {
            config.label = label.clone();
        }
        if let Some(aip) = self.aip {
            config.aip = aip;
        }
        if let Some(role) = self.endorser_role {
            config.endorser_role = role;
        }
        if let Some(wallet_type) = self.wallet_type {
            config.wallet_type = Some(wallet_type);
        }
        if let Some(url) = &self.tails_server_base_url {
            config.tails_server_base_url = Some(url.clone());
        }
        if let Some(url) = &self.admin_url {
            config.admin_url = Some(url.clone());
        }
        if let Some(command) = &self.agent_command {
            config.agent_command = Some(command.clone());
        }
        if let Some(url) = &self.genesis_url {
            config.genesis_url = Some(url.clone());
        }

        config.no_auto |= self.no_auto;
        config.multitenant |= self.multitenant;
        config.revocation |= self.revocation;
        config.timing |= self.timing;
        config.mediation |= self.mediation;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr at warn by default so they stay out of the prompts
    let default_filter = if cli.verbose {
        "info,alice_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut startup = StartupConfig::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut startup);

    match &cli.command {
        Some(Commands::Decode { invite }) => decode_invitation(invite),
        Some(Commands::Config) => show_config(&startup),
        Some(Commands::Run) | None => {
            let code = run_agent(startup).await;
            std::process::exit(code);
        }
    }
}

/// Run the agent lifecycle and return the process exit code
async fn run_agent(startup: StartupConfig) -> i32 {
    let mut console = TerminalConsole::new();
    let lifecycle = run_lifecycle(startup, &mut console, AdminRuntime::initialize);

    tokio::select! {
        outcome = lifecycle => outcome.exit_code(),
        _ = interrupted() => {
            eprintln!("\n{}", style("Interrupted").yellow());
            1
        }
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn decode_invitation(raw: &str) -> anyhow::Result<()> {
    let invitation = alice_core::decode(raw.trim())?;

    if let Some(message_type) = invitation.message_type() {
        println!("{} {}", style("Type:").bold(), style(message_type).cyan());
    }
    if let Some(label) = invitation.label() {
        println!("{} {}", style("Label:").bold(), label);
    }
    println!("{}", serde_json::to_string_pretty(&invitation.as_json())?);
    Ok(())
}

fn show_config(config: &StartupConfig) -> anyhow::Result<()> {
    let ports = config.ports();

    println!("{}", style("Configuration:").bold());
    println!();
    println!(
        "  Config file: {}",
        style(
            StartupConfig::default_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "N/A".to_string())
        )
        .dim()
    );
    println!("  Admin API:   {}", style(config.admin_url()).green());
    println!("  Endpoint:    {}", style(config.endpoint()).green());
    println!("  Webhooks:    {}", style(config.webhook_url()).green());
    println!(
        "  Ports:       http {} / admin {} / webhook {}",
        ports.http, ports.admin, ports.webhook
    );
    println!();
    print!("{}", config.to_toml()?);

    if let Err(e) = config.validate() {
        println!();
        println!("{}", style(format!("Warning: {}", e)).yellow());
    }
    Ok(())
}
