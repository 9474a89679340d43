//! Configuration management for Alice
//!
//! Startup parameters come from built-in defaults, an optional TOML file,
//! and finally command line flags. The session only ever sees the
//! immutable [`SessionConfig`] projection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Role this agent plays in transaction endorsement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndorserRole {
    #[default]
    None,
    Author,
    Endorser,
}

impl FromStr for EndorserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "author" => Ok(Self::Author),
            "endorser" => Ok(Self::Endorser),
            other => Err(Error::Config(format!("Unknown endorser role: {}", other))),
        }
    }
}

impl fmt::Display for EndorserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Author => "author",
            Self::Endorser => "endorser",
        };
        f.write_str(name)
    }
}

/// Wallet storage backend of the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletType {
    #[serde(rename = "askar")]
    Askar,
    #[serde(rename = "askar-anoncreds")]
    AskarAnoncreds,
    #[serde(rename = "indy")]
    Indy,
}

impl WalletType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Askar => "askar",
            Self::AskarAnoncreds => "askar-anoncreds",
            Self::Indy => "indy",
        }
    }
}

impl FromStr for WalletType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "askar" => Ok(Self::Askar),
            "askar-anoncreds" => Ok(Self::AskarAnoncreds),
            "indy" => Ok(Self::Indy),
            other => Err(Error::Config(format!("Unknown wallet type: {}", other))),
        }
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything resolved at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Short identity name, also used for the initial sub-wallet
    pub ident: String,
    /// Agent label presented to other parties
    pub label: String,
    /// First port of the block used by the agent
    pub start_port: u16,
    /// Host name other processes use to reach this machine
    pub host: String,
    /// Disable auto-accept of connections and exchanges
    pub no_auto: bool,
    /// Aries interop profile version (10 or 20)
    pub aip: u8,
    pub endorser_role: EndorserRole,
    pub multitenant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_type: Option<WalletType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tails_server_base_url: Option<String>,
    pub revocation: bool,
    /// Collect and show timing diagnostics on exit
    pub timing: bool,
    pub mediation: bool,
    /// Admin API base URL; derived from host and admin port when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_url: Option<String>,
    /// Agent executable to spawn; when unset the agent must already be running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_command: Option<String>,
    /// Ledger genesis URL passed to a spawned agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genesis_url: Option<String>,
    /// How long to wait for the admin API to report ready
    pub ready_timeout_secs: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            ident: "alice".to_string(),
            label: "alice.agent".to_string(),
            start_port: 8030,
            host: "localhost".to_string(),
            no_auto: false,
            aip: 20,
            endorser_role: EndorserRole::None,
            multitenant: false,
            wallet_type: None,
            tails_server_base_url: None,
            revocation: false,
            timing: false,
            mediation: false,
            admin_url: None,
            agent_command: None,
            genesis_url: None,
            ready_timeout_secs: 30,
        }
    }
}

impl StartupConfig {
    /// Load a config file, falling back to defaults for missing keys
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load the given file, or the default location if it exists, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/alice/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("alice").join("config.toml"))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject combinations the agent cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.aip != 10 && self.aip != 20 {
            return Err(Error::Config(format!(
                "Invalid interop profile version: {} (expected 10 or 20)",
                self.aip
            )));
        }
        if self.start_port > u16::MAX - 2 {
            return Err(Error::Config(format!(
                "Start port {} leaves no room for admin and webhook ports",
                self.start_port
            )));
        }
        if self.revocation && self.tails_server_base_url.is_none() {
            return Err(Error::Config(
                "Revocation requires a tails server base URL".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ports(&self) -> Ports {
        Ports {
            http: self.start_port,
            admin: self.start_port.saturating_add(1),
            webhook: self.start_port.saturating_add(2),
        }
    }

    pub fn admin_url(&self) -> String {
        match &self.admin_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.ports().admin),
        }
    }

    /// Public DIDComm endpoint of the agent
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.ports().http)
    }

    pub fn webhook_url(&self) -> String {
        format!("http://{}:{}/webhooks", self.host, self.ports().webhook)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    /// The flags the interactive session depends on
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endorser_role: self.endorser_role,
            multitenant: self.multitenant,
            timing: self.timing,
            wallet_type: self.wallet_type,
            ports: self.ports(),
        }
    }
}

/// Port block used by one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    pub http: u16,
    pub admin: u16,
    pub webhook: u16,
}

/// Immutable session flags, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub endorser_role: EndorserRole,
    pub multitenant: bool,
    pub timing: bool,
    pub wallet_type: Option<WalletType>,
    pub ports: Ports,
}

impl Default for SessionConfig {
    fn default() -> Self {
        StartupConfig::default().session_config()
    }
}
