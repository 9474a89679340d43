//! Agent runtime - the protocol agent this front-end drives
//!
//! The session talks to the agent only through [`AgentRuntime`]. The
//! production implementation, [`AdminRuntime`], reaches an agent over its
//! HTTP admin API and receives its notifications on a webhook listener:
//!
//! ```text
//!  SessionLoop ──admin calls──▶ AdminClient ──HTTP──▶ agent admin API
//!       ▲                                                  │
//!       │ drain_events()                                    │ webhooks
//!       │                                                  ▼
//!  event queue ◀──── WebhookListener ──▶ ConnectionWatch ──▶ SignalResolver
//! ```

mod admin;
mod agent;
mod process;
mod timing;
mod watch;
pub mod webhook;

pub use admin::AdminClient;
pub use agent::AdminRuntime;
pub use process::{build_agent_args, AgentProcess};
pub use timing::{format_timing, TimingData};
pub use watch::ConnectionWatch;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::invitation::Invitation;
use crate::signal::SignalResolver;

/// Record returned by the agent after it accepted an invitation
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    /// Connection identifier, when the agent already assigned one
    pub connection_id: Option<String>,
    /// Raw response from the agent
    pub raw: Value,
}

/// Result of a wallet register-or-switch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletSwitch {
    Created { wallet_id: String },
    Switched { wallet_id: String },
}

/// Notifications the agent delivered since the last drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    ConnectionState {
        connection_id: String,
        state: String,
    },
    MessageReceived {
        connection_id: String,
        content: String,
    },
    CredentialState {
        exchange_id: String,
        state: String,
    },
    ProblemReport {
        description: String,
    },
}

/// Operations the interactive session needs from the agent
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Hand an invitation to the agent.
    ///
    /// With a resolver, the runtime resolves it once the resulting
    /// connection completes or is abandoned.
    async fn submit_invitation(
        &self,
        invitation: &Invitation,
        readiness: Option<SignalResolver>,
    ) -> Result<ConnectionRecord>;

    /// POST to an admin endpoint
    async fn admin_post(&self, path: &str, params: &[(&str, &str)], body: Value) -> Result<Value>;

    /// Create a sub-wallet, or switch to one created earlier
    async fn register_or_switch_wallet(
        &self,
        wallet_name: &str,
        with_webhook: bool,
    ) -> Result<WalletSwitch>;

    /// Timing diagnostics, if the agent collects them
    async fn fetch_timing(&self) -> Result<Option<TimingData>>;

    /// Take all queued notifications
    fn drain_events(&self) -> Vec<RuntimeEvent>;

    /// Shut the agent down; true when shutdown was clean
    async fn terminate(&self) -> bool;
}
