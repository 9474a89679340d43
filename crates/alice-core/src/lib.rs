//! Alice Core - interactive front-end for a DIDComm connection handshake
//!
//! This crate provides the core functionality for the `alice` agent:
//! - Invitation decoding from URLs, base64 payloads, or literal JSON
//! - One-shot connection readiness signalling
//! - An interactive session loop over a pluggable agent runtime
//! - An admin-API runtime with webhook listener and agent process control

pub mod config;
pub mod error;
pub mod invitation;
pub mod lifecycle;
pub mod runtime;
pub mod session;
pub mod signal;

pub use config::{EndorserRole, Ports, SessionConfig, StartupConfig, WalletType};
pub use error::{DecodeError, Error, Result};
pub use invitation::{decode, Invitation};
pub use lifecycle::{run_lifecycle, LifecycleOutcome};
pub use runtime::{
    AdminClient, AdminRuntime, AgentRuntime, ConnectionRecord, RuntimeEvent, TimingData,
    WalletSwitch,
};
pub use session::{CommandAction, CommandMenu, Console, Phase, SessionLoop, SessionState};
pub use signal::{ConnectionSignal, SignalResolver, SignalState};
