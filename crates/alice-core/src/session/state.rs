//! Mutable session state

use std::collections::BTreeMap;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    AwaitingInvitation,
    AwaitingCommand,
    Exited,
}

/// State owned by the session loop for the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Connection established by the last accepted invitation
    pub connection_id: Option<String>,
    /// Credential exchange id -> last reported state
    pub credential_states: BTreeMap<String, String>,
    pub phase: Phase,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_exited(&self) -> bool {
        self.phase == Phase::Exited
    }
}
