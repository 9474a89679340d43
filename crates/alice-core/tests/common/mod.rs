//! Shared test doubles: a scripted console and an in-memory agent runtime

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use alice_core::error::{Error, Result};
use alice_core::invitation::Invitation;
use alice_core::runtime::{
    AgentRuntime, ConnectionRecord, RuntimeEvent, TimingData, WalletSwitch,
};
use alice_core::session::Console;
use alice_core::signal::SignalResolver;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Console fed from a fixed list of input lines
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    pub prompts: Vec<String>,
    pub statuses: Vec<String>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            inputs: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }

    pub fn prompted(&self, text: &str) -> usize {
        self.prompts.iter().filter(|p| p.as_str() == text).count()
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        self.prompts.push(text.to_string());
        Ok(self.inputs.pop_front())
    }

    fn status(&mut self, text: &str) {
        self.statuses.push(text.to_string());
    }

    fn message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn error(&mut self, text: &str) {
        self.errors.push(text.to_string());
    }
}

/// A call the session made on the runtime
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Submit(Value),
    Post {
        path: String,
        params: Vec<(String, String)>,
        body: Value,
    },
    Wallet {
        name: String,
        with_webhook: bool,
    },
    Timing,
    Terminate,
}

/// In-memory runtime; connections resolve during submit unless
/// `resolve_after` defers it to a background task
pub struct FakeRuntime {
    /// Shared so tests can inspect calls after handing the runtime off
    pub calls: Arc<Mutex<Vec<Call>>>,
    /// Readiness outcome for each submitted invitation, in order.
    /// Missing entries connect successfully.
    pub outcomes: Mutex<VecDeque<bool>>,
    pub connection_id: Option<String>,
    pub fail_submit: bool,
    pub fail_posts: bool,
    pub events: Mutex<Vec<RuntimeEvent>>,
    /// Queued as notifications once an invitation is submitted
    pub events_on_submit: Mutex<Vec<RuntimeEvent>>,
    pub timing: Option<TimingData>,
    pub terminate_result: bool,
    pub panic_on_post: bool,
    pub resolve_after: Option<Duration>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            outcomes: Mutex::new(VecDeque::new()),
            connection_id: Some("conn-1".to_string()),
            fail_submit: false,
            fail_posts: false,
            events: Mutex::new(Vec::new()),
            events_on_submit: Mutex::new(Vec::new()),
            timing: None,
            terminate_result: true,
            panic_on_post: false,
            resolve_after: None,
        }
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(outcomes: &[bool]) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn push_event(&self, event: RuntimeEvent) {
        self.events.lock().push(event);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn terminate_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| **c == Call::Terminate)
            .count()
    }
}

#[async_trait]
impl AgentRuntime for FakeRuntime {
    async fn submit_invitation(
        &self,
        invitation: &Invitation,
        readiness: Option<SignalResolver>,
    ) -> Result<ConnectionRecord> {
        self.calls.lock().push(Call::Submit(invitation.as_json()));
        if self.fail_submit {
            return Err(Error::Admin {
                path: "/connections/receive-invitation".to_string(),
                status: 422,
                body: "bad invitation".to_string(),
            });
        }

        let delivered: Vec<RuntimeEvent> = self.events_on_submit.lock().drain(..).collect();
        self.events.lock().extend(delivered);

        let ready = self.outcomes.lock().pop_front().unwrap_or(true);
        match (readiness, self.resolve_after) {
            (Some(resolver), Some(delay)) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    resolver.resolve(ready);
                });
            }
            (Some(resolver), None) => resolver.resolve(ready),
            (None, _) => {}
        }

        Ok(ConnectionRecord {
            connection_id: self.connection_id.clone(),
            raw: json!({ "connection_id": self.connection_id }),
        })
    }

    async fn admin_post(&self, path: &str, params: &[(&str, &str)], body: Value) -> Result<Value> {
        if self.panic_on_post {
            panic!("runtime exploded");
        }
        self.calls.lock().push(Call::Post {
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
        });
        if self.fail_posts {
            return Err(Error::Admin {
                path: path.to_string(),
                status: 500,
                body: "internal".to_string(),
            });
        }
        Ok(json!({}))
    }

    async fn register_or_switch_wallet(
        &self,
        wallet_name: &str,
        with_webhook: bool,
    ) -> Result<WalletSwitch> {
        self.calls.lock().push(Call::Wallet {
            name: wallet_name.to_string(),
            with_webhook,
        });
        Ok(WalletSwitch::Created {
            wallet_id: format!("{}-id", wallet_name),
        })
    }

    async fn fetch_timing(&self) -> Result<Option<TimingData>> {
        self.calls.lock().push(Call::Timing);
        Ok(self.timing.clone())
    }

    fn drain_events(&self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    async fn terminate(&self) -> bool {
        self.calls.lock().push(Call::Terminate);
        self.terminate_result
    }
}
