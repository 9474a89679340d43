//! Agent runtime backed by an HTTP admin API

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::admin::AdminClient;
use super::process::{build_agent_args, AgentProcess};
use super::timing::TimingData;
use super::watch::ConnectionWatch;
use super::webhook::{WebhookListener, WebhookState};
use super::{AgentRuntime, ConnectionRecord, RuntimeEvent, WalletSwitch};
use crate::config::{EndorserRole, StartupConfig};
use crate::error::{Error, Result};
use crate::invitation::Invitation;
use crate::signal::SignalResolver;

/// Sub-wallet created during this run
#[derive(Debug, Clone)]
struct ManagedWallet {
    wallet_id: String,
    token: String,
}

/// [`AgentRuntime`] talking to an agent's admin API
pub struct AdminRuntime {
    config: StartupConfig,
    admin: AdminClient,
    watch: Arc<ConnectionWatch>,
    events_tx: mpsc::UnboundedSender<RuntimeEvent>,
    events_rx: Mutex<mpsc::UnboundedReceiver<RuntimeEvent>>,
    listeners: Mutex<Vec<WebhookListener>>,
    process: Mutex<Option<AgentProcess>>,
    wallets: Mutex<HashMap<String, ManagedWallet>>,
    /// Wider than a port so running past the top never wraps to port 0
    next_webhook_port: AtomicU32,
}

impl AdminRuntime {
    /// Build a runtime without starting anything
    pub fn new(config: StartupConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let admin = AdminClient::new(&config.admin_url());
        let next_webhook_port = AtomicU32::new(u32::from(config.ports().webhook) + 1);

        Self {
            config,
            admin,
            watch: Arc::new(ConnectionWatch::new()),
            events_tx,
            events_rx: Mutex::new(events_rx),
            listeners: Mutex::new(Vec::new()),
            process: Mutex::new(None),
            wallets: Mutex::new(HashMap::new()),
            next_webhook_port,
        }
    }

    /// Next port for a sub-wallet webhook listener
    fn allocate_webhook_port(&self) -> Result<u16> {
        let next = self.next_webhook_port.fetch_add(1, Ordering::SeqCst);
        u16::try_from(next).map_err(|_| {
            Error::Config("No free port left for another webhook listener".to_string())
        })
    }

    /// Start the webhook listener, spawn the agent if configured, and wait
    /// until its admin API is ready.
    ///
    /// Anything started before a failure is shut down again.
    pub async fn initialize(config: StartupConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Self::new(config);

        if let Err(e) = runtime.start().await {
            runtime.terminate().await;
            return Err(e);
        }
        Ok(runtime)
    }

    async fn start(&self) -> Result<()> {
        let webhook_port = self.config.ports().webhook;
        self.start_listener(webhook_port).await?;

        if let Some(command) = &self.config.agent_command {
            let wallet_key = format!("{}{}", self.config.ident, Uuid::new_v4());
            let args = build_agent_args(&self.config, &wallet_key);
            let process = AgentProcess::spawn(command, &args)?;
            *self.process.lock() = Some(process);
        }

        info!("Waiting for agent admin API at {}", self.admin.base_url());
        self.admin.wait_ready(self.config.ready_timeout()).await?;

        if self.config.multitenant {
            let ident = self.config.ident.clone();
            self.register_or_switch_wallet(&ident, false).await?;
        }

        Ok(())
    }

    fn webhook_state(&self) -> WebhookState {
        WebhookState {
            watch: Arc::clone(&self.watch),
            events: self.events_tx.clone(),
        }
    }

    /// Start a listener on the given port and return its public URL
    async fn start_listener(&self, port: u16) -> Result<String> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = WebhookListener::start(addr, self.webhook_state()).await?;
        let url = format!("http://{}:{}/webhooks", self.config.host, listener.local_addr().port());
        self.listeners.lock().push(listener);
        Ok(url)
    }

    pub fn config(&self) -> &StartupConfig {
        &self.config
    }

    pub fn admin(&self) -> &AdminClient {
        &self.admin
    }

    /// The connection the last invitation produced, if known
    pub fn connection_id(&self) -> Option<String> {
        self.watch.connection_id()
    }
}

#[async_trait]
impl AgentRuntime for AdminRuntime {
    async fn submit_invitation(
        &self,
        invitation: &Invitation,
        readiness: Option<SignalResolver>,
    ) -> Result<ConnectionRecord> {
        let waiting = readiness.is_some();
        if let Some(resolver) = readiness {
            self.watch.arm(resolver)?;
        }

        let path = if invitation.is_out_of_band() {
            "/out-of-band/receive-invitation"
        } else {
            "/connections/receive-invitation"
        };
        let params: &[(&str, &str)] = if self.config.endorser_role == EndorserRole::Author {
            &[("alias", "endorser")]
        } else {
            &[]
        };

        match self.admin.post(path, params, &invitation.as_json()).await {
            Ok(raw) => {
                let connection_id = raw
                    .get("connection_id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if let Some(id) = &connection_id {
                    self.watch.track(id);
                    // The handshake may already be past the webhook we need
                    let state = raw
                        .get("rfc23_state")
                        .or_else(|| raw.get("state"))
                        .and_then(Value::as_str);
                    if let Some(state) = state {
                        self.watch.observe(id, state);
                    }
                }
                Ok(ConnectionRecord { connection_id, raw })
            }
            Err(e) => {
                if waiting {
                    self.watch.disarm();
                }
                Err(e)
            }
        }
    }

    async fn admin_post(&self, path: &str, params: &[(&str, &str)], body: Value) -> Result<Value> {
        self.admin.post(path, params, &body).await
    }

    async fn register_or_switch_wallet(
        &self,
        wallet_name: &str,
        with_webhook: bool,
    ) -> Result<WalletSwitch> {
        let existing = self.wallets.lock().get(wallet_name).cloned();
        if let Some(wallet) = existing {
            self.admin.set_wallet_token(Some(wallet.token));
            info!("Switched to wallet {}", wallet_name);
            return Ok(WalletSwitch::Switched {
                wallet_id: wallet.wallet_id,
            });
        }

        let webhook_urls = if with_webhook {
            let port = self.allocate_webhook_port()?;
            vec![self.start_listener(port).await?]
        } else {
            Vec::new()
        };

        let wallet_type = self
            .config
            .wallet_type
            .map(|w| w.as_str())
            .unwrap_or("askar");
        let dispatch_type = if with_webhook { "both" } else { "base" };
        let body = json!({
            "label": wallet_name,
            "wallet_name": wallet_name,
            "wallet_key": format!("{}{}", wallet_name, Uuid::new_v4()),
            "wallet_type": wallet_type,
            "key_management_mode": "managed",
            "wallet_webhook_urls": webhook_urls,
            "wallet_dispatch_type": dispatch_type,
        });

        let response = self.admin.post_as_base("/multitenancy/wallet", &body).await?;
        let field = |name: &str| {
            response
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::Wallet(format!("Wallet response is missing {}", name)))
        };
        let wallet = ManagedWallet {
            wallet_id: field("wallet_id")?,
            token: field("token")?,
        };

        self.admin.set_wallet_token(Some(wallet.token.clone()));
        self.wallets
            .lock()
            .insert(wallet_name.to_string(), wallet.clone());
        info!("Created new wallet {}", wallet_name);

        Ok(WalletSwitch::Created {
            wallet_id: wallet.wallet_id,
        })
    }

    async fn fetch_timing(&self) -> Result<Option<TimingData>> {
        let status = self.admin.get("/status").await?;
        match status.get("timing") {
            Some(timing) if !timing.is_null() => Ok(Some(serde_json::from_value(timing.clone())?)),
            _ => Ok(None),
        }
    }

    fn drain_events(&self) -> Vec<RuntimeEvent> {
        let mut rx = self.events_rx.lock();
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn terminate(&self) -> bool {
        let mut clean = true;

        let listeners = std::mem::take(&mut *self.listeners.lock());
        for listener in listeners {
            clean &= listener.shutdown().await;
        }

        let process = self.process.lock().take();
        if let Some(mut process) = process {
            if !process.terminate().await {
                warn!("Agent process did not shut down cleanly");
                clean = false;
            }
        }

        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_ports_follow_base_listener() {
        let runtime = AdminRuntime::new(StartupConfig::default());
        let base = runtime.config.ports().webhook;

        assert_eq!(runtime.allocate_webhook_port().unwrap(), base + 1);
        assert_eq!(runtime.allocate_webhook_port().unwrap(), base + 2);
    }

    #[test]
    fn test_webhook_ports_exhausted() {
        let runtime = AdminRuntime::new(StartupConfig {
            start_port: u16::MAX - 2,
            ..StartupConfig::default()
        });

        assert!(matches!(
            runtime.allocate_webhook_port(),
            Err(Error::Config(_))
        ));
        // Still exhausted, never wraps around to low ports
        assert!(runtime.allocate_webhook_port().is_err());
    }
}
