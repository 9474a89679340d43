//! Webhook listener for agent notifications
//!
//! The agent posts every state change to `<webhook url>/topic/<topic>/`.
//! Connection changes feed the [`ConnectionWatch`]; everything the session
//! should see is queued as a [`RuntimeEvent`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::watch::ConnectionWatch;
use super::RuntimeEvent;
use crate::error::{Error, Result};

/// Sender side of the runtime event queue
pub type EventSender = mpsc::UnboundedSender<RuntimeEvent>;

/// Shared state of the webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    pub watch: Arc<ConnectionWatch>,
    pub events: EventSender,
}

#[derive(Debug, Deserialize)]
struct ConnectionPayload {
    connection_id: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    rfc23_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BasicMessagePayload {
    #[serde(default)]
    connection_id: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CredentialPayload {
    #[serde(alias = "cred_ex_id", alias = "credential_exchange_id")]
    exchange_id: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct ProblemReportPayload {
    #[serde(default)]
    description: Option<Value>,
}

/// Build the webhook router
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/topic/:topic/", post(handle_topic))
        .route("/webhooks/topic/:topic", post(handle_topic))
        .with_state(state)
}

async fn handle_topic(
    State(state): State<WebhookState>,
    Path(topic): Path<String>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    debug!("Webhook {}: {}", topic, payload);

    match topic.as_str() {
        "connections" => handle_connection(&state, payload),
        "basicmessages" => {
            if let Some(msg) = parse::<BasicMessagePayload>(&topic, payload) {
                queue(
                    &state,
                    RuntimeEvent::MessageReceived {
                        connection_id: msg.connection_id,
                        content: msg.content,
                    },
                );
            }
        }
        "issue_credential" | "issue_credential_v2_0" => {
            if let Some(cred) = parse::<CredentialPayload>(&topic, payload) {
                queue(
                    &state,
                    RuntimeEvent::CredentialState {
                        exchange_id: cred.exchange_id,
                        state: cred.state,
                    },
                );
            }
        }
        "problem_report" => {
            if let Some(report) = parse::<ProblemReportPayload>(&topic, payload) {
                let description = match report.description {
                    Some(Value::String(s)) => s,
                    Some(Value::Object(map)) => match map.get("en").and_then(Value::as_str) {
                        Some(en) => en.to_string(),
                        None => Value::Object(map.clone()).to_string(),
                    },
                    Some(other) => other.to_string(),
                    None => "unknown problem".to_string(),
                };
                queue(&state, RuntimeEvent::ProblemReport { description });
            }
        }
        _ => debug!("Ignoring webhook topic {}", topic),
    }

    Json(Value::Object(Default::default()))
}

fn handle_connection(state: &WebhookState, payload: Value) {
    let Some(conn) = parse::<ConnectionPayload>("connections", payload) else {
        return;
    };

    // RFC 23 state names are more precise; fall back to the legacy ones
    let Some(conn_state) = conn.rfc23_state.or(conn.state) else {
        return;
    };

    state.watch.observe(&conn.connection_id, &conn_state);
    queue(
        state,
        RuntimeEvent::ConnectionState {
            connection_id: conn.connection_id,
            state: conn_state,
        },
    );
}

fn parse<T: serde::de::DeserializeOwned>(topic: &str, payload: Value) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Malformed {} webhook: {}", topic, e);
            None
        }
    }
}

fn queue(state: &WebhookState, event: RuntimeEvent) {
    if state.events.send(event).is_err() {
        debug!("Event queue closed, dropping webhook event");
    }
}

/// A running webhook listener
pub struct WebhookListener {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl WebhookListener {
    /// Bind the listener and serve until [`WebhookListener::shutdown`]
    pub async fn start(addr: SocketAddr, state: WebhookState) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Webhook(format!("Failed to bind {}: {}", addr, e)))?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = router(state);
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                warn!("Webhook listener stopped with error: {}", e);
            }
        });

        info!("Listening for webhooks on {}", addr);
        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop serving; true when the listener task ended cleanly
    pub async fn shutdown(mut self) -> bool {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.handle.await {
            Ok(()) => {
                debug!("Webhook listener on {} stopped", self.addr);
                true
            }
            Err(e) => {
                warn!("Webhook listener task failed: {}", e);
                false
            }
        }
    }
}
