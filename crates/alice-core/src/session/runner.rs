//! The interactive session loop

use std::time::Instant;

use serde_json::json;
use tracing::{debug, info};

use super::commands::{CommandAction, CommandMenu};
use super::console::Console;
use super::state::{Phase, SessionState};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::invitation::{self, Invitation};
use crate::runtime::{format_timing, AgentRuntime, RuntimeEvent, WalletSwitch};
use crate::signal::ConnectionSignal;

const INVITATION_PROMPT: &str = "Invite details: ";

/// Connection state in which the agent first reports a new connection
const INVITATION_RECEIVED: &str = "invitation-received";

/// Drives one interactive session against an agent runtime.
///
/// The loop is the only writer of [`SessionState`]. Agent notifications are
/// queued by the runtime and applied here between prompts.
pub struct SessionLoop<'a, R: AgentRuntime + ?Sized, C: Console + ?Sized> {
    runtime: &'a R,
    console: &'a mut C,
    config: SessionConfig,
    menu: CommandMenu,
    state: SessionState,
    /// The last submitted invitation produced no connection id yet
    learning_connection: bool,
}

impl<'a, R: AgentRuntime + ?Sized, C: Console + ?Sized> SessionLoop<'a, R, C> {
    pub fn new(runtime: &'a R, console: &'a mut C, config: SessionConfig) -> Self {
        let menu = CommandMenu::build(&config);
        Self {
            runtime,
            console,
            config,
            menu,
            state: SessionState::new(),
            learning_connection: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn menu(&self) -> &CommandMenu {
        &self.menu
    }

    /// Run until the user exits or input ends.
    ///
    /// Only console failures end the loop with an error; agent failures are
    /// shown and the session carries on.
    pub async fn run(mut self) -> Result<SessionState> {
        self.console.status("Input invitation details");

        loop {
            match self.state.phase {
                Phase::AwaitingInvitation => self.accept_invitation().await?,
                Phase::AwaitingCommand => self.next_command().await?,
                Phase::Exited => break,
            }
        }

        if self.config.timing {
            self.show_timing().await;
        }

        info!("Session finished");
        Ok(self.state)
    }

    /// Prompt for a line; end of input exits the session
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        self.apply_events();
        let line = self.console.prompt(prompt).await?;
        if line.is_none() {
            debug!("Input closed");
            self.state.phase = Phase::Exited;
        }
        Ok(line)
    }

    async fn accept_invitation(&mut self) -> Result<()> {
        let Some(line) = self.ask(INVITATION_PROMPT).await? else {
            return Ok(());
        };
        let raw = line.trim();
        if raw.is_empty() {
            return Ok(());
        }

        match invitation::decode(raw) {
            Ok(invitation) => self.connect(invitation).await,
            Err(e) => {
                self.console.error(&e.to_string());
                Ok(())
            }
        }
    }

    async fn connect(&mut self, invitation: Invitation) -> Result<()> {
        debug!("Submitting invitation {:?}", invitation.message_type());
        let started = Instant::now();
        let (signal, resolver) = ConnectionSignal::create();

        match self.runtime.submit_invitation(&invitation, Some(resolver)).await {
            Ok(record) => match record.connection_id {
                Some(id) => {
                    self.state.connection_id = Some(id);
                    self.learning_connection = false;
                }
                None => self.learning_connection = true,
            },
            Err(e) => {
                self.console.error(&format!("Failed to submit invitation: {}", e));
                return Ok(());
            }
        }

        if !signal.peek_ready() {
            self.console.status("Waiting for connection...");
        }

        if signal.await_ready().await {
            self.apply_events();
            self.console.message(&format!(
                "Connect duration: {:.2}s",
                started.elapsed().as_secs_f64()
            ));
            info!("Connected: {:?}", self.state.connection_id);
            self.state.phase = Phase::AwaitingCommand;
        } else {
            self.learning_connection = false;
            self.console
                .error("Connection was not established; enter another invitation");
        }
        Ok(())
    }

    async fn next_command(&mut self) -> Result<()> {
        let prompt = self.menu.render();
        let Some(line) = self.ask(&prompt).await? else {
            return Ok(());
        };

        match self.menu.resolve(&line) {
            Some(CommandAction::Exit) => self.state.phase = Phase::Exited,
            Some(CommandAction::NewInvitation) => {
                self.console.status("Input new invitation details");
                self.state.phase = Phase::AwaitingInvitation;
            }
            Some(CommandAction::SendMessage) => self.send_message().await?,
            Some(CommandAction::SetEndorserDid) => self.set_endorser_did().await?,
            Some(CommandAction::SwitchWallet) => self.switch_wallet().await?,
            None => debug!("Ignoring input {:?}", line),
        }
        Ok(())
    }

    fn require_connection(&mut self) -> Option<String> {
        if self.state.connection_id.is_none() {
            self.console.error(&Error::NotConnected.to_string());
        }
        self.state.connection_id.clone()
    }

    async fn send_message(&mut self) -> Result<()> {
        let Some(message) = self.ask("Enter message: ").await? else {
            return Ok(());
        };
        if message.is_empty() {
            return Ok(());
        }
        let Some(connection_id) = self.require_connection() else {
            return Ok(());
        };

        let path = format!("/connections/{}/send-message", connection_id);
        if let Err(e) = self
            .runtime
            .admin_post(&path, &[], json!({ "content": message }))
            .await
        {
            self.console.error(&format!("Failed to send message: {}", e));
        }
        Ok(())
    }

    async fn set_endorser_did(&mut self) -> Result<()> {
        let Some(did) = self.ask("Enter Endorser's DID: ").await? else {
            return Ok(());
        };
        let Some(connection_id) = self.require_connection() else {
            return Ok(());
        };

        let path = format!("/transactions/{}/set-endorser-info", connection_id);
        let params = [("endorser_did", did.trim()), ("endorser_name", "endorser")];
        match self.runtime.admin_post(&path, &params, json!({})).await {
            Ok(_) => self.console.message(&format!("Endorser DID set to {}", did.trim())),
            Err(e) => self
                .console
                .error(&format!("Failed to set endorser info: {}", e)),
        }
        Ok(())
    }

    async fn switch_wallet(&mut self) -> Result<()> {
        let Some(name) = self.ask("Enter wallet name: ").await? else {
            return Ok(());
        };
        let Some(answer) = self.ask("(Y/N) Create sub-wallet webhook target: ").await? else {
            return Ok(());
        };
        let name = name.trim();
        let with_webhook = answer.trim().eq_ignore_ascii_case("y");

        match self.runtime.register_or_switch_wallet(name, with_webhook).await {
            Ok(WalletSwitch::Created { wallet_id }) => self
                .console
                .message(&format!("Created wallet {} ({})", name, wallet_id)),
            Ok(WalletSwitch::Switched { wallet_id }) => self
                .console
                .message(&format!("Switched to wallet {} ({})", name, wallet_id)),
            Err(e) => self.console.error(&format!("Wallet operation failed: {}", e)),
        }
        Ok(())
    }

    /// Apply notifications queued by the runtime since the last prompt
    fn apply_events(&mut self) {
        for event in self.runtime.drain_events() {
            match event {
                RuntimeEvent::ConnectionState {
                    connection_id,
                    state,
                } => {
                    debug!("Connection {} is {}", connection_id, state);
                    if self.learning_connection && state == INVITATION_RECEIVED {
                        self.state.connection_id = Some(connection_id);
                        self.learning_connection = false;
                    }
                }
                RuntimeEvent::MessageReceived { content, .. } => {
                    self.console.message(&format!("Received message: {}", content));
                }
                RuntimeEvent::CredentialState { exchange_id, state } => {
                    self.console
                        .status(&format!("Credential exchange {}: {}", exchange_id, state));
                    self.state.credential_states.insert(exchange_id, state);
                }
                RuntimeEvent::ProblemReport { description } => {
                    self.console
                        .error(&format!("Received problem report: {}", description));
                }
            }
        }
    }

    async fn show_timing(&mut self) {
        match self.runtime.fetch_timing().await {
            Ok(Some(timing)) => {
                for line in format_timing(&timing) {
                    self.console.message(&line);
                }
            }
            Ok(None) => debug!("Agent reported no timing data"),
            Err(e) => self
                .console
                .error(&format!("Failed to fetch timing data: {}", e)),
        }
    }
}
