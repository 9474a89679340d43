//! Optional agent process managed by this front-end

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::{EndorserRole, StartupConfig};
use crate::error::{Error, Result};

/// How long a signalled agent gets to exit before it is killed
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Build the agent's command line from the startup configuration
pub fn build_agent_args(config: &StartupConfig, wallet_key: &str) -> Vec<String> {
    let ports = config.ports();
    let mut args: Vec<String> = vec![
        "start".into(),
        "--endpoint".into(),
        config.endpoint(),
        "--label".into(),
        config.label.clone(),
        "--inbound-transport".into(),
        "http".into(),
        "0.0.0.0".into(),
        ports.http.to_string(),
        "--outbound-transport".into(),
        "http".into(),
        "--admin".into(),
        "0.0.0.0".into(),
        ports.admin.to_string(),
        "--admin-insecure-mode".into(),
        "--wallet-type".into(),
        config
            .wallet_type
            .map(|w| w.as_str())
            .unwrap_or("askar")
            .to_string(),
        "--wallet-name".into(),
        format!("{}.wallet", config.ident),
        "--wallet-key".into(),
        wallet_key.to_string(),
        "--auto-provision".into(),
        "--preserve-exchange-records".into(),
        "--auto-ping-connection".into(),
        "--auto-respond-messages".into(),
        "--public-invites".into(),
        "--webhook-url".into(),
        config.webhook_url(),
    ];

    match &config.genesis_url {
        Some(url) => args.extend(["--genesis-url".to_string(), url.clone()]),
        None => args.push("--no-ledger".into()),
    }

    if config.aip == 20 {
        args.push("--emit-new-didcomm-prefix".into());
    }

    if !config.no_auto {
        args.extend([
            "--auto-accept-invites".to_string(),
            "--auto-accept-requests".to_string(),
            "--auto-respond-credential-offer".to_string(),
            "--auto-store-credential".to_string(),
            "--auto-respond-presentation-request".to_string(),
        ]);
    }

    if config.timing {
        args.push("--timing".into());
    }

    if config.mediation {
        args.push("--open-mediation".into());
    }

    if config.multitenant {
        args.extend([
            "--multitenant".to_string(),
            "--multitenant-admin".to_string(),
            "--jwt-secret".to_string(),
            "changeme".to_string(),
        ]);
    }

    if let Some(url) = &config.tails_server_base_url {
        args.extend(["--tails-server-base-url".to_string(), url.clone()]);
    }

    if config.revocation {
        args.push("--notify-revocation".into());
        args.push("--monitor-revocation-notification".into());
    }

    if config.endorser_role == EndorserRole::Author {
        args.extend([
            "--endorser-protocol-role".to_string(),
            "author".to_string(),
            "--auto-request-endorsement".to_string(),
            "--auto-write-transactions".to_string(),
            "--auto-create-revocation-transactions".to_string(),
            "--endorser-alias".to_string(),
            "endorser".to_string(),
        ]);
    }

    args
}

/// A spawned agent process
#[derive(Debug)]
pub struct AgentProcess {
    child: Child,
}

impl AgentProcess {
    pub fn spawn(command: &str, args: &[String]) -> Result<Self> {
        info!("Starting agent: {}", command);
        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Process(format!("Failed to start {}: {}", command, e)))?;

        Ok(Self { child })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Ask the agent to stop, killing it after a grace period.
    ///
    /// Returns true if the process exited.
    pub async fn terminate(&mut self) -> bool {
        if let Ok(Some(status)) = self.child.try_wait() {
            warn!("Agent process already exited: {}", status);
            return true;
        }

        self.request_stop();

        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!("Agent process exited: {}", status);
                true
            }
            Ok(Err(e)) => {
                warn!("Failed to wait for agent process: {}", e);
                false
            }
            Err(_) => {
                warn!("Agent process did not stop in time, killing it");
                self.child.kill().await.is_ok()
            }
        }
    }

    #[cfg(target_os = "linux")]
    fn request_stop(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.child.id() {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!("Failed to signal agent process: {}", e);
                let _ = self.child.start_kill();
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn request_stop(&mut self) {
        let _ = self.child.start_kill();
    }
}
