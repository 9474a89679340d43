//! Agent lifecycle - start the runtime, run the session, always shut down

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{error, info};

use crate::config::StartupConfig;
use crate::error::{Error, Result};
use crate::runtime::AgentRuntime;
use crate::session::{Console, SessionLoop, SessionState};

/// How a run ended
#[derive(Debug)]
pub struct LifecycleOutcome {
    /// Final session state, or why the session could not finish
    pub session: Result<SessionState>,
    /// Whether the runtime shut down cleanly
    pub terminated: bool,
}

impl LifecycleOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.session.is_ok() && self.terminated {
            0
        } else {
            1
        }
    }
}

/// Initialize a runtime, run one session on it, then terminate it.
///
/// Termination happens exactly once, whether the session exits normally,
/// fails, or panics. A runtime that fails to initialize is never run.
pub async fn run_lifecycle<R, C, F, Fut>(
    startup: StartupConfig,
    console: &mut C,
    initialize: F,
) -> LifecycleOutcome
where
    R: AgentRuntime,
    C: Console + ?Sized,
    F: FnOnce(StartupConfig) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let session_config = startup.session_config();
    let wallet_type = session_config
        .wallet_type
        .map(|w| w.as_str())
        .unwrap_or("askar");
    console.status(&format!(
        "Provision an agent and wallet, get back configuration details (Wallet type: {})",
        wallet_type
    ));

    let runtime = match initialize(startup).await {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Agent initialization failed: {}", e);
            console.error(&format!("Failed to start agent: {}", e));
            return LifecycleOutcome {
                session: Err(e),
                terminated: true,
            };
        }
    };

    let run = SessionLoop::new(&runtime, &mut *console, session_config).run();
    let session = match AssertUnwindSafe(run).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Error::Session(panic_message(panic.as_ref()))),
    };
    if let Err(e) = &session {
        error!("Session ended with error: {}", e);
        console.error(&e.to_string());
    }

    info!("Shutting down agent");
    let terminated = runtime.terminate().await;
    if !terminated {
        console.error("Agent did not shut down cleanly");
    }

    LifecycleOutcome {
        session,
        terminated,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "session panicked".to_string()
    }
}
