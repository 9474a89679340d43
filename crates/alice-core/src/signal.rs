//! One-shot connection readiness signal
//!
//! The session creates a signal right before it submits an invitation and
//! hands the [`SignalResolver`] half to the runtime. The runtime resolves it
//! when its webhook listener sees the connection complete (or fail), and the
//! session awaits the [`ConnectionSignal`] half before accepting commands.
//!
//! Both halves are consumed by use: a resolver resolves once, a signal is
//! awaited once. Awaiting the same signal twice is not expressible.

use tokio::sync::watch;

/// Resolution state of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Unresolved,
    Succeeded,
    Failed,
}

impl SignalState {
    fn is_resolved(&self) -> bool {
        !matches!(self, SignalState::Unresolved)
    }
}

/// Awaiting half of a connection readiness signal
#[derive(Debug)]
pub struct ConnectionSignal {
    rx: watch::Receiver<SignalState>,
}

/// Resolving half, held by the runtime until the connection settles
#[derive(Debug)]
pub struct SignalResolver {
    tx: watch::Sender<SignalState>,
}

impl ConnectionSignal {
    /// Allocate a new unresolved signal and its resolver
    pub fn create() -> (ConnectionSignal, SignalResolver) {
        let (tx, rx) = watch::channel(SignalState::Unresolved);
        (ConnectionSignal { rx }, SignalResolver { tx })
    }

    /// True only if the signal has already resolved successfully
    pub fn peek_ready(&self) -> bool {
        *self.rx.borrow() == SignalState::Succeeded
    }

    /// Current state without waiting
    pub fn state(&self) -> SignalState {
        *self.rx.borrow()
    }

    /// Wait until the signal resolves and return whether the connection is
    /// ready.
    ///
    /// A resolver dropped without resolving counts as a failure.
    pub async fn await_ready(mut self) -> bool {
        match self.rx.wait_for(SignalState::is_resolved).await {
            Ok(state) => *state == SignalState::Succeeded,
            Err(_) => false,
        }
    }
}

impl SignalResolver {
    /// Resolve the signal. Consumes the resolver, so this happens at most once.
    pub fn resolve(self, success: bool) {
        let state = if success {
            SignalState::Succeeded
        } else {
            SignalState::Failed
        };
        // The session may have stopped waiting; nothing to do then
        let _ = self.tx.send(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolve_success() {
        let (signal, resolver) = ConnectionSignal::create();
        assert!(!signal.peek_ready());
        assert_eq!(signal.state(), SignalState::Unresolved);

        resolver.resolve(true);
        assert!(signal.peek_ready());
        assert!(signal.await_ready().await);
    }

    #[tokio::test]
    async fn test_resolve_failure_is_not_ready() {
        let (signal, resolver) = ConnectionSignal::create();
        resolver.resolve(false);

        assert!(!signal.peek_ready());
        assert_eq!(signal.state(), SignalState::Failed);
        assert!(!signal.await_ready().await);
    }

    #[tokio::test]
    async fn test_dropped_resolver_fails() {
        let (signal, resolver) = ConnectionSignal::create();
        drop(resolver);
        assert!(!signal.await_ready().await);
    }

    #[tokio::test]
    async fn test_await_resumes_on_later_resolution() {
        let (signal, resolver) = ConnectionSignal::create();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            resolver.resolve(true);
        });

        let ready = tokio::time::timeout(Duration::from_secs(5), signal.await_ready())
            .await
            .expect("signal should resolve");
        assert!(ready);
    }
}
