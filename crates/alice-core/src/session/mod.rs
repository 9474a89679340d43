//! Session module - the interactive front-end state machine
//!
//! The session owns all mutable state of a run and drives the agent through
//! [`AgentRuntime`](crate::runtime::AgentRuntime) one step at a time:
//!
//! ```text
//!                 ┌──────────────────────┐
//!   start ──────▶ │  AwaitingInvitation  │ ◀──── (4) new invitation
//!                 └──────────┬───────────┘                 ▲
//!              decode, submit│await ConnectionSignal        │
//!                            ▼                              │
//!                 ┌──────────────────────┐                  │
//!                 │   AwaitingCommand    │ ── (3) (D) (W) ──┤
//!                 └──────────┬───────────┘                  │
//!                   (X) / "" │                              │
//!                            ▼                              │
//!                        Exited              handlers return here
//! ```
//!
//! Commands come from an immutable [`CommandMenu`] computed once from the
//! [`SessionConfig`](crate::config::SessionConfig). All terminal I/O goes
//! through the [`Console`] trait so the loop can be driven by a script.

mod commands;
mod console;
mod runner;
mod state;

pub use commands::{CommandAction, CommandMenu, CommandSpec, COMMANDS};
pub use console::Console;
pub use runner::SessionLoop;
pub use state::{Phase, SessionState};
