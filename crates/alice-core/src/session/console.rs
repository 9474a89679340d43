//! Line-oriented console used by the session

use async_trait::async_trait;

use crate::error::Result;

/// Prompts and status output.
///
/// `prompt` returns `None` once input is exhausted.
#[async_trait]
pub trait Console: Send {
    async fn prompt(&mut self, text: &str) -> Result<Option<String>>;

    /// Progress line, e.g. which step the session is on
    fn status(&mut self, text: &str);

    /// Plain output line
    fn message(&mut self, text: &str);

    /// A failure the user should see; never fatal
    fn error(&mut self, text: &str);
}
