//! Natural-language-to-SQL translator seam.

use async_trait::async_trait;

use crate::Error;

/// Black-box service turning a question plus instruction brief into query text.
///
/// Implementations return the raw reply; fence stripping and validation
/// happen in [`crate::query`].
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, instructions: &str, question: &str) -> Result<String, Error>;
}
