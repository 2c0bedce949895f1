use std::future::Future;

use crate::Result;

/// Service able to embed and summarize single pieces of text.
///
/// The batch pool only ever calls one item at a time per worker, so an
/// implementation needs no internal batching.
pub trait ModelBackend: Send + Sync {
    /// Verify the service is reachable and has every model it needs
    ///
    /// # Errors
    /// Returns a connectivity error with remediation steps if not
    fn check_ready(&self) -> impl Future<Output = Result<()>> + Send;

    /// Generate an embedding for `text`
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is unusable
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f64>>> + Send;

    /// Generate a short, cleaned topic summary for `text`
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is unusable
    fn summarize(&self, text: &str) -> impl Future<Output = Result<String>> + Send;
}
