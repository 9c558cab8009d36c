//! Result type alias for client operations.

use super::rag_error::RagError;

/// Type alias for Results using [`RagError`].
///
/// ```ignore
/// use ragchat::error::RagResult;
///
/// async fn latest_status(api: &RagApiClient<ReqwestHttpClient>) -> RagResult<RagStatus> {
///     Ok(api.check_status("abc").await?.status)
/// }
/// ```
pub type RagResult<T> = Result<T, RagError>;
