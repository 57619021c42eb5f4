// Bounded, cancellable fetch execution

use crate::view::{DataFetcher, FetchContext};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Limit applied to server and client fetches unless configured otherwise.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a fetch produced no data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The fetcher returned an error
    #[error("{0}")]
    Failed(String),

    /// The fetcher did not finish within the timeout; its token was cancelled
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The fetch's token was cancelled by its owner
    #[error("cancelled")]
    Cancelled,
}

/// Run `fetcher` until it resolves, its token is cancelled, or `timeout`
/// elapses. On timeout the token is cancelled before returning.
pub async fn run_fetch(
    fetcher: &dyn DataFetcher,
    ctx: FetchContext,
    timeout: Option<Duration>,
) -> Result<Value, FetchError> {
    let cancel = ctx.cancel.clone();

    let guarded = async {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = fetcher.fetch(ctx) => result.map_err(|e| FetchError::Failed(e.to_string())),
        }
    };

    match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                Err(FetchError::TimedOut(limit))
            }
        },
        None => guarded.await,
    }
}
