//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race a downstream call against the route's timeout
//! - Turn a lost race into a status-less DownstreamError
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The abandoned call future is dropped; nothing else is cancelled

use std::future::Future;
use std::time::Duration;

use crate::error::{DownstreamError, GatewayError};

/// Await `fut`, failing with a timeout error if `timeout` elapses first.
pub async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match timeout {
        None => fut.await,
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(DownstreamError::timeout(limit.as_millis() as u64).into()),
        },
    }
}
