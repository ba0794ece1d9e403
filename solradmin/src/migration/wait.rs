//! Polling an async admin request until it finishes

use super::MigrationError;
use crate::admin::{AdminApi, AsyncRequestStatus, AsyncState};
use crate::metrics;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Poll `REQUESTSTATUS` for `request_id` every `poll_interval`.
///
/// `submitted` and `running` keep polling and reset the miss counter.
/// `notfound` counts as a miss; the wait fails once `max_missed` consecutive
/// misses have been seen. `completed` ends the wait, any other state fails it.
pub async fn await_completion(
    admin: &dyn AdminApi,
    request_id: &str,
    poll_interval: Duration,
    max_missed: u32,
) -> Result<AsyncRequestStatus, MigrationError> {
    let mut missed: u32 = 0;
    let mut polls: u64 = 0;

    loop {
        let status = admin.request_status(request_id).await.map_err(|e| {
            MigrationError::AsyncStatusUnavailable {
                request_id: request_id.to_string(),
                reason: e.to_string(),
            }
        })?;
        polls += 1;
        metrics::record_async_poll(status.state.as_str());

        match &status.state {
            AsyncState::Completed => {
                info!(request_id = request_id, polls = polls, "Async request completed");
                return Ok(status);
            }
            AsyncState::Submitted | AsyncState::Running => {
                debug!(
                    request_id = request_id,
                    state = %status.state,
                    polls = polls,
                    "Async request pending"
                );
                missed = 0;
            }
            AsyncState::NotFound => {
                missed += 1;
                warn!(
                    request_id = request_id,
                    missed = missed,
                    max_missed = max_missed,
                    "Async request not found"
                );
                if missed >= max_missed {
                    return Err(MigrationError::AsyncTaskMissing {
                        request_id: request_id.to_string(),
                        polls: missed,
                    });
                }
            }
            AsyncState::Failed | AsyncState::Other(_) => {
                return Err(MigrationError::AsyncTaskFailed {
                    request_id: request_id.to_string(),
                    state: status.state.to_string(),
                    message: status.message.clone(),
                });
            }
        }

        tokio::time::sleep(poll_interval).await;
    }
}
