//! Admin tooling metrics
//!
//! Emitted through the `metrics` facade. Nothing is recorded unless the
//! embedding program installs a recorder.
//! - Admin request counts, durations and errors
//! - Transport retries
//! - Async status polls
//! - Migration outcomes

use std::time::{Duration, Instant};

/// Record admin request duration
pub fn record_admin_duration(action: &str, duration: Duration) {
    metrics::histogram!(
        "solradmin_admin_request_duration_seconds",
        "action" => action.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record an admin request that produced an HTTP response
pub fn record_admin_response(action: &str, http_status: u16) {
    let status = if (200..300).contains(&http_status) {
        "ok"
    } else {
        "rejected"
    };
    metrics::counter!(
        "solradmin_admin_requests_total",
        "action" => action.to_string(),
        "status" => status,
    )
    .increment(1);
}

/// Record an admin request that never produced a response
pub fn record_admin_error(action: &str, error_type: &str) {
    metrics::counter!(
        "solradmin_admin_requests_total",
        "action" => action.to_string(),
        "status" => "error",
    )
    .increment(1);

    metrics::counter!(
        "solradmin_admin_errors_total",
        "action" => action.to_string(),
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Record a transport retry
pub fn record_admin_retry(action: &str) {
    metrics::counter!(
        "solradmin_admin_retries_total",
        "action" => action.to_string(),
    )
    .increment(1);
}

/// Record one async status poll and the state it returned
pub fn record_async_poll(state: &str) {
    metrics::counter!(
        "solradmin_async_polls_total",
        "state" => state.to_string(),
    )
    .increment(1);
}

/// Record a finished replica move
pub fn record_migration(outcome: &str, phase: &str, duration: Duration) {
    metrics::counter!(
        "solradmin_migrations_total",
        "outcome" => outcome.to_string(),
        "phase" => phase.to_string(),
    )
    .increment(1);

    metrics::histogram!(
        "solradmin_migration_duration_seconds",
        "outcome" => outcome.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Guard for timing admin requests
pub struct AdminTimer {
    action: &'static str,
    start: Instant,
}

impl AdminTimer {
    /// Start timing an admin request
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            start: Instant::now(),
        }
    }

    /// Record the response status and duration
    pub fn response(self, http_status: u16) {
        record_admin_duration(self.action, self.start.elapsed());
        record_admin_response(self.action, http_status);
    }

    /// Record error and duration
    pub fn error(self, error_type: &str) {
        record_admin_duration(self.action, self.start.elapsed());
        record_admin_error(self.action, error_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_timer() {
        let timer = AdminTimer::new("ADDREPLICA");
        std::thread::sleep(Duration::from_millis(1));
        timer.response(200);

        AdminTimer::new("REQUESTSTATUS").error("timeout");
    }

    #[test]
    fn test_record_without_recorder() {
        record_async_poll("notfound");
        record_migration("failed", "await_async", Duration::from_secs(3));
    }
}
