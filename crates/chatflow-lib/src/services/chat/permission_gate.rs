// Permission Gate
//
// Holds pending tool-execution approval requests, keyed by the assistant
// message that asked for them. A background sweep finds requests that sat
// unanswered past the timeout and reports them for auto-denial through the
// same resolution path a user decision takes. The sweep task is owned by
// the gate: started on construction, aborted when the gate is dropped, so
// no timer outlives a test run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::models::{now_millis, PermissionRequest};

/// Sweep cadence and request timeout. Production defaults are 1s / 60s;
/// tests use short values instead of mocking time.
#[derive(Debug, Clone)]
pub struct PermissionGateConfig {
    pub sweep_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for PermissionGateConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Pending tool-permission requests plus their timeout sweep
pub struct PermissionGate {
    pending: Arc<RwLock<HashMap<String, PermissionRequest>>>,
    config: PermissionGateConfig,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl PermissionGate {
    /// Create a gate with the given sweep configuration
    pub fn new(config: PermissionGateConfig) -> Self {
        Self {
            pending: Arc::new(RwLock::new(HashMap::new())),
            config,
            sweep: Mutex::new(None),
        }
    }

    /// Register a pending request. A repeat request for the same message id
    /// replaces the previous one.
    pub async fn add_request(&self, request: PermissionRequest) {
        log::info!(
            "Permission requested: message={} tools={}",
            request.message_id,
            request.tool_calls.len()
        );
        let mut pending = self.pending.write().await;
        pending.insert(request.message_id.clone(), request);
    }

    /// Atomically take a pending request out of the gate.
    ///
    /// Returns None when the request was already resolved - the idempotence
    /// primitive for the race between the timeout sweep and a late user
    /// click. Only the caller that gets Some may perform resolution side
    /// effects; callers that get None treat it as success and do nothing.
    pub async fn claim(&self, message_id: &str) -> Option<PermissionRequest> {
        let mut pending = self.pending.write().await;
        pending.remove(message_id)
    }

    /// Put a claimed request back, used when resolution could not complete
    /// (e.g. the bridge call failed) and the request should stay pending.
    pub async fn restore(&self, request: PermissionRequest) {
        let mut pending = self.pending.write().await;
        pending.entry(request.message_id.clone()).or_insert(request);
    }

    /// Snapshot of all pending requests, keyed by message id
    pub async fn list_pending(&self) -> HashMap<String, PermissionRequest> {
        let pending = self.pending.read().await;
        pending.clone()
    }

    /// Message ids of requests overdue at `now`
    pub async fn expired_ids(&self, now: i64) -> Vec<String> {
        let timeout_ms = self.config.request_timeout.as_millis() as i64;
        let pending = self.pending.read().await;
        pending
            .values()
            .filter(|request| request.is_expired(now, timeout_ms))
            .map(|request| request.message_id.clone())
            .collect()
    }

    /// Start the background sweep. Overdue message ids are delivered on the
    /// returned channel; the consumer routes them through the normal denial
    /// path. Calling again replaces the previous sweep task.
    pub fn start_sweep(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::clone(&self.pending);
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let timeout_ms = config.request_timeout.as_millis() as i64;
            loop {
                ticker.tick().await;
                let now = now_millis();
                let overdue: Vec<String> = {
                    let pending = pending.read().await;
                    pending
                        .values()
                        .filter(|request| request.is_expired(now, timeout_ms))
                        .map(|request| request.message_id.clone())
                        .collect()
                };
                for message_id in overdue {
                    log::info!("Permission request timed out: message={}", message_id);
                    if tx.send(message_id).is_err() {
                        // Consumer gone; the gate is being torn down
                        return;
                    }
                }
            }
        });

        if let Ok(mut sweep) = self.sweep.lock() {
            if let Some(previous) = sweep.replace(handle) {
                previous.abort();
            }
        }
        rx
    }

    /// Stop the background sweep, if running
    pub fn stop_sweep(&self) {
        if let Ok(mut sweep) = self.sweep.lock() {
            if let Some(handle) = sweep.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for PermissionGate {
    fn drop(&mut self) {
        self.stop_sweep();
    }
}

// ============================================================================
// Tests
// ============================================================================
