//! Asynchronous admin operation tracking
//!
//! An async admin call registers its id here and returns at once; the work
//! finishes in a background task. `get_status` waits up to a caller-chosen
//! timeout for a terminal state.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::ClusterError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsyncState {
    Running,
    Completed,
    Failed(String),
    TimedOut,
}

impl AsyncState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AsyncState::Running)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncOperation {
    pub id: String,
    pub state: AsyncState,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct AsyncOperations {
    ops: Mutex<HashMap<String, AsyncOperation>>,
    changed: Notify,
}

impl AsyncOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: &str) -> Result<(), ClusterError> {
        let mut ops = self.ops.lock();
        if ops.contains_key(id) {
            return Err(ClusterError::AsyncIdExists(id.to_string()));
        }
        ops.insert(
            id.to_string(),
            AsyncOperation {
                id: id.to_string(),
                state: AsyncState::Running,
                created_at: Utc::now(),
                finished_at: None,
            },
        );
        Ok(())
    }

    /// Record the outcome of a running operation. Terminal states stick.
    pub fn finish(&self, id: &str, outcome: Result<(), String>) {
        {
            let mut ops = self.ops.lock();
            let Some(op) = ops.get_mut(id) else {
                warn!("Finished unknown async request {}", id);
                return;
            };
            if op.state.is_terminal() {
                return;
            }
            op.state = match outcome {
                Ok(()) => AsyncState::Completed,
                Err(reason) => AsyncState::Failed(reason),
            };
            op.finished_at = Some(Utc::now());
            info!("Async request {} finished: {:?}", id, op.state);
        }
        self.changed.notify_waiters();
    }

    pub fn get(&self, id: &str) -> Option<AsyncOperation> {
        self.ops.lock().get(id).cloned()
    }

    /// Wait for `id` to complete or fail. Once `timeout` elapses the
    /// operation is marked `TimedOut`.
    pub async fn get_status(&self, id: &str, timeout: Duration) -> Result<AsyncState, ClusterError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let state = self
                .get(id)
                .map(|op| op.state)
                .ok_or_else(|| ClusterError::AsyncNotFound(id.to_string()))?;
            if state.is_terminal() {
                return Ok(state);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(self.time_out(id));
            }
            let _ = tokio::time::timeout(deadline - now, notified).await;
        }
    }

    fn time_out(&self, id: &str) -> AsyncState {
        let mut ops = self.ops.lock();
        match ops.get_mut(id) {
            Some(op) if !op.state.is_terminal() => {
                warn!("Async request {} timed out", id);
                op.state = AsyncState::TimedOut;
                op.finished_at = Some(Utc::now());
                AsyncState::TimedOut
            }
            Some(op) => op.state.clone(),
            None => AsyncState::TimedOut,
        }
    }
}
