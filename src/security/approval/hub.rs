use super::{ApprovalBroker, ApprovalDecision, CheckpointRequest};
use crate::error::ApprovalError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

/// Closed checkpoints remembered for status queries.
const DECIDED_HISTORY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    pub task_id: String,
    pub step_id: String,
    pub status: ApprovalStatus,
    pub comment: String,
}

/// `(task_id, step_id)`
type SlotKey = (String, String);

struct Slot {
    status: watch::Sender<ApprovalStatus>,
    comment: String,
}

impl Slot {
    fn new() -> Self {
        let (status, _) = watch::channel(ApprovalStatus::Pending);
        Self {
            status,
            comment: String::new(),
        }
    }

    fn record(&self, (task_id, step_id): &SlotKey) -> ApprovalRecord {
        ApprovalRecord {
            task_id: task_id.clone(),
            step_id: step_id.clone(),
            status: *self.status.borrow(),
            comment: self.comment.clone(),
        }
    }
}

#[derive(Default)]
struct HubState {
    open: HashMap<SlotKey, Slot>,
    decided: VecDeque<ApprovalRecord>,
}

impl HubState {
    /// Find the open checkpoint for `step_id`, scoped to `task_id` when given.
    /// Without a task id the step id must name exactly one open checkpoint.
    fn find(&self, task_id: Option<&str>, step_id: &str) -> Result<SlotKey, ApprovalError> {
        if let Some(task_id) = task_id {
            let key = (task_id.to_string(), step_id.to_string());
            return if self.open.contains_key(&key) {
                Ok(key)
            } else {
                Err(ApprovalError::NotFound(step_id.to_string()))
            };
        }

        let mut matches: Vec<&SlotKey> = self.open.keys().filter(|(_, s)| s == step_id).collect();
        match matches.len() {
            0 => Err(ApprovalError::NotFound(step_id.to_string())),
            1 => Ok(matches[0].clone()),
            _ => {
                matches.sort();
                Err(ApprovalError::Ambiguous {
                    step_id: step_id.to_string(),
                    task_ids: matches.into_iter().map(|(t, _)| t.clone()).collect(),
                })
            }
        }
    }
}

/// Checkpoint decisions for in-flight executions, keyed by task and step.
///
/// A slot exists only while an executor waits on it: `open` creates it,
/// `POST /api/approve/{stepId}` resolves it and `close` retires it into a
/// bounded history that keeps the decision queryable.
#[derive(Default)]
pub struct ApprovalHub {
    state: Mutex<HubState>,
}

impl ApprovalHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn open(&self, task_id: &str, step_id: &str) {
        self.lock()
            .open
            .insert((task_id.to_string(), step_id.to_string()), Slot::new());
        tracing::debug!(task = task_id, step = step_id, "checkpoint opened");
    }

    /// Retire a checkpoint once its executor stops waiting.
    pub fn close(&self, task_id: &str, step_id: &str) {
        let mut state = self.lock();
        let key = (task_id.to_string(), step_id.to_string());
        let Some(slot) = state.open.remove(&key) else {
            return;
        };
        let record = slot.record(&key);
        if record.status != ApprovalStatus::Pending {
            if state.decided.len() == DECIDED_HISTORY {
                state.decided.pop_front();
            }
            state.decided.push_back(record);
        }
    }

    /// Resolve an open checkpoint. Unknown checkpoints are refused, never created.
    pub fn resolve(
        &self,
        task_id: Option<&str>,
        step_id: &str,
        approved: bool,
        comment: &str,
    ) -> Result<ApprovalRecord, ApprovalError> {
        let status = if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        };
        let mut state = self.lock();
        let key = state.find(task_id, step_id)?;
        let Some(slot) = state.open.get_mut(&key) else {
            return Err(ApprovalError::NotFound(step_id.to_string()));
        };
        slot.comment = comment.to_string();
        slot.status.send_replace(status);
        tracing::info!(task = %key.0, step = step_id, %status, "checkpoint resolved");
        Ok(slot.record(&key))
    }

    /// Open checkpoints first, then recently closed ones.
    pub fn record(&self, task_id: Option<&str>, step_id: &str) -> Result<ApprovalRecord, ApprovalError> {
        let state = self.lock();
        match state.find(task_id, step_id) {
            Ok(key) => Ok(state.open[&key].record(&key)),
            Err(ApprovalError::NotFound(_)) => state
                .decided
                .iter()
                .rev()
                .find(|r| r.step_id == step_id && task_id.is_none_or(|t| r.task_id == t))
                .cloned()
                .ok_or_else(|| ApprovalError::NotFound(step_id.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Unknown checkpoints report pending.
    pub fn status(&self, task_id: Option<&str>, step_id: &str) -> Result<ApprovalStatus, ApprovalError> {
        match self.record(task_id, step_id) {
            Ok(record) => Ok(record.status),
            Err(ApprovalError::NotFound(_)) => Ok(ApprovalStatus::Pending),
            Err(e) => Err(e),
        }
    }

    /// Number of checkpoints currently awaiting a decision or a close.
    pub fn open_count(&self) -> usize {
        self.lock().open.len()
    }

    /// Wait until the checkpoint is approved or rejected and return the
    /// decision with its comment. A checkpoint that is not open counts as rejected.
    pub async fn wait(&self, task_id: &str, step_id: &str) -> (ApprovalStatus, String) {
        let key = (task_id.to_string(), step_id.to_string());
        let Some(mut rx) = self.lock().open.get(&key).map(|slot| slot.status.subscribe()) else {
            return (ApprovalStatus::Rejected, String::new());
        };
        let status = match rx.wait_for(|status| *status != ApprovalStatus::Pending).await {
            Ok(status) => *status,
            // The sender lives in the map; a closed channel means the slot was retired.
            Err(_) => ApprovalStatus::Rejected,
        };
        let comment = self
            .lock()
            .open
            .get(&key)
            .map(|slot| slot.comment.clone())
            .unwrap_or_default();
        (status, comment)
    }
}

impl ApprovalBroker for ApprovalHub {
    fn checkpoint_opened(&self, request: &CheckpointRequest) {
        self.open(&request.task_id, &request.step_id);
    }

    fn checkpoint_closed(&self, request: &CheckpointRequest) {
        self.close(&request.task_id, &request.step_id);
    }

    fn await_decision<'a>(
        &'a self,
        request: &'a CheckpointRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ApprovalDecision>> + Send + 'a>> {
        Box::pin(async move {
            let decision = match self.wait(&request.task_id, &request.step_id).await {
                (ApprovalStatus::Approved, _) => ApprovalDecision::Approved,
                (_, comment) if comment.trim().is_empty() => {
                    ApprovalDecision::rejected("rejected by reviewer")
                }
                (_, comment) => ApprovalDecision::rejected(comment),
            };
            Ok(decision)
        })
    }
}
