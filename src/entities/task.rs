//! Task data handed to the ledger by the task component. The ledger never
//! stores these; it only reads wage, customer and participant statuses.

use serde::{Deserialize, Serialize};
use strum::Display;
use validator::Validate;

#[derive(Display, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApplicantStatus {
    Applied,
    Accepted,
    Rejected,
    Withdrawn,
}

#[derive(Display, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkerStatus {
    InProgress,
    Submitted,
    Revising,
    Resubmitted,
    Completed,
    Dismissed,
}

impl WorkerStatus {
    /// Work was handed in at least once.
    pub fn has_submitted(&self) -> bool {
        matches!(
            self,
            WorkerStatus::Submitted | WorkerStatus::Revising | WorkerStatus::Resubmitted
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskApplicant {
    pub user_id: String,
    pub status: ApplicantStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HiredWorker {
    pub worker_id: String,
    pub status: WorkerStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct TaskFunding {
    #[validate(length(min = 1, message = "task id is required"))]
    pub task_id: String,
    #[validate(length(min = 1, message = "customer id is required"))]
    pub customer_id: String,
    #[validate(range(min = 1, message = "wage must be positive"))]
    pub wage: i64,
    #[serde(default)]
    pub applicants: Vec<TaskApplicant>,
    #[serde(default)]
    pub workers: Vec<HiredWorker>,
}

impl TaskFunding {
    pub fn accepted_applicants(&self) -> usize {
        self.applicants
            .iter()
            .filter(|a| a.status == ApplicantStatus::Accepted)
            .count()
    }
}
