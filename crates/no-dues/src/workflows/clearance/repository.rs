use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{ActorRole, Application, ApplicationId, ApplicationStatus, StudentId};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Writes after creation go through `compare_and_swap`, which must only commit
/// when the stored row still carries `expected_revision`. Every status change
/// bumps the revision, so this subsumes comparing the status itself.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn compare_and_swap(
        &self,
        expected_revision: u64,
        application: Application,
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    /// Applications that have not reached a terminal status.
    fn open(&self) -> Result<Vec<Application>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("row changed concurrently (expected revision {expected}, found {found})")]
    Conflict { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, push, in-app inbox adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: ClearanceNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Student(StudentId),
    Role(ActorRole),
}

/// Message handed to the notification collaborator after a committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceNotification {
    pub template: String,
    pub recipient: Recipient,
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
