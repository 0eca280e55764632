use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::config::ClearanceConfig;
use crate::workflows::clearance::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSubmission, FacultyId, StudentId,
    StudentType, SubjectId, SubjectSelection,
};
use crate::workflows::clearance::repository::{
    ApplicationRepository, ClearanceNotification, NotificationError, NotificationPublisher,
    RepositoryError,
};
use crate::workflows::clearance::transition::TransitionRequest;
use crate::workflows::clearance::verification::VerificationLedger;
use crate::workflows::clearance::{clearance_router, ClearanceService};

pub(super) fn subject(index: usize) -> SubjectSelection {
    SubjectSelection {
        subject_id: SubjectId(format!("sub-{index}")),
        subject_name: format!("Subject {index}"),
        subject_code: format!("CS30{index}"),
        faculty_id: FacultyId(format!("fac-{index}")),
        faculty_name: format!("Faculty {index}"),
    }
}

pub(super) fn submission(student_type: StudentType, subjects: usize) -> ApplicationSubmission {
    ApplicationSubmission {
        student_id: StudentId("stu-2041".to_string()),
        department: "Computer Science".to_string(),
        semester: 6,
        section: "B".to_string(),
        student_type,
        subjects: (1..=subjects).map(subject).collect(),
    }
}

/// Application built directly at `status`, bypassing the transition engine.
pub(super) fn stored_application(
    id: &str,
    student_type: StudentType,
    status: ApplicationStatus,
    subjects: usize,
) -> Application {
    let at = Utc
        .with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    Application {
        id: ApplicationId(id.to_string()),
        student_id: StudentId("stu-2041".to_string()),
        department: "Computer Science".to_string(),
        semester: 6,
        section: "B".to_string(),
        student_type,
        status,
        verifications: VerificationLedger::default(),
        subjects: (1..=subjects)
            .map(|index| subject(index).into_subject())
            .collect(),
        transaction_id: None,
        rejection: None,
        history: Vec::new(),
        revision: 0,
        created_at: at,
        updated_at: at,
    }
}

pub(super) fn build_service() -> (
    ClearanceService<MemoryRepository, MemoryNotifications>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = ClearanceService::new(
        repository.clone(),
        notifications.clone(),
        ClearanceConfig::default(),
    );
    (service, repository, notifications)
}

/// Approve whatever stage the application is waiting on, signing off every
/// subject first when the faculty gate applies.
pub(super) fn approve_next<R, N>(
    service: &ClearanceService<R, N>,
    application: &Application,
) -> Application
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let step = service
        .engine()
        .pending_step(application)
        .expect("application has a pending step");

    if step.requires_subjects() {
        for subject in application.unverified_subjects() {
            service
                .verify_subject(
                    &application.id,
                    &subject.subject_id,
                    &subject.faculty_id,
                    None,
                )
                .expect("assigned faculty verifies");
        }
    }

    service
        .advance(&application.id, TransitionRequest::approve(step.role(), application.status))
        .expect("approval succeeds")
}

pub(super) fn drive_until<R, N>(
    service: &ClearanceService<R, N>,
    mut application: Application,
    status: ApplicationStatus,
) -> Application
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    while application.status != status {
        assert!(
            !application.status.is_terminal(),
            "reached {} before {}",
            application.status,
            status
        );
        application = approve_next(service, &application);
    }
    application
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl MemoryRepository {
    pub(super) fn seed(&self, application: Application) {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(application.id.clone(), application);
    }
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Duplicate);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn compare_and_swap(
        &self,
        expected_revision: u64,
        application: Application,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::Conflict {
                expected: expected_revision,
                found: stored.revision,
            });
        }
        *stored = application;
        Ok(())
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn open(&self) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| !application.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<ClearanceNotification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<ClearanceNotification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }

    pub(super) fn templates(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.template)
            .collect()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: ClearanceNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifications;

impl NotificationPublisher for OfflineNotifications {
    fn publish(&self, _notification: ClearanceNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay down".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn compare_and_swap(
        &self,
        _expected_revision: u64,
        _application: Application,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn open(&self) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(
    service: ClearanceService<MemoryRepository, MemoryNotifications>,
) -> axum::Router {
    clearance_router(Arc::new(service))
}
