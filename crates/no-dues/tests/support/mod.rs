#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use no_dues::config::ClearanceConfig;
use no_dues::workflows::clearance::{
    Application, ApplicationId, ApplicationRepository, ApplicationSubmission, ClearanceNotification,
    ClearanceService, FacultyId, NotificationError, NotificationPublisher, RepositoryError,
    StudentId, StudentType, SubjectId, SubjectSelection, TransitionRequest,
};

#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<HashMap<ApplicationId, Application>>,
}

impl ApplicationRepository for InMemoryStore {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        if rows.contains_key(&application.id) {
            return Err(RepositoryError::Duplicate);
        }
        rows.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn compare_and_swap(
        &self,
        expected_revision: u64,
        application: Application,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        let stored = rows
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
        Ok(self.rows.lock().expect("store mutex poisoned").get(id).cloned())
    }

    fn open(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|application| !application.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<ClearanceNotification>>,
}

impl Outbox {
    pub fn sent(&self) -> Vec<ClearanceNotification> {
        self.sent.lock().expect("outbox mutex poisoned").clone()
    }
}

impl NotificationPublisher for Outbox {
    fn publish(&self, notification: ClearanceNotification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("outbox mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub type Service = ClearanceService<InMemoryStore, Outbox>;

pub fn service() -> (Service, Arc<Outbox>) {
    let outbox = Arc::new(Outbox::default());
    let service = ClearanceService::new(
        Arc::new(InMemoryStore::default()),
        outbox.clone(),
        ClearanceConfig::default(),
    );
    (service, outbox)
}

pub fn submission(student_type: StudentType, subjects: usize) -> ApplicationSubmission {
    ApplicationSubmission {
        student_id: StudentId("stu-1187".to_string()),
        department: "Electrical Engineering".to_string(),
        semester: 8,
        section: "A".to_string(),
        student_type,
        subjects: (0..subjects)
            .map(|index| SubjectSelection {
                subject_id: SubjectId(format!("ee-{index}")),
                subject_name: format!("Elective {index}"),
                subject_code: format!("EE40{index}"),
                faculty_id: FacultyId(format!("prof-{index}")),
                faculty_name: format!("Professor {index}"),
            })
            .collect(),
    }
}

/// Verify every open subject, then approve the stage the application waits on.
pub fn approve_next(service: &Service, application: &Application) -> Application {
    let step = service
        .engine()
        .pending_step(application)
        .expect("application has a pending step");
    if step.requires_subjects() {
        for subject in application.unverified_subjects() {
            service
                .verify_subject(&application.id, &subject.subject_id, &subject.faculty_id, None)
                .expect("assigned faculty verifies");
        }
    }
    service
        .advance(
            &application.id,
            TransitionRequest::approve(step.role(), application.status),
        )
        .expect("approval succeeds")
}
