use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    ActorRole, Application, ApplicationId, ApplicationStatus, ApplicationSubmission, FacultyId,
    ReviewAction, SubjectId,
};
use super::presentation::ApplicationStatusView;
use super::repository::{
    ApplicationRepository, ClearanceNotification, NotificationPublisher, Recipient,
    RepositoryError,
};
use super::transition::{TransitionEngine, TransitionError, TransitionOutcome, TransitionRequest};
use crate::config::ClearanceConfig;

/// Service composing the transition engine, repository and notification hooks.
pub struct ClearanceService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    engine: Arc<TransitionEngine>,
    config: ClearanceConfig,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
const APPLICATION_PREFIX: &str = "clr-";

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("{APPLICATION_PREFIX}{id:06}"))
}

/// Numeric part of a generated id; ids from elsewhere yield `None` and sort last.
fn application_sequence(id: &ApplicationId) -> Option<u64> {
    id.0.strip_prefix(APPLICATION_PREFIX)?.parse().ok()
}

impl<R, N> ClearanceService<R, N>
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>, config: ClearanceConfig) -> Self {
        Self::with_engine(TransitionEngine::default(), repository, notifications, config)
    }

    pub fn with_engine(
        engine: TransitionEngine,
        repository: Arc<R>,
        notifications: Arc<N>,
        config: ClearanceConfig,
    ) -> Self {
        Self {
            repository,
            notifications,
            engine: Arc::new(engine),
            config,
        }
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    /// Open a clearance cycle; the stored application starts at `pending`.
    pub fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<Application, ClearanceServiceError> {
        validate_submission(&submission)?;

        let application =
            Application::from_submission(next_application_id(), submission, Utc::now());
        let stored = self.repository.insert(application)?;

        info!(
            application_id = %stored.id,
            student_type = %stored.student_type,
            subjects = stored.subjects.len(),
            "clearance application submitted"
        );
        self.notify(
            &stored,
            "application_submitted",
            Recipient::Student(stored.student_id.clone()),
            BTreeMap::new(),
        );

        Ok(stored)
    }

    /// Approve or reject the stage the application is waiting on.
    pub fn advance(
        &self,
        application_id: &ApplicationId,
        request: TransitionRequest,
    ) -> Result<Application, ClearanceServiceError> {
        let mut application = self.load(application_id)?;

        // Terminal and off-path applications report the transition error, not a stale read.
        self.engine.pending_step(&application)?;
        if request.expected_status != application.status {
            return Err(ClearanceServiceError::Conflict {
                expected: request.expected_status,
                found: application.status,
            });
        }

        let outcome = self
            .engine
            .apply(&mut application, &request, Utc::now())
            .map_err(|error| {
                warn!(
                    application_id = %application_id,
                    role = %request.role,
                    action = request.action.as_str(),
                    %error,
                    "clearance transition refused"
                );
                error
            })?;

        self.commit(&mut application)?;

        info!(
            application_id = %application.id,
            from = %outcome.from,
            to = %outcome.to,
            stage = %outcome.stage,
            "clearance transition committed"
        );
        self.announce(&application, &outcome, &request);

        Ok(application)
    }

    /// Record the assigned faculty member's sign-off on one subject.
    pub fn verify_subject(
        &self,
        application_id: &ApplicationId,
        subject_id: &SubjectId,
        reviewer: &FacultyId,
        comment: Option<String>,
    ) -> Result<Application, ClearanceServiceError> {
        let mut application = self.load(application_id)?;

        let changed = self.engine.verify_subject(
            &mut application,
            subject_id,
            reviewer,
            comment,
            Utc::now(),
        )?;
        if !changed {
            return Ok(application);
        }

        self.commit(&mut application)?;

        info!(
            application_id = %application.id,
            subject_id = %subject_id,
            faculty_id = %reviewer,
            "subject verified"
        );
        let mut details = BTreeMap::new();
        details.insert("subject_id".to_string(), subject_id.0.clone());
        self.notify(
            &application,
            "subject_verified",
            Recipient::Student(application.student_id.clone()),
            details,
        );

        Ok(application)
    }

    /// Fetch an application for API responses.
    pub fn get(&self, application_id: &ApplicationId) -> Result<Application, ClearanceServiceError> {
        self.load(application_id)
    }

    pub fn status_view(&self, application: &Application) -> ApplicationStatusView {
        application.status_view(self.engine.blueprint())
    }

    /// Open applications whose next step belongs to `role`, oldest first.
    pub fn awaiting(
        &self,
        role: ActorRole,
        limit: usize,
    ) -> Result<Vec<Application>, ClearanceServiceError> {
        let blueprint = self.engine.blueprint();
        let mut queue: Vec<Application> = self
            .repository
            .open()?
            .into_iter()
            .filter(|application| {
                blueprint
                    .next_step(application.student_type, application.status)
                    .map(|step| step.role() == role)
                    .unwrap_or(false)
            })
            .collect();
        queue.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| sequence_order(&a.id, &b.id))
                .then_with(|| a.id.cmp(&b.id))
        });
        queue.truncate(limit);
        Ok(queue)
    }

    fn load(&self, application_id: &ApplicationId) -> Result<Application, ClearanceServiceError> {
        self.repository
            .fetch(application_id)?
            .ok_or_else(|| ClearanceServiceError::NotFound(application_id.clone()))
    }

    fn commit(&self, application: &mut Application) -> Result<(), ClearanceServiceError> {
        let observed = application.revision;
        application.revision = observed + 1;
        self.repository
            .compare_and_swap(observed, application.clone())
            .map_err(|error| match error {
                RepositoryError::Conflict { .. } => {
                    ClearanceServiceError::ConcurrentUpdate(application.id.clone())
                }
                other => ClearanceServiceError::Repository(other),
            })
    }

    fn announce(
        &self,
        application: &Application,
        outcome: &TransitionOutcome,
        request: &TransitionRequest,
    ) {
        let mut details = BTreeMap::new();
        details.insert("from".to_string(), outcome.from.as_str().to_string());
        details.insert("stage".to_string(), outcome.stage.key().to_string());
        if let Some(comment) = &request.comment {
            details.insert("comment".to_string(), comment.clone());
        }

        let template = match (outcome.action, outcome.to) {
            (ReviewAction::Reject, _) => "application_rejected",
            (ReviewAction::Approve, ApplicationStatus::Completed) => "application_completed",
            (ReviewAction::Approve, _) => "stage_approved",
        };
        self.notify(
            application,
            template,
            Recipient::Student(application.student_id.clone()),
            details.clone(),
        );

        if outcome.action == ReviewAction::Reject && self.config.notify_upstream_on_rejection {
            let mut notified = HashSet::new();
            for stage in application.verifications.verified_stages() {
                let role = stage.role();
                if notified.insert(role) {
                    self.notify(application, template, Recipient::Role(role), details.clone());
                }
            }
        }
    }

    /// Delivery happens after commit, so failures are logged rather than surfaced.
    fn notify(
        &self,
        application: &Application,
        template: &str,
        recipient: Recipient,
        details: BTreeMap<String, String>,
    ) {
        let notification = ClearanceNotification {
            template: template.to_string(),
            recipient,
            application_id: application.id.clone(),
            status: application.status,
            details,
        };
        if let Err(error) = self.notifications.publish(notification) {
            warn!(application_id = %application.id, %error, template, "notification dropped");
        }
    }
}

fn sequence_order(a: &ApplicationId, b: &ApplicationId) -> std::cmp::Ordering {
    match (application_sequence(a), application_sequence(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

fn validate_submission(submission: &ApplicationSubmission) -> Result<(), ClearanceServiceError> {
    if submission.student_id.0.trim().is_empty() {
        return Err(ClearanceServiceError::InvalidSubmission(
            "student id is required".to_string(),
        ));
    }
    if submission.department.trim().is_empty() {
        return Err(ClearanceServiceError::InvalidSubmission(
            "department is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for subject in &submission.subjects {
        if !seen.insert(&subject.subject_id) {
            return Err(ClearanceServiceError::InvalidSubmission(format!(
                "subject {} selected more than once",
                subject.subject_id
            )));
        }
    }

    Ok(())
}

/// Error raised by the clearance service.
#[derive(Debug, thiserror::Error)]
pub enum ClearanceServiceError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("application status changed concurrently (expected {expected}, found {found})")]
    Conflict {
        expected: ApplicationStatus,
        found: ApplicationStatus,
    },
    #[error("application {0} was modified by another reviewer; reload and retry")]
    ConcurrentUpdate(ApplicationId),
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
