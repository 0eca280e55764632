use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::blueprint::{ClearanceBlueprint, Step};
use super::domain::{
    ActorRole, Application, ApplicationStatus, FacultyId, Rejection, ReviewAction, Stage,
    StudentType, SubjectId, TransitionEntry,
};

/// Approve or reject request issued by the actor holding the current stage's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub role: ActorRole,
    pub action: ReviewAction,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    /// Status the caller observed; a mismatch is reported as a conflict.
    pub expected_status: ApplicationStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl TransitionRequest {
    pub fn approve(role: ActorRole, observed: ApplicationStatus) -> Self {
        Self {
            role,
            action: ReviewAction::Approve,
            comment: None,
            actor_id: None,
            expected_status: observed,
            transaction_id: None,
        }
    }

    pub fn reject(
        role: ActorRole,
        observed: ApplicationStatus,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            comment: Some(comment.into()),
            action: ReviewAction::Reject,
            ..Self::approve(role, observed)
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }
}

/// Precondition that blocks an approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outstanding {
    Subject {
        subject_id: SubjectId,
        subject_name: String,
        faculty_id: FacultyId,
    },
    Stage {
        stage: Stage,
    },
}

impl fmt::Display for Outstanding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outstanding::Subject {
                subject_id,
                subject_name,
                faculty_id,
            } => write!(
                f,
                "subject {} ({}) awaiting faculty {}",
                subject_id, subject_name, faculty_id
            ),
            Outstanding::Stage { stage } => write!(f, "{} sign-off", stage.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidTransitionReason {
    Terminal,
    NotOnPath { student_type: StudentType },
}

impl fmt::Display for InvalidTransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidTransitionReason::Terminal => write!(f, "status is terminal"),
            InvalidTransitionReason::NotOnPath { student_type } => {
                write!(f, "status is not on the {} student path", student_type)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("role {actual} cannot act on the {stage} stage ({required} required)")]
    Unauthorized {
        stage: Stage,
        required: ActorRole,
        actual: ActorRole,
    },
    #[error("subject {subject_id} is assigned to faculty {assigned}, not {actual}")]
    NotAssignedReviewer {
        subject_id: SubjectId,
        assigned: FacultyId,
        actual: FacultyId,
    },
    #[error("{stage} stage cannot be approved; outstanding: {}", join_outstanding(.outstanding))]
    IncompleteVerification {
        stage: Stage,
        outstanding: Vec<Outstanding>,
    },
    #[error("application at {status} cannot transition: {reason}")]
    InvalidTransition {
        status: ApplicationStatus,
        reason: InvalidTransitionReason,
    },
    #[error("subject {0} is not part of the application")]
    UnknownSubject(SubjectId),
}

fn join_outstanding(outstanding: &[Outstanding]) -> String {
    outstanding
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of a committed approval or rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub stage: Stage,
    pub action: ReviewAction,
}

/// Applies approve/reject requests against the clearance blueprint.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    blueprint: ClearanceBlueprint,
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::new(ClearanceBlueprint::standard())
    }
}

impl TransitionEngine {
    pub fn new(blueprint: ClearanceBlueprint) -> Self {
        Self { blueprint }
    }

    pub fn blueprint(&self) -> &ClearanceBlueprint {
        &self.blueprint
    }

    /// Step awaiting approval, validated against terminal and off-path statuses.
    pub fn pending_step(&self, application: &Application) -> Result<Step, TransitionError> {
        if application.status.is_terminal() {
            return Err(TransitionError::InvalidTransition {
                status: application.status,
                reason: InvalidTransitionReason::Terminal,
            });
        }

        self.blueprint
            .next_step(application.student_type, application.status)
            .ok_or(TransitionError::InvalidTransition {
                status: application.status,
                reason: InvalidTransitionReason::NotOnPath {
                    student_type: application.student_type,
                },
            })
    }

    /// Validate and apply `request`. The application is untouched on error.
    pub fn apply(
        &self,
        application: &mut Application,
        request: &TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let step = self.pending_step(application)?;

        if request.role != step.role() {
            return Err(TransitionError::Unauthorized {
                stage: step.stage,
                required: step.role(),
                actual: request.role,
            });
        }

        let from = application.status;
        let to = match request.action {
            ReviewAction::Approve => {
                self.check_approval(application, &step)?;
                if step.sets_flag {
                    application.verifications.mark_verified(
                        step.stage,
                        request.actor_id.clone(),
                        request.comment.clone(),
                        now,
                    );
                }
                if step.stage == Stage::Payment {
                    if let Some(transaction_id) = &request.transaction_id {
                        application.transaction_id = Some(transaction_id.clone());
                    }
                }
                step.resting_status()
            }
            ReviewAction::Reject => {
                application
                    .verifications
                    .note_comment(step.stage, request.comment.clone());
                application.rejection = Some(Rejection {
                    stage: step.stage,
                    role: request.role,
                    actor: request.actor_id.clone(),
                    comment: request.comment.clone(),
                    rejected_at: now,
                });
                ApplicationStatus::Rejected
            }
        };

        application.status = to;
        application.updated_at = now;
        application.history.push(TransitionEntry {
            from,
            to,
            role: request.role,
            action: request.action,
            actor: request.actor_id.clone(),
            comment: request.comment.clone(),
            at: now,
        });

        Ok(TransitionOutcome {
            from,
            to,
            stage: step.stage,
            action: request.action,
        })
    }

    fn check_approval(&self, application: &Application, step: &Step) -> Result<(), TransitionError> {
        if step.requires_subjects() && !application.all_subjects_verified() {
            let outstanding = application
                .unverified_subjects()
                .map(|subject| Outstanding::Subject {
                    subject_id: subject.subject_id.clone(),
                    subject_name: subject.subject_name.clone(),
                    faculty_id: subject.faculty_id.clone(),
                })
                .collect();
            return Err(TransitionError::IncompleteVerification {
                stage: step.stage,
                outstanding,
            });
        }

        if step.resting_status() == ApplicationStatus::Completed {
            let required = self
                .blueprint
                .flagged_stages(application.student_type)
                .into_iter()
                .filter(|stage| !(step.sets_flag && *stage == step.stage));
            let outstanding: Vec<Outstanding> = application
                .verifications
                .outstanding(required)
                .into_iter()
                .map(|stage| Outstanding::Stage { stage })
                .collect();
            if !outstanding.is_empty() {
                return Err(TransitionError::IncompleteVerification {
                    stage: step.stage,
                    outstanding,
                });
            }
        }

        Ok(())
    }

    /// Record the assigned faculty member's sign-off for one subject.
    ///
    /// Returns `false` when the subject was already verified.
    pub fn verify_subject(
        &self,
        application: &mut Application,
        subject_id: &SubjectId,
        reviewer: &FacultyId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<bool, TransitionError> {
        if application.status.is_terminal() {
            return Err(TransitionError::InvalidTransition {
                status: application.status,
                reason: InvalidTransitionReason::Terminal,
            });
        }

        let subject = application
            .subjects
            .iter_mut()
            .find(|subject| &subject.subject_id == subject_id)
            .ok_or_else(|| TransitionError::UnknownSubject(subject_id.clone()))?;

        if &subject.faculty_id != reviewer {
            return Err(TransitionError::NotAssignedReviewer {
                subject_id: subject_id.clone(),
                assigned: subject.faculty_id.clone(),
                actual: reviewer.clone(),
            });
        }

        if subject.verified {
            return Ok(false);
        }

        subject.verified = true;
        subject.verified_at = Some(now);
        if comment.is_some() {
            subject.comment = comment;
        }
        application.updated_at = now;
        Ok(true)
    }
}
