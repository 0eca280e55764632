use serde::{Deserialize, Serialize};

use super::blueprint::ClearanceBlueprint;
use super::domain::{
    ActorRole, Application, ApplicationId, ApplicationStatus, Stage, StudentId, StudentType,
    SubjectId,
};
use super::verification::VerificationFlags;

/// Visual treatment of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Pending,
    Success,
    Rejected,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBadge {
    pub label: String,
    pub category: BadgeCategory,
}

impl ApplicationStatus {
    pub const fn category(self) -> BadgeCategory {
        match self {
            Self::Pending
            | Self::HostelVerificationPending
            | Self::CollegeOfficeVerificationPending
            | Self::PaymentPending => BadgeCategory::Pending,
            Self::LibraryVerified
            | Self::HostelVerified
            | Self::CollegeOfficeVerified
            | Self::FacultyVerified
            | Self::CounsellorVerified
            | Self::ClassAdvisorVerified
            | Self::HodVerified
            | Self::LabVerified
            | Self::Completed => BadgeCategory::Success,
            Self::Rejected => BadgeCategory::Rejected,
        }
    }

    pub fn badge(self) -> StatusBadge {
        StatusBadge {
            label: self.label().to_string(),
            category: self.category(),
        }
    }
}

/// Map a persisted status string to its badge.
///
/// Total over every input: unrecognized values render as `unknown` with the raw
/// value as label, or `Unknown` when the value is blank.
pub fn render_status(raw: &str) -> StatusBadge {
    match raw.parse::<ApplicationStatus>() {
        Ok(status) => status.badge(),
        Err(_) => {
            let label = if raw.trim().is_empty() {
                "Unknown".to_string()
            } else {
                raw.to_string()
            };
            StatusBadge {
                label,
                category: BadgeCategory::Unknown,
            }
        }
    }
}

/// Sanitized representation of an application's progress for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub student_id: StudentId,
    pub student_type: StudentType,
    pub status: ApplicationStatus,
    pub badge: StatusBadge,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_role: Option<ActorRole>,
    pub subjects_outstanding: Vec<SubjectId>,
    pub verifications: VerificationFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl Application {
    pub fn status_view(&self, blueprint: &ClearanceBlueprint) -> ApplicationStatusView {
        let awaiting = blueprint.next_step(self.student_type, self.status);
        ApplicationStatusView {
            application_id: self.id.clone(),
            student_id: self.student_id.clone(),
            student_type: self.student_type,
            status: self.status,
            badge: self.status.badge(),
            awaiting_stage: awaiting.map(|step| step.stage),
            awaiting_role: awaiting.map(|step| step.role()),
            subjects_outstanding: self
                .unverified_subjects()
                .map(|subject| subject.subject_id.clone())
                .collect(),
            verifications: self.verifications.flags(),
            transaction_id: self.transaction_id.clone(),
        }
    }
}
