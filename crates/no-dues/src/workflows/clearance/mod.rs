//! Clearance status engine for student no-dues applications.
//!
//! An application walks a fixed sequence of departmental sign-offs. The
//! [`ClearanceBlueprint`] derives that sequence from the student type, the
//! [`TransitionEngine`] applies approve/reject requests against it, and the
//! [`VerificationLedger`] records which stages have signed off. The service and
//! router wrap the engine with compare-and-swap persistence and notifications.

pub mod blueprint;
pub mod domain;
pub mod presentation;
pub mod repository;
pub mod router;
pub mod service;
pub mod transition;
pub mod verification;

#[cfg(test)]
mod tests;

pub use blueprint::{ClearanceBlueprint, Step};
pub use domain::{
    ActorRole, Application, ApplicationId, ApplicationStatus, ApplicationSubject,
    ApplicationSubmission, FacultyId, Rejection, ReviewAction, Stage, StudentId, StudentType,
    SubjectId, SubjectSelection, TransitionEntry, UnknownRole, UnknownStatus,
};
pub use presentation::{render_status, ApplicationStatusView, BadgeCategory, StatusBadge};
pub use repository::{
    ApplicationRepository, ClearanceNotification, NotificationError, NotificationPublisher,
    Recipient, RepositoryError,
};
pub use router::clearance_router;
pub use service::{ClearanceService, ClearanceServiceError};
pub use transition::{
    InvalidTransitionReason, Outstanding, TransitionEngine, TransitionError, TransitionOutcome,
    TransitionRequest,
};
pub use verification::{VerificationFlags, VerificationLedger, VerificationRecord};
