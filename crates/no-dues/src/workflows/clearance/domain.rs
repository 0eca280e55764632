use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::verification::VerificationLedger;

/// Identifier wrapper for clearance applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub String);

/// Identity of the faculty member assigned to review a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FacultyId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for FacultyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Residency of the student; hostel residents pass through the hostel stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentType {
    Local,
    Hostel,
}

impl StudentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Hostel => "hostel",
        }
    }
}

impl fmt::Display for StudentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Departmental checkpoint that must sign off before the clearance completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Library,
    Hostel,
    CollegeOffice,
    Faculty,
    Counsellor,
    ClassAdvisor,
    Hod,
    Payment,
    Lab,
}

impl Stage {
    pub const fn key(self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Hostel => "hostel",
            Self::CollegeOffice => "college_office",
            Self::Faculty => "faculty",
            Self::Counsellor => "counsellor",
            Self::ClassAdvisor => "class_advisor",
            Self::Hod => "hod",
            Self::Payment => "payment",
            Self::Lab => "lab",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Library => "Library",
            Self::Hostel => "Hostel",
            Self::CollegeOffice => "College Office",
            Self::Faculty => "Faculty",
            Self::Counsellor => "Counsellor",
            Self::ClassAdvisor => "Class Advisor",
            Self::Hod => "HOD",
            Self::Payment => "Payment",
            Self::Lab => "Lab",
        }
    }

    /// Role holding approval and rejection authority for this stage.
    pub const fn role(self) -> ActorRole {
        match self {
            Self::Library => ActorRole::Library,
            Self::Hostel => ActorRole::Hostel,
            Self::CollegeOffice => ActorRole::CollegeOffice,
            Self::Faculty => ActorRole::Faculty,
            Self::Counsellor => ActorRole::Counsellor,
            Self::ClassAdvisor => ActorRole::ClassAdvisor,
            Self::Hod => ActorRole::Hod,
            Self::Payment => ActorRole::Payment,
            Self::Lab => ActorRole::Lab,
        }
    }

    /// Faculty sign-off is tracked per subject rather than with a stage flag.
    pub const fn has_flag(self) -> bool {
        !matches!(self, Self::Faculty)
    }

    pub const fn applies_to(self, student_type: StudentType) -> bool {
        match self {
            Self::Hostel => matches!(student_type, StudentType::Hostel),
            _ => true,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Role supplied by the identity provider for the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Student,
    Library,
    Hostel,
    CollegeOffice,
    Faculty,
    Counsellor,
    ClassAdvisor,
    Hod,
    Payment,
    Lab,
    Admin,
}

impl ActorRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Library => "library",
            Self::Hostel => "hostel",
            Self::CollegeOffice => "college_office",
            Self::Faculty => "faculty",
            Self::Counsellor => "counsellor",
            Self::ClassAdvisor => "class_advisor",
            Self::Hod => "hod",
            Self::Payment => "payment",
            Self::Lab => "lab",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for ActorRole {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let role = match value {
            "student" => Self::Student,
            "library" => Self::Library,
            "hostel" => Self::Hostel,
            "college_office" => Self::CollegeOffice,
            "faculty" => Self::Faculty,
            "counsellor" => Self::Counsellor,
            "class_advisor" => Self::ClassAdvisor,
            "hod" => Self::Hod,
            "payment" => Self::Payment,
            "lab" => Self::Lab,
            "admin" => Self::Admin,
            other => return Err(UnknownRole(other.to_string())),
        };
        Ok(role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// Persisted status of a clearance application.
///
/// The snake_case strings are the storage vocabulary; any producer writing the
/// application store must use exactly these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    LibraryVerified,
    HostelVerificationPending,
    HostelVerified,
    CollegeOfficeVerificationPending,
    CollegeOfficeVerified,
    FacultyVerified,
    CounsellorVerified,
    ClassAdvisorVerified,
    HodVerified,
    PaymentPending,
    LabVerified,
    Completed,
    Rejected,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 14] {
        [
            Self::Pending,
            Self::LibraryVerified,
            Self::HostelVerificationPending,
            Self::HostelVerified,
            Self::CollegeOfficeVerificationPending,
            Self::CollegeOfficeVerified,
            Self::FacultyVerified,
            Self::CounsellorVerified,
            Self::ClassAdvisorVerified,
            Self::HodVerified,
            Self::PaymentPending,
            Self::LabVerified,
            Self::Completed,
            Self::Rejected,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::LibraryVerified => "library_verified",
            Self::HostelVerificationPending => "hostel_verification_pending",
            Self::HostelVerified => "hostel_verified",
            Self::CollegeOfficeVerificationPending => "college_office_verification_pending",
            Self::CollegeOfficeVerified => "college_office_verified",
            Self::FacultyVerified => "faculty_verified",
            Self::CounsellorVerified => "counsellor_verified",
            Self::ClassAdvisorVerified => "class_advisor_verified",
            Self::HodVerified => "hod_verified",
            Self::PaymentPending => "payment_pending",
            Self::LabVerified => "lab_verified",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::LibraryVerified => "Library Verified",
            Self::HostelVerificationPending => "Hostel Verification Pending",
            Self::HostelVerified => "Hostel Verified",
            Self::CollegeOfficeVerificationPending => "College Office Verification Pending",
            Self::CollegeOfficeVerified => "College Office Verified",
            Self::FacultyVerified => "Faculty Verified",
            Self::CounsellorVerified => "Counsellor Verified",
            Self::ClassAdvisorVerified => "Class Advisor Verified",
            Self::HodVerified => "HOD Verified",
            Self::PaymentPending => "Payment Pending",
            Self::LabVerified => "Lab Verified",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Position along the clearance sequence; `rejected` sorts last.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::LibraryVerified => 1,
            Self::HostelVerificationPending => 2,
            Self::HostelVerified => 3,
            Self::CollegeOfficeVerificationPending => 4,
            Self::CollegeOfficeVerified => 5,
            Self::FacultyVerified => 6,
            Self::CounsellorVerified => 7,
            Self::ClassAdvisorVerified => 8,
            Self::HodVerified => 9,
            Self::PaymentPending => 10,
            Self::LabVerified => 11,
            Self::Completed => 12,
            Self::Rejected => 13,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized application status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Subject picked by the student at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSelection {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub faculty_id: FacultyId,
    pub faculty_name: String,
}

impl SubjectSelection {
    pub(crate) fn into_subject(self) -> ApplicationSubject {
        ApplicationSubject {
            subject_id: self.subject_id,
            subject_name: self.subject_name,
            subject_code: self.subject_code,
            faculty_id: self.faculty_id,
            faculty_name: self.faculty_name,
            verified: false,
            comment: None,
            verified_at: None,
        }
    }
}

/// Faculty sign-off for one subject of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubject {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub faculty_id: FacultyId,
    pub faculty_name: String,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

/// Payload a student submits to open a clearance cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub student_id: StudentId,
    pub department: String,
    pub semester: u8,
    #[serde(default)]
    pub section: String,
    pub student_type: StudentType,
    #[serde(default)]
    pub subjects: Vec<SubjectSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub stage: Stage,
    pub role: ActorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub rejected_at: DateTime<Utc>,
}

/// One committed status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub role: ActorRole,
    pub action: ReviewAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub at: DateTime<Utc>,
}

/// One clearance request for a student, semester and department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student_id: StudentId,
    pub department: String,
    pub semester: u8,
    pub section: String,
    pub student_type: StudentType,
    pub status: ApplicationStatus,
    pub verifications: VerificationLedger,
    pub subjects: Vec<ApplicationSubject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    #[serde(default)]
    pub history: Vec<TransitionEntry>,
    /// Incremented on every committed write; the compare-and-swap key.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub(crate) fn from_submission(
        id: ApplicationId,
        submission: ApplicationSubmission,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id: submission.student_id,
            department: submission.department,
            semester: submission.semester,
            section: submission.section,
            student_type: submission.student_type,
            status: ApplicationStatus::Pending,
            verifications: VerificationLedger::default(),
            subjects: submission
                .subjects
                .into_iter()
                .map(SubjectSelection::into_subject)
                .collect(),
            transaction_id: None,
            rejection: None,
            history: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn unverified_subjects(&self) -> impl Iterator<Item = &ApplicationSubject> {
        self.subjects.iter().filter(|subject| !subject.verified)
    }

    /// Vacuously true when the application carries no subjects.
    pub fn all_subjects_verified(&self) -> bool {
        self.subjects.iter().all(|subject| subject.verified)
    }

    /// Every status the application has rested in, starting with `pending`.
    pub fn visited_statuses(&self) -> Vec<ApplicationStatus> {
        let mut visited = vec![ApplicationStatus::Pending];
        visited.extend(self.history.iter().map(|entry| entry.to));
        visited
    }
}
