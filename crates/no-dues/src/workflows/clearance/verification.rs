use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::Stage;

/// Sign-off state for a single stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

/// Per-stage verification records of an application.
///
/// The ledger is a projection of the transitions an application has passed
/// through. Mutation is restricted to the transition engine so a flag can never
/// be raised without the matching status change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationLedger {
    records: BTreeMap<Stage, VerificationRecord>,
}

impl VerificationLedger {
    pub fn is_verified(&self, stage: Stage) -> bool {
        self.records
            .get(&stage)
            .map(|record| record.verified)
            .unwrap_or(false)
    }

    pub fn record(&self, stage: Stage) -> Option<&VerificationRecord> {
        self.records.get(&stage)
    }

    pub fn verified_stages(&self) -> Vec<Stage> {
        self.records
            .iter()
            .filter(|(_, record)| record.verified)
            .map(|(stage, _)| *stage)
            .collect()
    }

    /// Stages from `required` that still lack a sign-off, in the given order.
    pub fn outstanding<I>(&self, required: I) -> Vec<Stage>
    where
        I: IntoIterator<Item = Stage>,
    {
        required
            .into_iter()
            .filter(|stage| stage.has_flag() && !self.is_verified(*stage))
            .collect()
    }

    /// Flat `<stage>_verified` / `<stage>_comment` row shape.
    pub fn flags(&self) -> VerificationFlags {
        let comment = |stage| self.record(stage).and_then(|record| record.comment.clone());
        VerificationFlags {
            library_verified: self.is_verified(Stage::Library),
            library_comment: comment(Stage::Library),
            hostel_verified: self.is_verified(Stage::Hostel),
            hostel_comment: comment(Stage::Hostel),
            college_office_verified: self.is_verified(Stage::CollegeOffice),
            college_office_comment: comment(Stage::CollegeOffice),
            hod_verified: self.is_verified(Stage::Hod),
            hod_comment: comment(Stage::Hod),
            counsellor_verified: self.is_verified(Stage::Counsellor),
            counsellor_comment: comment(Stage::Counsellor),
            class_advisor_verified: self.is_verified(Stage::ClassAdvisor),
            class_advisor_comment: comment(Stage::ClassAdvisor),
            payment_verified: self.is_verified(Stage::Payment),
            payment_comment: comment(Stage::Payment),
            lab_verified: self.is_verified(Stage::Lab),
            lab_comment: comment(Stage::Lab),
        }
    }

    /// Flags are monotonic: a second sign-off keeps the original actor and time.
    pub(crate) fn mark_verified(
        &mut self,
        stage: Stage,
        actor: Option<String>,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) {
        if !stage.has_flag() {
            return;
        }

        let record = self.records.entry(stage).or_default();
        if record.verified {
            return;
        }
        record.verified = true;
        record.verified_by = actor;
        record.verified_at = Some(at);
        if comment.is_some() {
            record.comment = comment;
        }
    }

    pub(crate) fn note_comment(&mut self, stage: Stage, comment: Option<String>) {
        if !stage.has_flag() || comment.is_none() {
            return;
        }
        self.records.entry(stage).or_default().comment = comment;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFlags {
    pub library_verified: bool,
    pub library_comment: Option<String>,
    pub hostel_verified: bool,
    pub hostel_comment: Option<String>,
    pub college_office_verified: bool,
    pub college_office_comment: Option<String>,
    pub hod_verified: bool,
    pub hod_comment: Option<String>,
    pub counsellor_verified: bool,
    pub counsellor_comment: Option<String>,
    pub class_advisor_verified: bool,
    pub class_advisor_comment: Option<String>,
    pub payment_verified: bool,
    pub payment_comment: Option<String>,
    pub lab_verified: bool,
    pub lab_comment: Option<String>,
}
