use super::domain::{ActorRole, ApplicationStatus, Stage, StudentType};

/// One approval along the clearance path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub target: ApplicationStatus,
    pub stage: Stage,
    /// Approval raises the stage's verification flag.
    pub sets_flag: bool,
    /// Approval completes the clearance instead of resting at `target`.
    pub finalizes: bool,
}

impl Step {
    pub const fn role(&self) -> ActorRole {
        self.stage.role()
    }

    /// Status the application rests in once the step is approved.
    pub const fn resting_status(&self) -> ApplicationStatus {
        if self.finalizes {
            ApplicationStatus::Completed
        } else {
            self.target
        }
    }

    /// Faculty sign-off gates `faculty_verified` and everything after it.
    pub const fn requires_subjects(&self) -> bool {
        self.target.rank() >= ApplicationStatus::FacultyVerified.rank()
    }
}

/// Ordered approval steps, parameterized by student type.
#[derive(Debug, Clone)]
pub struct ClearanceBlueprint {
    steps: Vec<Step>,
}

impl ClearanceBlueprint {
    pub fn standard() -> Self {
        Self {
            steps: standard_steps(),
        }
    }

    /// Steps applicable to `student_type`, in approval order.
    pub fn steps(&self, student_type: StudentType) -> Vec<Step> {
        self.steps
            .iter()
            .copied()
            .filter(|step| step.stage.applies_to(student_type))
            .collect()
    }

    /// Statuses an approved-to-completion application rests in, in order.
    pub fn path(&self, student_type: StudentType) -> Vec<ApplicationStatus> {
        let mut path = vec![ApplicationStatus::Pending];
        path.extend(
            self.steps(student_type)
                .iter()
                .map(Step::resting_status),
        );
        path
    }

    /// Stages whose flag must be raised before completion.
    pub fn flagged_stages(&self, student_type: StudentType) -> Vec<Stage> {
        let mut stages: Vec<Stage> = self
            .steps(student_type)
            .iter()
            .filter(|step| step.sets_flag)
            .map(|step| step.stage)
            .collect();
        stages.dedup();
        stages
    }

    /// The step awaiting approval, or `None` for terminal statuses and
    /// statuses that are not on the student's path.
    pub fn next_step(&self, student_type: StudentType, status: ApplicationStatus) -> Option<Step> {
        if status.is_terminal() {
            return None;
        }

        let steps = self.steps(student_type);
        if status == ApplicationStatus::Pending {
            return steps.first().copied();
        }

        let position = steps.iter().position(|step| step.target == status)?;
        match steps.get(position + 1) {
            Some(step) => Some(*step),
            // Rows stored at the final stage's own status only await completion.
            None => steps.get(position).filter(|step| step.finalizes).map(|step| Step {
                target: ApplicationStatus::Completed,
                stage: step.stage,
                sets_flag: false,
                finalizes: false,
            }),
        }
    }
}

fn standard_steps() -> Vec<Step> {
    vec![
        Step {
            target: ApplicationStatus::LibraryVerified,
            stage: Stage::Library,
            sets_flag: true,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::HostelVerificationPending,
            stage: Stage::Hostel,
            sets_flag: false,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::HostelVerified,
            stage: Stage::Hostel,
            sets_flag: true,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::CollegeOfficeVerificationPending,
            stage: Stage::CollegeOffice,
            sets_flag: false,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::CollegeOfficeVerified,
            stage: Stage::CollegeOffice,
            sets_flag: true,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::FacultyVerified,
            stage: Stage::Faculty,
            sets_flag: false,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::CounsellorVerified,
            stage: Stage::Counsellor,
            sets_flag: true,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::ClassAdvisorVerified,
            stage: Stage::ClassAdvisor,
            sets_flag: true,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::HodVerified,
            stage: Stage::Hod,
            sets_flag: true,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::PaymentPending,
            stage: Stage::Payment,
            sets_flag: true,
            finalizes: false,
        },
        Step {
            target: ApplicationStatus::LabVerified,
            stage: Stage::Lab,
            sets_flag: true,
            finalizes: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn local_path_skips_hostel_stage() {
        let blueprint = ClearanceBlueprint::standard();
        assert_eq!(
            blueprint.path(StudentType::Local),
            vec![
                Pending,
                LibraryVerified,
                CollegeOfficeVerificationPending,
                CollegeOfficeVerified,
                FacultyVerified,
                CounsellorVerified,
                ClassAdvisorVerified,
                HodVerified,
                PaymentPending,
                Completed,
            ]
        );
    }

    #[test]
    fn hostel_path_visits_hostel_before_college_office() {
        let path = ClearanceBlueprint::standard().path(StudentType::Hostel);
        let hostel = path.iter().position(|s| *s == HostelVerified).unwrap();
        let office = path
            .iter()
            .position(|s| *s == CollegeOfficeVerificationPending)
            .unwrap();
        assert_eq!(path[1], LibraryVerified);
        assert_eq!(path[2], HostelVerificationPending);
        assert!(hostel < office);
    }

    #[test]
    fn next_step_names_the_role_for_each_status() {
        let blueprint = ClearanceBlueprint::standard();
        let role_at = |status| {
            blueprint
                .next_step(StudentType::Hostel, status)
                .map(|step| step.role())
        };

        assert_eq!(role_at(Pending), Some(ActorRole::Library));
        assert_eq!(role_at(LibraryVerified), Some(ActorRole::Hostel));
        assert_eq!(role_at(HostelVerified), Some(ActorRole::CollegeOffice));
        assert_eq!(role_at(CollegeOfficeVerified), Some(ActorRole::Faculty));
        assert_eq!(role_at(HodVerified), Some(ActorRole::Payment));
        assert_eq!(role_at(PaymentPending), Some(ActorRole::Lab));
        assert_eq!(role_at(Completed), None);
        assert_eq!(role_at(Rejected), None);
    }

    #[test]
    fn off_path_status_has_no_next_step() {
        let blueprint = ClearanceBlueprint::standard();
        assert!(blueprint
            .next_step(StudentType::Local, HostelVerified)
            .is_none());
        assert!(blueprint
            .next_step(StudentType::Local, HostelVerificationPending)
            .is_none());
    }

    #[test]
    fn stored_lab_verified_awaits_completion_by_lab() {
        let step = ClearanceBlueprint::standard()
            .next_step(StudentType::Local, LabVerified)
            .expect("lab verified finalizes");
        assert_eq!(step.role(), ActorRole::Lab);
        assert_eq!(step.resting_status(), Completed);
        assert!(!step.sets_flag);
    }

    #[test]
    fn flagged_stages_follow_student_type() {
        let blueprint = ClearanceBlueprint::standard();
        assert!(blueprint
            .flagged_stages(StudentType::Hostel)
            .contains(&Stage::Hostel));
        assert!(!blueprint
            .flagged_stages(StudentType::Local)
            .contains(&Stage::Hostel));
        assert!(!blueprint
            .flagged_stages(StudentType::Local)
            .contains(&Stage::Faculty));
        assert_eq!(blueprint.flagged_stages(StudentType::Hostel).len(), 8);
    }
}
