use crate::infra::{InMemoryApplicationRepository, InMemoryNotificationPublisher};
use clap::Args;
use no_dues::config::ClearanceConfig;
use no_dues::error::AppError;
use no_dues::workflows::clearance::{
    render_status, ActorRole, ApplicationStatus, ApplicationSubmission, ClearanceService,
    ClearanceServiceError, FacultyId, Recipient, ReviewAction, Stage, StudentId, StudentType,
    SubjectId, SubjectSelection, TransitionRequest,
};
use std::sync::Arc;

const DEMO_SUBJECTS: [(&str, &str, &str); 5] = [
    ("Compiler Design", "CS601", "Dr. Iyer"),
    ("Computer Networks", "CS602", "Dr. Menon"),
    ("Machine Learning", "CS603", "Dr. Rao"),
    ("Cloud Computing", "CS604", "Dr. Nair"),
    ("Project Phase I", "CS605", "Dr. Das"),
];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Run the demo for a hostel resident (adds the hostel sign-off)
    #[arg(long)]
    pub(crate) hostel: bool,
    /// Number of subjects selected by the student (at most 5)
    #[arg(long, default_value_t = 3)]
    pub(crate) subjects: usize,
    /// Reject the application when it reaches this reviewer role
    #[arg(long, value_parser = parse_role)]
    pub(crate) reject_at: Option<ActorRole>,
    /// Payment reference recorded at the payment stage
    #[arg(long, default_value = "TXN-DEMO-0001")]
    pub(crate) transaction_id: String,
}

#[derive(Args, Debug)]
pub(crate) struct BadgeArgs {
    /// Stored status string, e.g. `college_office_verified`
    pub(crate) status: String,
    /// Emit the badge as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

fn parse_role(raw: &str) -> Result<ActorRole, String> {
    raw.parse::<ActorRole>().map_err(|err| err.to_string())
}

pub(crate) fn run_badge(args: BadgeArgs) -> Result<(), AppError> {
    let badge = render_status(&args.status);
    if args.json {
        match serde_json::to_string(&badge) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("badge unavailable: {err}"),
        }
    } else {
        println!("{} [{:?}]", badge.label, badge.category);
    }
    Ok(())
}

fn demo_submission(student_type: StudentType, subjects: usize) -> ApplicationSubmission {
    ApplicationSubmission {
        student_id: StudentId("21CS1042".to_string()),
        department: "Computer Science and Engineering".to_string(),
        semester: 6,
        section: "A".to_string(),
        student_type,
        subjects: DEMO_SUBJECTS
            .iter()
            .take(subjects)
            .enumerate()
            .map(|(index, (name, code, faculty))| SubjectSelection {
                subject_id: SubjectId(code.to_lowercase()),
                subject_name: name.to_string(),
                subject_code: code.to_string(),
                faculty_id: FacultyId(format!("fac-{:02}", index + 1)),
                faculty_name: faculty.to_string(),
            })
            .collect(),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        hostel,
        subjects,
        reject_at,
        transaction_id,
    } = args;
    let student_type = if hostel {
        StudentType::Hostel
    } else {
        StudentType::Local
    };

    let inbox = Arc::new(InMemoryNotificationPublisher::default());
    let service = ClearanceService::new(
        Arc::new(InMemoryApplicationRepository::default()),
        inbox.clone(),
        ClearanceConfig::default(),
    );

    println!("No-dues clearance demo ({student_type} student)");
    let mut application = service.submit(demo_submission(student_type, subjects))?;
    println!(
        "- Submitted application {} with {} subject(s) -> {}",
        application.id,
        application.subjects.len(),
        application.status.label()
    );

    while !application.status.is_terminal() {
        let step = service
            .engine()
            .pending_step(&application)
            .map_err(ClearanceServiceError::from)?;

        if step.requires_subjects() && !application.all_subjects_verified() {
            let open: Vec<_> = application.unverified_subjects().cloned().collect();
            for subject in open {
                application = service.verify_subject(
                    &application.id,
                    &subject.subject_id,
                    &subject.faculty_id,
                    Some("no dues".to_string()),
                )?;
                println!(
                    "  * {} ({}) signed off by {}",
                    subject.subject_name, subject.subject_code, subject.faculty_name
                );
            }
        }

        let mut request = if reject_at == Some(step.role()) {
            TransitionRequest::reject(
                step.role(),
                application.status,
                "dues outstanding at this desk",
            )
        } else {
            TransitionRequest::approve(step.role(), application.status)
        };
        request = request.with_actor(format!("{}-desk", step.role()));
        if step.stage == Stage::Payment {
            request = request.with_transaction(transaction_id.clone());
        }

        let action = request.action;
        let from = application.status;
        application = service.advance(&application.id, request)?;
        let verb = match action {
            ReviewAction::Approve => "approved",
            ReviewAction::Reject => "rejected",
        };
        println!(
            "- {} {} : {} -> {}",
            step.stage.label(),
            verb,
            from.label(),
            application.status.label()
        );
    }

    let view = service.status_view(&application);
    match serde_json::to_string_pretty(&view) {
        Ok(json) => println!("\nFinal status payload:\n{json}"),
        Err(err) => println!("\nFinal status payload unavailable: {err}"),
    }

    if application.status == ApplicationStatus::Rejected {
        if let Some(rejection) = &application.rejection {
            println!(
                "Rejected at the {} stage: {}",
                rejection.stage.label(),
                rejection.comment.as_deref().unwrap_or("no comment")
            );
        }
    }

    let events = inbox.events();
    println!("Notifications dispatched: {}", events.len());
    for event in events {
        let recipient = match &event.notification.recipient {
            Recipient::Student(student) => format!("student {student}"),
            Recipient::Role(role) => format!("{role} desk"),
        };
        println!(
            "  - [{}] {} -> {}",
            event.delivered_at.format("%H:%M:%S"),
            event.notification.template,
            recipient
        );
    }

    Ok(())
}
