//! Console walkthrough of the admissions pipeline against a scratch store:
//! account signup, login, the lead-to-payment entity chain, and the delete
//! cascade rules.

use admitdesk::admissions::auth::{self, SessionManager};
use admitdesk::admissions::domain::{
    ApplicationStatus, ExamResult, ExamType, FollowUpMode, LeadSource, LeadStatus, NewApplication,
    NewDepartment, NewEntranceExam, NewFollowUp, NewLead, NewPayment, NewProgram, NewScholarship,
    NewStaff, PaymentMethod, PaymentStatus, PaymentType, ScholarshipKind, StaffRole,
};
use admitdesk::admissions::forms::{LoginForm, SignupForm};
use admitdesk::admissions::{AdmissionsStore, MemoryStore, StoreError};
use admitdesk::error::AppError;
use chrono::{Duration, Utc};
use clap::Args;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the deletion-semantics walkthrough at the end
    #[arg(long)]
    pub(crate) skip_deletions: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = MemoryStore::new();
    let sessions = SessionManager::new(Duration::hours(336));

    println!("AdmitDesk pipeline demo");

    // Account signup and login through the same form layer the HTTP
    // handlers use.
    let signup = SignupForm {
        username: "anita_counselor".to_string(),
        email: "Anita@Admissions.Edu".to_string(),
        password1: "Adm1t!desk".to_string(),
        password2: "Adm1t!desk".to_string(),
    };
    let cleaned = signup
        .validate(&store)
        .map_err(|errors| demo_failure(&errors.messages().join("; ")))?;
    let identity = auth::register(&store, cleaned).map_err(store_failure)?;
    println!(
        "- Account created: {} <{}> (active: {})",
        identity.username, identity.email, identity.is_active
    );

    let verified = LoginForm {
        username: "anita_counselor".to_string(),
        password: "Adm1t!desk".to_string(),
        remember_me: true,
    }
    .validate(&store)
    .map_err(|errors| demo_failure(&errors.messages().join("; ")))?;
    let session = sessions.establish_session(verified.identity.id, verified.remember_me, Utc::now());
    println!(
        "- Logged in, persistent session expires {}",
        session
            .expires_at
            .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "with the browser".to_string())
    );

    // Entity chain: department -> program -> staff -> lead -> follow-up ->
    // application -> exam -> scholarship -> payment.
    let department = store
        .create_department(NewDepartment {
            name: "School of Engineering".to_string(),
            location: Some("Block C".to_string()),
            phone: Some("01-5550123".to_string()),
        })
        .map_err(store_failure)?;
    let program = store
        .create_program(NewProgram {
            department_id: department.id,
            name: "BE Computer".to_string(),
            total_fee: 850_000.0,
            duration_years: 4,
        })
        .map_err(store_failure)?;
    println!(
        "- {} offers {} ({} years, total fee {:.2})",
        department.name, program.name, program.duration_years, program.total_fee
    );

    let counselor = store
        .create_staff(NewStaff {
            full_name: "Anita Rai".to_string(),
            email: "anita@admissions.edu".to_string(),
            role: StaffRole::Counselor,
        })
        .map_err(store_failure)?;
    let lead = store
        .create_lead(NewLead {
            first_name: "Bibek".to_string(),
            last_name: "Thapa".to_string(),
            email: Some("bibek@example.com".to_string()),
            phone: Some("9800000000".to_string()),
            address: Some("Lalitpur".to_string()),
            source: LeadSource::Walkin,
            assigned_staff: Some(counselor.id),
        })
        .map_err(store_failure)?;
    println!(
        "- Lead {} ({}) assigned to {} [{}]",
        lead.display_name(),
        lead.source.label(),
        counselor.full_name,
        counselor.role.label()
    );

    store
        .create_follow_up(NewFollowUp {
            lead_id: lead.id,
            staff_id: counselor.id,
            followup_date: Utc::now(),
            mode: FollowUpMode::Call,
            remarks: Some("discussed entrance exam dates".to_string()),
            next_action_date: Some(Utc::now() + Duration::days(3)),
        })
        .map_err(store_failure)?;
    store
        .update_lead_status(lead.id, LeadStatus::Qualified)
        .map_err(store_failure)?;

    let application = store
        .create_application(NewApplication {
            lead_id: lead.id,
            program_id: program.id,
            documents_url: None,
        })
        .map_err(store_failure)?;
    println!(
        "- Application {} filed on {} -> status {}",
        application.id,
        application.app_date.format("%Y-%m-%d"),
        application.status.label()
    );

    let exam = store
        .record_exam(NewEntranceExam {
            application_id: application.id,
            exam_date: Utc::now() + Duration::days(7),
            exam_type: ExamType::Physical,
            score: 82.5,
            result_status: ExamResult::Pass,
        })
        .map_err(store_failure)?;
    let scholarship = store
        .record_scholarship(NewScholarship {
            exam_id: exam.id,
            kind: ScholarshipKind::Merit,
            percentage_off: 25.0,
        })
        .map_err(store_failure)?;
    store
        .approve_scholarship(scholarship.id)
        .map_err(store_failure)?;
    println!(
        "- Exam scored {:.2} ({}) -> {} scholarship {:.0}% off",
        exam.score,
        exam.result_status.label(),
        scholarship.kind.label(),
        scholarship.percentage_off
    );

    let payment = store
        .record_payment(NewPayment {
            lead_id: lead.id,
            application_id: application.id,
            amount: 1_500.0,
            payment_type: PaymentType::ApplicationFee,
            method: PaymentMethod::Esewa,
            transaction_ref_id: "ESW-2026-0042".to_string(),
        })
        .map_err(store_failure)?;
    store
        .update_payment_status(payment.id, PaymentStatus::Verified)
        .map_err(store_failure)?;
    store
        .update_application_status(application.id, ApplicationStatus::Accepted)
        .map_err(store_failure)?;
    println!(
        "- Payment {} via {} verified -> application {}",
        payment.transaction_ref_id,
        payment.method.label(),
        ApplicationStatus::Accepted.label()
    );

    if args.skip_deletions {
        return Ok(());
    }

    println!("\nDeletion semantics");
    store.delete_staff(counselor.id).map_err(store_failure)?;
    let lead = store
        .lead(lead.id)
        .map_err(store_failure)?
        .ok_or_else(|| demo_failure("lead vanished"))?;
    println!(
        "- Deleting staff cleared the lead assignment (now {:?}) and removed {} follow-up(s)",
        lead.assigned_staff,
        1
    );

    store
        .delete_department(department.id)
        .map_err(store_failure)?;
    println!(
        "- Deleting the department cascaded: program present = {}, application present = {}, payments left = {}",
        store.program(program.id).map_err(store_failure)?.is_some(),
        store
            .application(application.id)
            .map_err(store_failure)?
            .is_some(),
        store
            .payments_for_lead(lead.id)
            .map_err(store_failure)?
            .len()
    );

    Ok(())
}

fn demo_failure(message: &str) -> AppError {
    AppError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        message.to_string(),
    ))
}

fn store_failure(error: StoreError) -> AppError {
    demo_failure(&error.to_string())
}
