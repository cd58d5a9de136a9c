//! Storage seam for the admissions schema.
//!
//! Uniqueness rules (staff email, identity username/email, payment
//! transaction ref) and the one-per-parent exam/scholarship rules are
//! enforced by the store itself, not only by form validation, so a
//! check-then-insert race between concurrent requests cannot commit twice.

mod memory;

pub use memory::MemoryStore;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Department, DepartmentId, DraftError,
    EntranceExam, ExamId, FollowUp, FollowUpId, Identity, IdentityId, Lead, LeadId, LeadStatus,
    NewApplication, NewDepartment, NewEntranceExam, NewFollowUp, NewIdentity, NewLead, NewPayment,
    NewProgram, NewScholarship, NewStaff, Payment, PaymentId, PaymentStatus, Program, ProgramId,
    Scholarship, ScholarshipId, Staff, StaffId,
};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("a staff member with this email already exists")]
    DuplicateStaffEmail,
    #[error("this username is already taken")]
    DuplicateUsername,
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error("a payment with this transaction reference already exists")]
    DuplicateTransactionRef,
    #[error("an entrance exam is already recorded for this application")]
    ExamAlreadyRecorded,
    #[error("a scholarship is already recorded for this exam")]
    ScholarshipAlreadyRecorded,
    #[error("{table} row not found")]
    MissingRow { table: &'static str },
    #[error(transparent)]
    InvalidDraft(#[from] DraftError),
}

/// Persistence operations for the admissions entities.
///
/// One method group per table; deletes carry the cascade semantics of the
/// schema (documented per method where they are not obvious).
pub trait AdmissionsStore: Send + Sync {
    fn create_department(&self, draft: NewDepartment) -> Result<Department, StoreError>;
    fn department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError>;
    fn departments(&self) -> Result<Vec<Department>, StoreError>;
    /// Deletes the department and cascades to its programs (and through them
    /// to applications, exams, scholarships, and payments).
    fn delete_department(&self, id: DepartmentId) -> Result<(), StoreError>;

    fn create_program(&self, draft: NewProgram) -> Result<Program, StoreError>;
    fn program(&self, id: ProgramId) -> Result<Option<Program>, StoreError>;
    fn programs_for_department(&self, id: DepartmentId) -> Result<Vec<Program>, StoreError>;
    fn delete_program(&self, id: ProgramId) -> Result<(), StoreError>;

    fn create_staff(&self, draft: NewStaff) -> Result<Staff, StoreError>;
    fn staff_member(&self, id: StaffId) -> Result<Option<Staff>, StoreError>;
    fn staff(&self) -> Result<Vec<Staff>, StoreError>;
    /// Deletes the staff member, cascades their follow-ups, and clears (does
    /// not delete) any lead assignments pointing at them.
    fn delete_staff(&self, id: StaffId) -> Result<(), StoreError>;

    fn create_lead(&self, draft: NewLead) -> Result<Lead, StoreError>;
    fn lead(&self, id: LeadId) -> Result<Option<Lead>, StoreError>;
    fn leads(&self) -> Result<Vec<Lead>, StoreError>;
    fn update_lead_status(&self, id: LeadId, status: LeadStatus) -> Result<(), StoreError>;
    fn assign_staff_to_lead(&self, id: LeadId, staff: Option<StaffId>) -> Result<(), StoreError>;
    /// Deletes the lead and cascades its follow-ups, applications, and
    /// payments (and through applications, exams and scholarships).
    fn delete_lead(&self, id: LeadId) -> Result<(), StoreError>;

    fn create_follow_up(&self, draft: NewFollowUp) -> Result<FollowUp, StoreError>;
    /// Most recent `followup_date` first.
    fn follow_ups_for_lead(&self, id: LeadId) -> Result<Vec<FollowUp>, StoreError>;
    fn delete_follow_up(&self, id: FollowUpId) -> Result<(), StoreError>;

    fn create_application(&self, draft: NewApplication) -> Result<Application, StoreError>;
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError>;
    fn applications_for_lead(&self, id: LeadId) -> Result<Vec<Application>, StoreError>;
    fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), StoreError>;
    /// Deletes the application and cascades its exam (with any scholarship)
    /// and payments.
    fn delete_application(&self, id: ApplicationId) -> Result<(), StoreError>;

    /// At most one exam per application.
    fn record_exam(&self, draft: NewEntranceExam) -> Result<EntranceExam, StoreError>;
    fn exam_for_application(&self, id: ApplicationId)
        -> Result<Option<EntranceExam>, StoreError>;
    /// Deletes the exam and cascades its scholarship.
    fn delete_exam(&self, id: ExamId) -> Result<(), StoreError>;

    /// At most one scholarship per exam.
    fn record_scholarship(&self, draft: NewScholarship) -> Result<Scholarship, StoreError>;
    fn scholarship_for_exam(&self, id: ExamId) -> Result<Option<Scholarship>, StoreError>;
    fn approve_scholarship(&self, id: ScholarshipId) -> Result<(), StoreError>;

    fn record_payment(&self, draft: NewPayment) -> Result<Payment, StoreError>;
    /// Most recent `payment_date` first.
    fn payments_for_application(&self, id: ApplicationId) -> Result<Vec<Payment>, StoreError>;
    /// Most recent `payment_date` first.
    fn payments_for_lead(&self, id: LeadId) -> Result<Vec<Payment>, StoreError>;
    fn update_payment_status(&self, id: PaymentId, status: PaymentStatus)
        -> Result<(), StoreError>;
}

/// Persistence operations for authentication identities, kept separate from
/// the business entities (nothing links an identity to a staff row).
pub trait IdentityStore: Send + Sync {
    /// Insert a new identity. Username and email uniqueness is checked and
    /// committed under one lock, so concurrent duplicate signups cannot both
    /// succeed.
    fn create_identity(&self, draft: NewIdentity) -> Result<Identity, StoreError>;
    fn identity(&self, id: IdentityId) -> Result<Option<Identity>, StoreError>;
    fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;
    fn username_taken(&self, username: &str) -> Result<bool, StoreError>;
    fn email_taken(&self, email: &str) -> Result<bool, StoreError>;
    fn set_active(&self, id: IdentityId, active: bool) -> Result<(), StoreError>;
}
