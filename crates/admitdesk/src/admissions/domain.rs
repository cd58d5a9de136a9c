use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(DepartmentId);
id_newtype!(ProgramId);
id_newtype!(StaffId);
id_newtype!(LeadId);
id_newtype!(FollowUpId);
id_newtype!(ApplicationId);
id_newtype!(ExamId);
id_newtype!(ScholarshipId);
id_newtype!(PaymentId);
id_newtype!(
    /// Key for an authentication identity. Identities are deliberately not
    /// linked to [`Staff`] rows; nothing in the product ties a login to a
    /// staff member yet.
    IdentityId
);

/// An academic unit that owns programs, e.g. "School of Engineering".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub location: Option<String>,
    pub phone: Option<String>,
}

/// A course of study offered by a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub department_id: DepartmentId,
    pub name: String,
    pub total_fee: f64,
    pub duration_years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Counselor,
    Admin,
    Finance,
}

impl StaffRole {
    pub const fn label(self) -> &'static str {
        match self {
            StaffRole::Counselor => "counselor",
            StaffRole::Admin => "admin",
            StaffRole::Finance => "finance",
        }
    }
}

/// An admissions-office employee. Email is unique across all staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub full_name: String,
    pub email: String,
    pub role: StaffRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Facebook,
    Walkin,
    Referral,
    Other,
}

impl LeadSource {
    pub const fn label(self) -> &'static str {
        match self {
            LeadSource::Facebook => "facebook",
            LeadSource::Walkin => "walkin",
            LeadSource::Referral => "referral",
            LeadSource::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Qualified,
    Converted,
    Dropped,
}

impl LeadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Dropped => "dropped",
        }
    }
}

/// A prospective applicant tracked from first contact through conversion or
/// drop-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub source: LeadSource,
    pub current_status: LeadStatus,
    /// Which counselor is handling this lead. Cleared, not cascaded, when the
    /// staff member is deleted.
    pub assigned_staff: Option<StaffId>,
    /// Set by the store at insert; never updated afterwards.
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpMode {
    Call,
    Email,
    Whatsapp,
}

impl FollowUpMode {
    pub const fn label(self) -> &'static str {
        match self {
            FollowUpMode::Call => "call",
            FollowUpMode::Email => "email",
            FollowUpMode::Whatsapp => "whatsapp",
        }
    }
}

/// A logged contact attempt with a lead. Deleted together with either its
/// lead or the staff member who made it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: FollowUpId,
    pub lead_id: LeadId,
    pub staff_id: StaffId,
    pub followup_date: DateTime<Utc>,
    pub mode: FollowUpMode,
    pub remarks: Option<String>,
    pub next_action_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Accepted,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Accepted => "accepted",
        }
    }
}

/// A lead's formal request to join a specific program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub lead_id: LeadId,
    pub program_id: ProgramId,
    /// Set by the store at insert; never updated afterwards.
    pub app_date: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub documents_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
    Online,
    Physical,
}

impl ExamType {
    pub const fn label(self) -> &'static str {
        match self {
            ExamType::Online => "online",
            ExamType::Physical => "physical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamResult {
    Pass,
    Fail,
}

impl ExamResult {
    pub const fn label(self) -> &'static str {
        match self {
            ExamResult::Pass => "pass",
            ExamResult::Fail => "fail",
        }
    }
}

/// Entrance exam sat for one application. At most one per application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntranceExam {
    pub id: ExamId,
    pub application_id: ApplicationId,
    pub exam_date: DateTime<Utc>,
    pub exam_type: ExamType,
    pub score: f64,
    pub result_status: ExamResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScholarshipKind {
    Merit,
    Quota,
    FinancialAid,
}

impl ScholarshipKind {
    pub const fn label(self) -> &'static str {
        match self {
            ScholarshipKind::Merit => "merit",
            ScholarshipKind::Quota => "quota",
            ScholarshipKind::FinancialAid => "financial_aid",
        }
    }
}

/// Fee reduction tied to one entrance exam result. At most one per exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scholarship {
    pub id: ScholarshipId,
    pub exam_id: ExamId,
    pub kind: ScholarshipKind,
    pub percentage_off: f64,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    ApplicationFee,
    AdmissionFee,
    SemesterFee,
}

impl PaymentType {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentType::ApplicationFee => "application_fee",
            PaymentType::AdmissionFee => "admission_fee",
            PaymentType::SemesterFee => "semester_fee",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Esewa,
    Khalti,
    BankVoucher,
    Connectips,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMethod::Esewa => "esewa",
            PaymentMethod::Khalti => "khalti",
            PaymentMethod::BankVoucher => "bank_voucher",
            PaymentMethod::Connectips => "connectips",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Failed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// A recorded fee payment. Only the status is tracked; no gateway calls are
/// made from this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub lead_id: LeadId,
    pub application_id: ApplicationId,
    pub amount: f64,
    /// Set by the store at insert; never updated afterwards.
    pub payment_date: DateTime<Utc>,
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
    /// Bank or wallet transaction id, globally unique.
    pub transaction_ref_id: String,
    pub status: PaymentStatus,
}

/// An authentication record, independent of the business entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
}

/// Draft-level validation failures raised before a row reaches the store.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DraftError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} must be at least {min}")]
    BelowMinimum { field: &'static str, min: u32 },
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
    #[error("{field} must be between 0 and 100 (found {found})")]
    OutOfRange { field: &'static str, found: f64 },
}

/// Insert draft for [`Department`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    pub location: Option<String>,
    pub phone: Option<String>,
}

impl NewDepartment {
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::MissingField { field: "name" });
        }
        Ok(())
    }
}

/// Insert draft for [`Program`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProgram {
    pub department_id: DepartmentId,
    pub name: String,
    pub total_fee: f64,
    pub duration_years: u32,
}

impl NewProgram {
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::MissingField { field: "name" });
        }
        if !(self.total_fee >= 0.0) {
            return Err(DraftError::Negative { field: "total_fee" });
        }
        if self.duration_years < 1 {
            return Err(DraftError::BelowMinimum {
                field: "duration_years",
                min: 1,
            });
        }
        Ok(())
    }
}

/// Insert draft for [`Staff`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStaff {
    pub full_name: String,
    pub email: String,
    pub role: StaffRole,
}

impl NewStaff {
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.full_name.trim().is_empty() {
            return Err(DraftError::MissingField { field: "full_name" });
        }
        if self.email.trim().is_empty() {
            return Err(DraftError::MissingField { field: "email" });
        }
        Ok(())
    }
}

/// Insert draft for [`Lead`]. Status defaults to [`LeadStatus::New`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLead {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub source: LeadSource,
    pub assigned_staff: Option<StaffId>,
}

impl NewLead {
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.first_name.trim().is_empty() {
            return Err(DraftError::MissingField { field: "first_name" });
        }
        if self.last_name.trim().is_empty() {
            return Err(DraftError::MissingField { field: "last_name" });
        }
        Ok(())
    }
}

/// Insert draft for [`FollowUp`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFollowUp {
    pub lead_id: LeadId,
    pub staff_id: StaffId,
    pub followup_date: DateTime<Utc>,
    pub mode: FollowUpMode,
    pub remarks: Option<String>,
    pub next_action_date: Option<DateTime<Utc>>,
}

/// Insert draft for [`Application`]. Status defaults to
/// [`ApplicationStatus::Pending`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApplication {
    pub lead_id: LeadId,
    pub program_id: ProgramId,
    pub documents_url: Option<String>,
}

/// Insert draft for [`EntranceExam`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntranceExam {
    pub application_id: ApplicationId,
    pub exam_date: DateTime<Utc>,
    pub exam_type: ExamType,
    pub score: f64,
    pub result_status: ExamResult,
}

impl NewEntranceExam {
    pub fn validate(&self) -> Result<(), DraftError> {
        if !(0.0..=100.0).contains(&self.score) {
            return Err(DraftError::OutOfRange {
                field: "score",
                found: self.score,
            });
        }
        Ok(())
    }
}

/// Insert draft for [`Scholarship`]. Starts unapproved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScholarship {
    pub exam_id: ExamId,
    pub kind: ScholarshipKind,
    pub percentage_off: f64,
}

impl NewScholarship {
    pub fn validate(&self) -> Result<(), DraftError> {
        if !(0.0..=100.0).contains(&self.percentage_off) {
            return Err(DraftError::OutOfRange {
                field: "percentage_off",
                found: self.percentage_off,
            });
        }
        Ok(())
    }
}

/// Insert draft for [`Payment`]. Status defaults to [`PaymentStatus::Pending`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub lead_id: LeadId,
    pub application_id: ApplicationId,
    pub amount: f64,
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
    pub transaction_ref_id: String,
}

impl NewPayment {
    pub fn validate(&self) -> Result<(), DraftError> {
        if !(self.amount >= 0.0) {
            return Err(DraftError::Negative { field: "amount" });
        }
        if self.transaction_ref_id.trim().is_empty() {
            return Err(DraftError::MissingField {
                field: "transaction_ref_id",
            });
        }
        Ok(())
    }
}

/// Insert draft for [`Identity`]. The password arrives already hashed; the
/// account starts active.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
