use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use tracing::debug;

use super::{AdmissionsStore, IdentityStore, StoreError};
use crate::admissions::domain::{
    Application, ApplicationId, ApplicationStatus, Department, DepartmentId, EntranceExam, ExamId,
    FollowUp, FollowUpId, Identity, IdentityId, Lead, LeadId, LeadStatus, NewApplication,
    NewDepartment, NewEntranceExam, NewFollowUp, NewIdentity, NewLead, NewPayment, NewProgram,
    NewScholarship, NewStaff, Payment, PaymentId, PaymentStatus, Program, ProgramId, Scholarship,
    ScholarshipId, Staff, StaffId,
};

/// In-process relational store. One `BTreeMap` per table behind a single
/// mutex; uniqueness checks and inserts happen under the same lock, so the
/// check-then-insert pair is atomic with respect to concurrent callers.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    next_id: u64,
    departments: BTreeMap<DepartmentId, Department>,
    programs: BTreeMap<ProgramId, Program>,
    staff: BTreeMap<StaffId, Staff>,
    leads: BTreeMap<LeadId, Lead>,
    follow_ups: BTreeMap<FollowUpId, FollowUp>,
    applications: BTreeMap<ApplicationId, Application>,
    exams: BTreeMap<ExamId, EntranceExam>,
    scholarships: BTreeMap<ScholarshipId, Scholarship>,
    payments: BTreeMap<PaymentId, Payment>,
    identities: BTreeMap<IdentityId, Identity>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_program_rows(&mut self, program_id: ProgramId) {
        let applications: Vec<ApplicationId> = self
            .applications
            .values()
            .filter(|app| app.program_id == program_id)
            .map(|app| app.id)
            .collect();
        for app_id in applications {
            self.remove_application_rows(app_id);
        }
        self.programs.remove(&program_id);
    }

    fn remove_lead_rows(&mut self, lead_id: LeadId) {
        self.follow_ups.retain(|_, fu| fu.lead_id != lead_id);
        let applications: Vec<ApplicationId> = self
            .applications
            .values()
            .filter(|app| app.lead_id == lead_id)
            .map(|app| app.id)
            .collect();
        for app_id in applications {
            self.remove_application_rows(app_id);
        }
        self.payments.retain(|_, payment| payment.lead_id != lead_id);
        self.leads.remove(&lead_id);
    }

    fn remove_application_rows(&mut self, app_id: ApplicationId) {
        let exams: Vec<ExamId> = self
            .exams
            .values()
            .filter(|exam| exam.application_id == app_id)
            .map(|exam| exam.id)
            .collect();
        for exam_id in exams {
            self.remove_exam_rows(exam_id);
        }
        self.payments
            .retain(|_, payment| payment.application_id != app_id);
        self.applications.remove(&app_id);
    }

    fn remove_exam_rows(&mut self, exam_id: ExamId) {
        self.scholarships
            .retain(|_, scholarship| scholarship.exam_id != exam_id);
        self.exams.remove(&exam_id);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned lock means a writer panicked mid-mutation; the tables
        // are plain maps, so the data itself is still consistent.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AdmissionsStore for MemoryStore {
    fn create_department(&self, draft: NewDepartment) -> Result<Department, StoreError> {
        draft.validate()?;
        let mut tables = self.lock();
        let id = DepartmentId(tables.next_id());
        let row = Department {
            id,
            name: draft.name,
            location: draft.location,
            phone: draft.phone,
        };
        tables.departments.insert(id, row.clone());
        Ok(row)
    }

    fn department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        Ok(self.lock().departments.get(&id).cloned())
    }

    fn departments(&self) -> Result<Vec<Department>, StoreError> {
        Ok(self.lock().departments.values().cloned().collect())
    }

    fn delete_department(&self, id: DepartmentId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.departments.remove(&id).is_none() {
            return Err(StoreError::MissingRow {
                table: "departments",
            });
        }
        let programs: Vec<ProgramId> = tables
            .programs
            .values()
            .filter(|program| program.department_id == id)
            .map(|program| program.id)
            .collect();
        debug!(department = %id, cascaded_programs = programs.len(), "department deleted");
        for program_id in programs {
            tables.remove_program_rows(program_id);
        }
        Ok(())
    }

    fn create_program(&self, draft: NewProgram) -> Result<Program, StoreError> {
        draft.validate()?;
        let mut tables = self.lock();
        if !tables.departments.contains_key(&draft.department_id) {
            return Err(StoreError::MissingRow {
                table: "departments",
            });
        }
        let id = ProgramId(tables.next_id());
        let row = Program {
            id,
            department_id: draft.department_id,
            name: draft.name,
            total_fee: draft.total_fee,
            duration_years: draft.duration_years,
        };
        tables.programs.insert(id, row.clone());
        Ok(row)
    }

    fn program(&self, id: ProgramId) -> Result<Option<Program>, StoreError> {
        Ok(self.lock().programs.get(&id).cloned())
    }

    fn programs_for_department(&self, id: DepartmentId) -> Result<Vec<Program>, StoreError> {
        Ok(self
            .lock()
            .programs
            .values()
            .filter(|program| program.department_id == id)
            .cloned()
            .collect())
    }

    fn delete_program(&self, id: ProgramId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.programs.contains_key(&id) {
            return Err(StoreError::MissingRow { table: "programs" });
        }
        tables.remove_program_rows(id);
        Ok(())
    }

    fn create_staff(&self, draft: NewStaff) -> Result<Staff, StoreError> {
        draft.validate()?;
        let mut tables = self.lock();
        let email = draft.email.trim().to_ascii_lowercase();
        if tables
            .staff
            .values()
            .any(|member| member.email.eq_ignore_ascii_case(&email))
        {
            return Err(StoreError::DuplicateStaffEmail);
        }
        let id = StaffId(tables.next_id());
        let row = Staff {
            id,
            full_name: draft.full_name,
            email,
            role: draft.role,
        };
        tables.staff.insert(id, row.clone());
        Ok(row)
    }

    fn staff_member(&self, id: StaffId) -> Result<Option<Staff>, StoreError> {
        Ok(self.lock().staff.get(&id).cloned())
    }

    fn staff(&self) -> Result<Vec<Staff>, StoreError> {
        Ok(self.lock().staff.values().cloned().collect())
    }

    fn delete_staff(&self, id: StaffId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.staff.remove(&id).is_none() {
            return Err(StoreError::MissingRow { table: "staff" });
        }
        tables.follow_ups.retain(|_, fu| fu.staff_id != id);
        let mut cleared = 0usize;
        for lead in tables.leads.values_mut() {
            if lead.assigned_staff == Some(id) {
                lead.assigned_staff = None;
                cleared += 1;
            }
        }
        debug!(staff = %id, cleared_leads = cleared, "staff member deleted");
        Ok(())
    }

    fn create_lead(&self, draft: NewLead) -> Result<Lead, StoreError> {
        draft.validate()?;
        let mut tables = self.lock();
        if let Some(staff_id) = draft.assigned_staff {
            if !tables.staff.contains_key(&staff_id) {
                return Err(StoreError::MissingRow { table: "staff" });
            }
        }
        let id = LeadId(tables.next_id());
        let row = Lead {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            source: draft.source,
            current_status: LeadStatus::New,
            assigned_staff: draft.assigned_staff,
            created_at: Utc::now(),
        };
        tables.leads.insert(id, row.clone());
        Ok(row)
    }

    fn lead(&self, id: LeadId) -> Result<Option<Lead>, StoreError> {
        Ok(self.lock().leads.get(&id).cloned())
    }

    fn leads(&self) -> Result<Vec<Lead>, StoreError> {
        Ok(self.lock().leads.values().cloned().collect())
    }

    fn update_lead_status(&self, id: LeadId, status: LeadStatus) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let lead = tables
            .leads
            .get_mut(&id)
            .ok_or(StoreError::MissingRow { table: "leads" })?;
        lead.current_status = status;
        Ok(())
    }

    fn assign_staff_to_lead(&self, id: LeadId, staff: Option<StaffId>) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if let Some(staff_id) = staff {
            if !tables.staff.contains_key(&staff_id) {
                return Err(StoreError::MissingRow { table: "staff" });
            }
        }
        let lead = tables
            .leads
            .get_mut(&id)
            .ok_or(StoreError::MissingRow { table: "leads" })?;
        lead.assigned_staff = staff;
        Ok(())
    }

    fn delete_lead(&self, id: LeadId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.leads.contains_key(&id) {
            return Err(StoreError::MissingRow { table: "leads" });
        }
        tables.remove_lead_rows(id);
        Ok(())
    }

    fn create_follow_up(&self, draft: NewFollowUp) -> Result<FollowUp, StoreError> {
        let mut tables = self.lock();
        if !tables.leads.contains_key(&draft.lead_id) {
            return Err(StoreError::MissingRow { table: "leads" });
        }
        if !tables.staff.contains_key(&draft.staff_id) {
            return Err(StoreError::MissingRow { table: "staff" });
        }
        let id = FollowUpId(tables.next_id());
        let row = FollowUp {
            id,
            lead_id: draft.lead_id,
            staff_id: draft.staff_id,
            followup_date: draft.followup_date,
            mode: draft.mode,
            remarks: draft.remarks,
            next_action_date: draft.next_action_date,
        };
        tables.follow_ups.insert(id, row.clone());
        Ok(row)
    }

    fn follow_ups_for_lead(&self, id: LeadId) -> Result<Vec<FollowUp>, StoreError> {
        let tables = self.lock();
        let mut rows: Vec<FollowUp> = tables
            .follow_ups
            .values()
            .filter(|fu| fu.lead_id == id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.followup_date.cmp(&a.followup_date));
        Ok(rows)
    }

    fn delete_follow_up(&self, id: FollowUpId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        tables
            .follow_ups
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::MissingRow { table: "follow_ups" })
    }

    fn create_application(&self, draft: NewApplication) -> Result<Application, StoreError> {
        let mut tables = self.lock();
        if !tables.leads.contains_key(&draft.lead_id) {
            return Err(StoreError::MissingRow { table: "leads" });
        }
        if !tables.programs.contains_key(&draft.program_id) {
            return Err(StoreError::MissingRow { table: "programs" });
        }
        let id = ApplicationId(tables.next_id());
        let row = Application {
            id,
            lead_id: draft.lead_id,
            program_id: draft.program_id,
            app_date: Utc::now(),
            status: ApplicationStatus::Pending,
            documents_url: draft.documents_url,
        };
        tables.applications.insert(id, row.clone());
        Ok(row)
    }

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self.lock().applications.get(&id).cloned())
    }

    fn applications_for_lead(&self, id: LeadId) -> Result<Vec<Application>, StoreError> {
        Ok(self
            .lock()
            .applications
            .values()
            .filter(|app| app.lead_id == id)
            .cloned()
            .collect())
    }

    fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let app = tables.applications.get_mut(&id).ok_or(StoreError::MissingRow {
            table: "applications",
        })?;
        app.status = status;
        Ok(())
    }

    fn delete_application(&self, id: ApplicationId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.applications.contains_key(&id) {
            return Err(StoreError::MissingRow {
                table: "applications",
            });
        }
        tables.remove_application_rows(id);
        Ok(())
    }

    fn record_exam(&self, draft: NewEntranceExam) -> Result<EntranceExam, StoreError> {
        draft.validate()?;
        let mut tables = self.lock();
        if !tables.applications.contains_key(&draft.application_id) {
            return Err(StoreError::MissingRow {
                table: "applications",
            });
        }
        if tables
            .exams
            .values()
            .any(|exam| exam.application_id == draft.application_id)
        {
            return Err(StoreError::ExamAlreadyRecorded);
        }
        let id = ExamId(tables.next_id());
        let row = EntranceExam {
            id,
            application_id: draft.application_id,
            exam_date: draft.exam_date,
            exam_type: draft.exam_type,
            score: draft.score,
            result_status: draft.result_status,
        };
        tables.exams.insert(id, row.clone());
        Ok(row)
    }

    fn exam_for_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<EntranceExam>, StoreError> {
        Ok(self
            .lock()
            .exams
            .values()
            .find(|exam| exam.application_id == id)
            .cloned())
    }

    fn delete_exam(&self, id: ExamId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.exams.contains_key(&id) {
            return Err(StoreError::MissingRow { table: "exams" });
        }
        tables.remove_exam_rows(id);
        Ok(())
    }

    fn record_scholarship(&self, draft: NewScholarship) -> Result<Scholarship, StoreError> {
        draft.validate()?;
        let mut tables = self.lock();
        if !tables.exams.contains_key(&draft.exam_id) {
            return Err(StoreError::MissingRow { table: "exams" });
        }
        if tables
            .scholarships
            .values()
            .any(|scholarship| scholarship.exam_id == draft.exam_id)
        {
            return Err(StoreError::ScholarshipAlreadyRecorded);
        }
        let id = ScholarshipId(tables.next_id());
        let row = Scholarship {
            id,
            exam_id: draft.exam_id,
            kind: draft.kind,
            percentage_off: draft.percentage_off,
            is_approved: false,
        };
        tables.scholarships.insert(id, row.clone());
        Ok(row)
    }

    fn scholarship_for_exam(&self, id: ExamId) -> Result<Option<Scholarship>, StoreError> {
        Ok(self
            .lock()
            .scholarships
            .values()
            .find(|scholarship| scholarship.exam_id == id)
            .cloned())
    }

    fn approve_scholarship(&self, id: ScholarshipId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let scholarship = tables.scholarships.get_mut(&id).ok_or(StoreError::MissingRow {
            table: "scholarships",
        })?;
        scholarship.is_approved = true;
        Ok(())
    }

    fn record_payment(&self, draft: NewPayment) -> Result<Payment, StoreError> {
        draft.validate()?;
        let mut tables = self.lock();
        if !tables.leads.contains_key(&draft.lead_id) {
            return Err(StoreError::MissingRow { table: "leads" });
        }
        if !tables.applications.contains_key(&draft.application_id) {
            return Err(StoreError::MissingRow {
                table: "applications",
            });
        }
        if tables
            .payments
            .values()
            .any(|payment| payment.transaction_ref_id == draft.transaction_ref_id)
        {
            return Err(StoreError::DuplicateTransactionRef);
        }
        let id = PaymentId(tables.next_id());
        let row = Payment {
            id,
            lead_id: draft.lead_id,
            application_id: draft.application_id,
            amount: draft.amount,
            payment_date: Utc::now(),
            payment_type: draft.payment_type,
            method: draft.method,
            transaction_ref_id: draft.transaction_ref_id,
            status: PaymentStatus::Pending,
        };
        tables.payments.insert(id, row.clone());
        Ok(row)
    }

    fn payments_for_application(&self, id: ApplicationId) -> Result<Vec<Payment>, StoreError> {
        let tables = self.lock();
        let mut rows: Vec<Payment> = tables
            .payments
            .values()
            .filter(|payment| payment.application_id == id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(rows)
    }

    fn payments_for_lead(&self, id: LeadId) -> Result<Vec<Payment>, StoreError> {
        let tables = self.lock();
        let mut rows: Vec<Payment> = tables
            .payments
            .values()
            .filter(|payment| payment.lead_id == id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(rows)
    }

    fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let payment = tables
            .payments
            .get_mut(&id)
            .ok_or(StoreError::MissingRow { table: "payments" })?;
        payment.status = status;
        Ok(())
    }
}

impl IdentityStore for MemoryStore {
    fn create_identity(&self, draft: NewIdentity) -> Result<Identity, StoreError> {
        let mut tables = self.lock();
        if tables
            .identities
            .values()
            .any(|identity| identity.username == draft.username)
        {
            return Err(StoreError::DuplicateUsername);
        }
        if tables
            .identities
            .values()
            .any(|identity| identity.email == draft.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        let id = IdentityId(tables.next_id());
        let row = Identity {
            id,
            username: draft.username,
            email: draft.email,
            password_hash: draft.password_hash,
            is_active: true,
        };
        tables.identities.insert(id, row.clone());
        Ok(row)
    }

    fn identity(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        Ok(self.lock().identities.get(&id).cloned())
    }

    fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .lock()
            .identities
            .values()
            .find(|identity| identity.username == username)
            .cloned())
    }

    fn username_taken(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .identities
            .values()
            .any(|identity| identity.username == username))
    }

    fn email_taken(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .identities
            .values()
            .any(|identity| identity.email == email))
    }

    fn set_active(&self, id: IdentityId, active: bool) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let identity = tables.identities.get_mut(&id).ok_or(StoreError::MissingRow {
            table: "identities",
        })?;
        identity.is_active = active;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::domain::{
        ExamResult, ExamType, FollowUpMode, LeadSource, PaymentMethod, PaymentType,
        ScholarshipKind, StaffRole,
    };

    fn seeded_chain(store: &MemoryStore) -> (Department, Program, Staff, Lead, Application) {
        let department = store
            .create_department(NewDepartment {
                name: "School of Engineering".to_string(),
                location: Some("Block C".to_string()),
                phone: None,
            })
            .expect("department inserts");
        let program = store
            .create_program(NewProgram {
                department_id: department.id,
                name: "BE Computer".to_string(),
                total_fee: 850_000.0,
                duration_years: 4,
            })
            .expect("program inserts");
        let staff = store
            .create_staff(NewStaff {
                full_name: "Sita Koirala".to_string(),
                email: "sita@example.edu".to_string(),
                role: StaffRole::Counselor,
            })
            .expect("staff inserts");
        let lead = store
            .create_lead(NewLead {
                first_name: "Ramesh".to_string(),
                last_name: "Shrestha".to_string(),
                email: Some("ramesh@example.com".to_string()),
                phone: Some("9800000000".to_string()),
                address: None,
                source: LeadSource::Walkin,
                assigned_staff: Some(staff.id),
            })
            .expect("lead inserts");
        let application = store
            .create_application(NewApplication {
                lead_id: lead.id,
                program_id: program.id,
                documents_url: None,
            })
            .expect("application inserts");
        (department, program, staff, lead, application)
    }

    #[test]
    fn new_lead_defaults_to_new_status() {
        let store = MemoryStore::new();
        let (_, _, _, lead, _) = seeded_chain(&store);
        assert_eq!(lead.current_status, LeadStatus::New);
    }

    #[test]
    fn deleting_department_cascades_to_programs() {
        let store = MemoryStore::new();
        let (department, program, _, _, application) = seeded_chain(&store);

        store
            .delete_department(department.id)
            .expect("department deletes");

        assert_eq!(store.program(program.id).expect("lookup"), None);
        assert_eq!(store.application(application.id).expect("lookup"), None);
    }

    #[test]
    fn deleting_staff_nullifies_lead_assignment_and_cascades_follow_ups() {
        let store = MemoryStore::new();
        let (_, _, staff, lead, _) = seeded_chain(&store);
        store
            .create_follow_up(NewFollowUp {
                lead_id: lead.id,
                staff_id: staff.id,
                followup_date: Utc::now(),
                mode: FollowUpMode::Call,
                remarks: Some("left voicemail".to_string()),
                next_action_date: None,
            })
            .expect("follow-up inserts");

        store.delete_staff(staff.id).expect("staff deletes");

        let lead = store
            .lead(lead.id)
            .expect("lookup")
            .expect("lead still present");
        assert_eq!(lead.assigned_staff, None);
        assert!(store
            .follow_ups_for_lead(lead.id)
            .expect("lookup")
            .is_empty());
    }

    #[test]
    fn deleting_lead_cascades_dependents() {
        let store = MemoryStore::new();
        let (_, _, staff, lead, application) = seeded_chain(&store);
        store
            .create_follow_up(NewFollowUp {
                lead_id: lead.id,
                staff_id: staff.id,
                followup_date: Utc::now(),
                mode: FollowUpMode::Email,
                remarks: None,
                next_action_date: None,
            })
            .expect("follow-up inserts");
        store
            .record_payment(NewPayment {
                lead_id: lead.id,
                application_id: application.id,
                amount: 1_500.0,
                payment_type: PaymentType::ApplicationFee,
                method: PaymentMethod::Esewa,
                transaction_ref_id: "ESW-0001".to_string(),
            })
            .expect("payment inserts");

        store.delete_lead(lead.id).expect("lead deletes");

        assert_eq!(store.application(application.id).expect("lookup"), None);
        assert!(store
            .payments_for_application(application.id)
            .expect("lookup")
            .is_empty());
    }

    #[test]
    fn exam_and_scholarship_are_one_to_one() {
        let store = MemoryStore::new();
        let (_, _, _, _, application) = seeded_chain(&store);
        let exam = store
            .record_exam(NewEntranceExam {
                application_id: application.id,
                exam_date: Utc::now(),
                exam_type: ExamType::Physical,
                score: 72.5,
                result_status: ExamResult::Pass,
            })
            .expect("exam inserts");

        let second = store.record_exam(NewEntranceExam {
            application_id: application.id,
            exam_date: Utc::now(),
            exam_type: ExamType::Online,
            score: 60.0,
            result_status: ExamResult::Pass,
        });
        assert_eq!(second, Err(StoreError::ExamAlreadyRecorded));

        store
            .record_scholarship(NewScholarship {
                exam_id: exam.id,
                kind: ScholarshipKind::Merit,
                percentage_off: 25.0,
            })
            .expect("scholarship inserts");
        let second = store.record_scholarship(NewScholarship {
            exam_id: exam.id,
            kind: ScholarshipKind::Quota,
            percentage_off: 10.0,
        });
        assert_eq!(second, Err(StoreError::ScholarshipAlreadyRecorded));

        store.delete_exam(exam.id).expect("exam deletes");
        assert_eq!(store.scholarship_for_exam(exam.id).expect("lookup"), None);
    }

    #[test]
    fn duplicate_transaction_ref_is_rejected() {
        let store = MemoryStore::new();
        let (_, _, _, lead, application) = seeded_chain(&store);
        let draft = NewPayment {
            lead_id: lead.id,
            application_id: application.id,
            amount: 1_500.0,
            payment_type: PaymentType::ApplicationFee,
            method: PaymentMethod::Khalti,
            transaction_ref_id: "KHL-42".to_string(),
        };
        store.record_payment(draft.clone()).expect("first payment inserts");
        assert_eq!(
            store.record_payment(draft),
            Err(StoreError::DuplicateTransactionRef)
        );
    }

    #[test]
    fn payments_list_most_recent_first() {
        let store = MemoryStore::new();
        let (_, _, _, lead, application) = seeded_chain(&store);
        for reference in ["REF-1", "REF-2", "REF-3"] {
            store
                .record_payment(NewPayment {
                    lead_id: lead.id,
                    application_id: application.id,
                    amount: 500.0,
                    payment_type: PaymentType::SemesterFee,
                    method: PaymentMethod::BankVoucher,
                    transaction_ref_id: reference.to_string(),
                })
                .expect("payment inserts");
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        let payments = store
            .payments_for_application(application.id)
            .expect("lookup");
        assert_eq!(payments[0].transaction_ref_id, "REF-3");
        assert_eq!(payments[2].transaction_ref_id, "REF-1");
    }

    #[test]
    fn concurrent_duplicate_identities_commit_once() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let draft = NewIdentity {
            username: "ravi_k".to_string(),
            email: "ravi@example.com".to_string(),
            password_hash: "salt$digest".to_string(),
        };

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                let draft = draft.clone();
                std::thread::spawn(move || store.create_identity(draft))
            })
            .collect();
        let outcomes: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect();

        let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(outcomes
            .iter()
            .any(|outcome| matches!(outcome, Err(StoreError::DuplicateUsername))));
    }
}
