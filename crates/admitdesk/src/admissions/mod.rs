//! Admissions-office domain: entity schema, storage, form validation, and
//! the authentication gate.

pub mod auth;
pub mod domain;
pub mod forms;
pub mod store;

pub use auth::{PasswordHash, Session, SessionManager, SessionToken};
pub use forms::{FieldError, FormErrors, LoginForm, SignupForm};
pub use store::{AdmissionsStore, IdentityStore, MemoryStore, StoreError};
