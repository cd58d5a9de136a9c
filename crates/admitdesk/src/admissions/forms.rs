//! Login and signup form validation.
//!
//! Field-level checks run independently per field and collect into a single
//! [`FormErrors`] set so the caller can surface every actionable message at
//! once; an empty field short-circuits only that field's downstream checks.
//! Cross-field checks (credential verification, password confirmation) run
//! only after every individual field has passed.

use super::auth;
use super::domain::Identity;
use super::store::{IdentityStore, StoreError};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// The fixed punctuation set a password must draw at least one symbol from.
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Character class a weak password is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordClass {
    Uppercase,
    Lowercase,
    Digit,
    Symbol,
}

impl PasswordClass {
    fn describe(self) -> &'static str {
        match self {
            PasswordClass::Uppercase => "one uppercase letter",
            PasswordClass::Lowercase => "one lowercase letter",
            PasswordClass::Digit => "one number",
            PasswordClass::Symbol => "one special character (!@#$%^&*(),.?\":{}|<>)",
        }
    }
}

/// A single validation failure, tied to a field by [`FormErrors`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("cannot be empty or contain only spaces")]
    EmptyInput,
    #[error("must be at least {min} characters long")]
    TooShort { min: usize },
    #[error("cannot exceed {max} characters")]
    TooLong { max: usize },
    #[error("can only contain letters, numbers, underscores, and hyphens")]
    InvalidCharacters,
    #[error("must start with a letter")]
    InvalidFormat,
    #[error("enter a valid email address")]
    InvalidEmail,
    #[error("this username is already taken, please choose another")]
    DuplicateUsername,
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error("must contain at least {}", .0.describe())]
    WeakPassword(PasswordClass),
    #[error("passwords do not match, please try again")]
    PasswordMismatch,
    #[error("invalid username or password, please try again")]
    InvalidCredentials,
    #[error("this account has been disabled")]
    AccountDisabled,
}

/// Ordered field -> error collection. Every entry maps to one user-visible
/// message; nothing is dropped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormErrors {
    entries: Vec<(&'static str, FieldError)>,
}

impl FormErrors {
    pub fn push(&mut self, field: &'static str, error: FieldError) {
        self.entries.push((field, error));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, FieldError)> {
        self.entries.iter()
    }

    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> {
        self.entries
            .iter()
            .filter(move |(name, _)| *name == field)
            .map(|(_, error)| error)
    }

    pub fn contains(&self, field: &str, error: &FieldError) -> bool {
        self.for_field(field).any(|candidate| candidate == error)
    }

    /// User-visible messages, one per failure, in collection order.
    pub fn messages(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(field, error)| format!("{}: {}", field.replace('_', " "), error))
            .collect()
    }
}

/// Raw login submission.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
}

/// Outcome of a successful login validation: the verified identity plus the
/// persistence choice, ready for the caller to establish a session.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    pub identity: Identity,
    pub remember_me: bool,
}

impl LoginForm {
    /// Validate fields, then verify credentials against the store. Missing
    /// user and wrong password both surface as `InvalidCredentials`; an
    /// inactive match surfaces as `AccountDisabled`.
    pub fn validate(
        &self,
        identities: &dyn IdentityStore,
    ) -> Result<VerifiedLogin, FormErrors> {
        let mut errors = FormErrors::default();

        let username = self.username.trim();
        if username.is_empty() {
            errors.push("username", FieldError::EmptyInput);
        } else if username.chars().count() > USERNAME_MAX_LEN {
            errors.push(
                "username",
                FieldError::TooLong {
                    max: USERNAME_MAX_LEN,
                },
            );
        }

        if self.password.is_empty() {
            errors.push("password", FieldError::EmptyInput);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        match auth::authenticate(identities, username, &self.password) {
            Ok(Some(identity)) if identity.is_active => Ok(VerifiedLogin {
                identity,
                remember_me: self.remember_me,
            }),
            Ok(Some(_)) => {
                errors.push("username", FieldError::AccountDisabled);
                Err(errors)
            }
            Ok(None) => {
                errors.push("username", FieldError::InvalidCredentials);
                Err(errors)
            }
            Err(_) => {
                errors.push("username", FieldError::InvalidCredentials);
                Err(errors)
            }
        }
    }
}

/// Raw signup submission.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// Cleaned signup values accepted by validation. The password is still plain
/// here; [`auth::register`] hashes it on the way into the store.
#[derive(Debug, Clone)]
pub struct ValidatedSignup {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(
        &self,
        identities: &dyn IdentityStore,
    ) -> Result<ValidatedSignup, FormErrors> {
        let mut errors = FormErrors::default();

        let username = self.validate_username(identities, &mut errors);
        let email = self.validate_email(identities, &mut errors);
        let password_ok = self.validate_password(&mut errors);
        let confirm_ok = if self.password2.is_empty() {
            errors.push("password2", FieldError::EmptyInput);
            false
        } else {
            true
        };

        // Cross-field check only once both password fields passed on their own.
        if password_ok && confirm_ok && self.password1 != self.password2 {
            errors.push("password2", FieldError::PasswordMismatch);
        }

        match (username, email, errors.is_empty()) {
            (Some(username), Some(email), true) => Ok(ValidatedSignup {
                username,
                email,
                password: self.password1.clone(),
            }),
            _ => Err(errors),
        }
    }

    fn validate_username(
        &self,
        identities: &dyn IdentityStore,
        errors: &mut FormErrors,
    ) -> Option<String> {
        let username = self.username.trim();
        if username.is_empty() {
            errors.push("username", FieldError::EmptyInput);
            return None;
        }
        let length = username.chars().count();
        if length < USERNAME_MIN_LEN {
            errors.push(
                "username",
                FieldError::TooShort {
                    min: USERNAME_MIN_LEN,
                },
            );
            return None;
        }
        if length > USERNAME_MAX_LEN {
            errors.push(
                "username",
                FieldError::TooLong {
                    max: USERNAME_MAX_LEN,
                },
            );
            return None;
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            errors.push("username", FieldError::InvalidCharacters);
            return None;
        }
        if !username
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        {
            errors.push("username", FieldError::InvalidFormat);
            return None;
        }
        match identities.username_taken(username) {
            Ok(true) => {
                errors.push("username", FieldError::DuplicateUsername);
                None
            }
            Ok(false) => Some(username.to_string()),
            Err(_) => {
                errors.push("username", FieldError::DuplicateUsername);
                None
            }
        }
    }

    fn validate_email(
        &self,
        identities: &dyn IdentityStore,
        errors: &mut FormErrors,
    ) -> Option<String> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() {
            errors.push("email", FieldError::EmptyInput);
            return None;
        }
        if !plausible_email(&email) {
            errors.push("email", FieldError::InvalidEmail);
            return None;
        }
        match identities.email_taken(&email) {
            Ok(true) => {
                errors.push("email", FieldError::DuplicateEmail);
                None
            }
            Ok(false) => Some(email),
            Err(_) => {
                errors.push("email", FieldError::DuplicateEmail);
                None
            }
        }
    }

    fn validate_password(&self, errors: &mut FormErrors) -> bool {
        let password = &self.password1;
        if password.is_empty() {
            errors.push("password1", FieldError::EmptyInput);
            return false;
        }
        if password.chars().count() < PASSWORD_MIN_LEN {
            errors.push(
                "password1",
                FieldError::TooShort {
                    min: PASSWORD_MIN_LEN,
                },
            );
            return false;
        }

        let before = errors.len();
        for (class, present) in [
            (
                PasswordClass::Uppercase,
                password.chars().any(|c| c.is_ascii_uppercase()),
            ),
            (
                PasswordClass::Lowercase,
                password.chars().any(|c| c.is_ascii_lowercase()),
            ),
            (
                PasswordClass::Digit,
                password.chars().any(|c| c.is_ascii_digit()),
            ),
            (
                PasswordClass::Symbol,
                password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)),
            ),
        ] {
            if !present {
                errors.push("password1", FieldError::WeakPassword(class));
            }
        }
        errors.len() == before
    }
}

/// Map a commit-time uniqueness conflict back onto the form so a lost race
/// reads exactly like the validation-layer duplicate (never a storage fault).
pub fn signup_conflict(error: StoreError) -> FormErrors {
    let mut errors = FormErrors::default();
    match error {
        StoreError::DuplicateUsername => errors.push("username", FieldError::DuplicateUsername),
        StoreError::DuplicateEmail => errors.push("email", FieldError::DuplicateEmail),
        // Anything else from the identity table during signup is unexpected;
        // keep it user-visible rather than dropping it.
        _ => errors.push("username", FieldError::DuplicateUsername),
    }
    errors
}

fn plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((head, tail)) = domain.rsplit_once('.') else {
        return false;
    };
    !head.is_empty() && tail.len() >= 2 && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::auth;
    use crate::admissions::store::MemoryStore;

    fn signup(username: &str, email: &str, password: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            email: email.to_string(),
            password1: password.to_string(),
            password2: password.to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_signup() {
        let store = MemoryStore::new();
        let form = signup("maya-gurung_1", "Maya@Example.COM", "Str0ng!pass");
        let cleaned = form.validate(&store).expect("signup validates");
        assert_eq!(cleaned.username, "maya-gurung_1");
        assert_eq!(cleaned.email, "maya@example.com");
    }

    #[test]
    fn rejects_username_starting_with_digit() {
        let store = MemoryStore::new();
        let errors = signup("1abc", "a@b.com", "Str0ng!pass")
            .validate(&store)
            .expect_err("digit-led username fails");
        assert!(errors.contains("username", &FieldError::InvalidFormat));
    }

    #[test]
    fn rejects_short_username_with_length_error() {
        let store = MemoryStore::new();
        let errors = signup("ab", "a@b.com", "Str0ng!pass")
            .validate(&store)
            .expect_err("two-char username fails");
        assert!(errors.contains("username", &FieldError::TooShort { min: 3 }));
    }

    #[test]
    fn rejects_illegal_username_characters() {
        let store = MemoryStore::new();
        let errors = signup("maya gurung", "a@b.com", "Str0ng!pass")
            .validate(&store)
            .expect_err("space fails");
        assert!(errors.contains("username", &FieldError::InvalidCharacters));
    }

    #[test]
    fn whitespace_only_username_is_empty_input() {
        let store = MemoryStore::new();
        let errors = signup("   ", "a@b.com", "Str0ng!pass")
            .validate(&store)
            .expect_err("blank fails");
        assert!(errors.contains("username", &FieldError::EmptyInput));
        // Emptiness short-circuits the rest of the username pipeline.
        assert_eq!(errors.for_field("username").count(), 1);
    }

    #[test]
    fn password_class_matrix() {
        let store = MemoryStore::new();

        let errors = signup("maya", "a@b.com", "Password1")
            .validate(&store)
            .expect_err("no symbol fails");
        assert!(errors.contains(
            "password1",
            &FieldError::WeakPassword(PasswordClass::Symbol)
        ));

        let errors = signup("maya", "a@b.com", "password1!")
            .validate(&store)
            .expect_err("no uppercase fails");
        assert!(errors.contains(
            "password1",
            &FieldError::WeakPassword(PasswordClass::Uppercase)
        ));

        let errors = signup("maya", "a@b.com", "PASSWORD1!")
            .validate(&store)
            .expect_err("no lowercase fails");
        assert!(errors.contains(
            "password1",
            &FieldError::WeakPassword(PasswordClass::Lowercase)
        ));

        let store = MemoryStore::new();
        assert!(signup("maya", "a@b.com", "Password1!")
            .validate(&store)
            .is_ok());
    }

    #[test]
    fn every_missing_class_is_reported() {
        let store = MemoryStore::new();
        let errors = signup("maya", "a@b.com", "aaaaaaaa")
            .validate(&store)
            .expect_err("single-class password fails");
        assert_eq!(errors.for_field("password1").count(), 3);
    }

    #[test]
    fn independent_fields_all_collect() {
        let store = MemoryStore::new();
        let form = SignupForm {
            username: "1x".to_string(),
            email: "not-an-email".to_string(),
            password1: "short".to_string(),
            password2: "different".to_string(),
        };
        let errors = form.validate(&store).expect_err("everything fails");
        assert!(errors.for_field("username").count() >= 1);
        assert!(errors.contains("email", &FieldError::InvalidEmail));
        assert!(errors.contains("password1", &FieldError::TooShort { min: 8 }));
        // Mismatch is suppressed while password1 itself is invalid.
        assert!(!errors.contains("password2", &FieldError::PasswordMismatch));
    }

    #[test]
    fn password_mismatch_only_after_fields_pass() {
        let store = MemoryStore::new();
        let form = SignupForm {
            username: "maya".to_string(),
            email: "a@b.com".to_string(),
            password1: "Str0ng!pass".to_string(),
            password2: "Str0ng!pass2".to_string(),
        };
        let errors = form.validate(&store).expect_err("mismatch fails");
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("password2", &FieldError::PasswordMismatch));
    }

    #[test]
    fn duplicate_username_and_email_are_reported() {
        let store = MemoryStore::new();
        auth::register(
            &store,
            ValidatedSignup {
                username: "maya".to_string(),
                email: "maya@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
            },
        )
        .expect("first registration succeeds");

        let errors = signup("maya", "other@example.com", "Str0ng!pass")
            .validate(&store)
            .expect_err("duplicate username fails");
        assert!(errors.contains("username", &FieldError::DuplicateUsername));

        let errors = signup("other", "maya@example.com", "Str0ng!pass")
            .validate(&store)
            .expect_err("duplicate email fails");
        assert!(errors.contains("email", &FieldError::DuplicateEmail));
    }

    #[test]
    fn login_collapses_missing_user_and_wrong_password() {
        let store = MemoryStore::new();
        auth::register(
            &store,
            ValidatedSignup {
                username: "maya".to_string(),
                email: "maya@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
            },
        )
        .expect("registration succeeds");

        let wrong_password = LoginForm {
            username: "maya".to_string(),
            password: "Wr0ng!pass".to_string(),
            remember_me: false,
        }
        .validate(&store)
        .expect_err("wrong password fails");

        let missing_user = LoginForm {
            username: "nobody".to_string(),
            password: "Str0ng!pass".to_string(),
            remember_me: false,
        }
        .validate(&store)
        .expect_err("missing user fails");

        assert_eq!(wrong_password, missing_user);
        assert!(wrong_password.contains("username", &FieldError::InvalidCredentials));
    }

    #[test]
    fn disabled_account_is_reported_distinctly() {
        let store = MemoryStore::new();
        let identity = auth::register(
            &store,
            ValidatedSignup {
                username: "maya".to_string(),
                email: "maya@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
            },
        )
        .expect("registration succeeds");
        store
            .set_active(identity.id, false)
            .expect("account disables");

        let errors = LoginForm {
            username: "maya".to_string(),
            password: "Str0ng!pass".to_string(),
            remember_me: false,
        }
        .validate(&store)
        .expect_err("disabled account fails");
        assert!(errors.contains("username", &FieldError::AccountDisabled));
    }

    #[test]
    fn login_trims_username_and_requires_both_fields() {
        let store = MemoryStore::new();
        auth::register(
            &store,
            ValidatedSignup {
                username: "maya".to_string(),
                email: "maya@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
            },
        )
        .expect("registration succeeds");

        let verified = LoginForm {
            username: "  maya  ".to_string(),
            password: "Str0ng!pass".to_string(),
            remember_me: true,
        }
        .validate(&store)
        .expect("trimmed username logs in");
        assert!(verified.remember_me);

        let errors = LoginForm::default()
            .validate(&store)
            .expect_err("empty form fails");
        assert!(errors.contains("username", &FieldError::EmptyInput));
        assert!(errors.contains("password", &FieldError::EmptyInput));
    }

    #[test]
    fn email_syntax_checks() {
        assert!(plausible_email("a@b.co"));
        assert!(plausible_email("first.last@sub.domain.org"));
        assert!(!plausible_email("no-at-sign"));
        assert!(!plausible_email("@missing-local.com"));
        assert!(!plausible_email("two@@ats.com"));
        assert!(!plausible_email("spaces in@mail.com"));
        assert!(!plausible_email("nodot@domain"));
        assert!(!plausible_email("trailing@domain."));
    }
}
