//! Credential verification and session management.
//!
//! Per browser session the state machine is `Anonymous -> (valid
//! credentials) -> Authenticated -> (end_session or expiry) -> Anonymous`;
//! there are no intermediate states.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use super::domain::{Identity, IdentityId, NewIdentity};
use super::forms::ValidatedSignup;
use super::store::{IdentityStore, StoreError};

const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 32;

/// Name of the session cookie issued to browsers.
pub const SESSION_COOKIE: &str = "admitdesk_session";

/// Salted password digest stored as `salt$digest`, both segments base64
/// url-safe without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(password: &str) -> Self {
        let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
        Self(Self::encode(&salt, password))
    }

    fn encode(salt: &[u8], password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        let digest = hasher.finalize();
        format!(
            "{}${}",
            URL_SAFE_NO_PAD.encode(salt),
            URL_SAFE_NO_PAD.encode(digest)
        )
    }

    pub fn from_stored(stored: &str) -> Self {
        Self(stored.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recompute the digest with the stored salt and compare. A malformed
    /// stored value never verifies.
    pub fn verify(&self, password: &str) -> bool {
        let Some((salt, _)) = self.0.split_once('$') else {
            return false;
        };
        let Ok(salt) = URL_SAFE_NO_PAD.decode(salt) else {
            return false;
        };
        let candidate = Self::encode(&salt, password);
        // Byte comparison over equal-length digests of the same hash
        // function; length never depends on the submitted password.
        candidate == self.0
    }
}

/// Look up a username and verify the password. Missing user and wrong
/// password are indistinguishable to the caller: when the username is
/// unknown a dummy verification still runs so the two paths do comparable
/// work. The active flag is not consulted here; the login form turns an
/// inactive match into its own outcome.
pub fn authenticate(
    identities: &dyn IdentityStore,
    username: &str,
    password: &str,
) -> Result<Option<Identity>, StoreError> {
    match identities.identity_by_username(username)? {
        Some(identity) => {
            if PasswordHash::from_stored(&identity.password_hash).verify(password) {
                Ok(Some(identity))
            } else {
                Ok(None)
            }
        }
        None => {
            let decoy = PasswordHash::new("decoy");
            let _ = decoy.verify(password);
            Ok(None)
        }
    }
}

/// Hash the validated password and insert the identity. Uniqueness conflicts
/// surface as [`StoreError::DuplicateUsername`] / [`StoreError::DuplicateEmail`]
/// for the form layer to map back onto the signup form.
pub fn register(
    identities: &dyn IdentityStore,
    signup: ValidatedSignup,
) -> Result<Identity, StoreError> {
    identities.create_identity(NewIdentity {
        username: signup.username,
        email: signup.email,
        password_hash: PasswordHash::new(&signup.password).as_str().to_string(),
    })
}

/// Opaque bearer token carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    fn issue() -> Self {
        let mut bytes = [0u8; TOKEN_LEN];
        rand::thread_rng().fill(&mut bytes[..]);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_cookie_value(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An established session. `expires_at` is `None` for browser-session logins
/// (the cookie itself carries no Max-Age and dies with the browser).
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub identity: IdentityId,
    pub persistent: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// In-process session table. The sole long-lived mutable state besides the
/// store itself.
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionToken, Session>>,
    persistent_ttl: Duration,
}

impl SessionManager {
    pub fn new(persistent_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            persistent_ttl,
        }
    }

    /// Exchange a verified identity for a session. `persistent=false` leaves
    /// the server-side entry unexpiring and relies on the browser dropping
    /// the cookie at close; `persistent=true` stamps the configured expiry.
    pub fn establish_session(
        &self,
        identity: IdentityId,
        persistent: bool,
        now: DateTime<Utc>,
    ) -> Session {
        let session = Session {
            token: SessionToken::issue(),
            identity,
            persistent,
            expires_at: persistent.then(|| now + self.persistent_ttl),
        };
        let mut sessions = self.lock();
        sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// Resolve a token to its identity, dropping the entry if it expired.
    pub fn resolve(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<IdentityId> {
        let mut sessions = self.lock();
        match sessions.get(token) {
            Some(session) if session.expires_at.is_some_and(|at| at <= now) => {
                sessions.remove(token);
                None
            }
            Some(session) => Some(session.identity),
            None => None,
        }
    }

    /// Invalidate a session unconditionally. Unknown tokens are a no-op.
    pub fn end_session(&self, token: &SessionToken) {
        self.lock().remove(token);
    }

    pub fn persistent_ttl(&self) -> Duration {
        self.persistent_ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionToken, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Session {
    /// `Set-Cookie` value for this session. Persistent sessions carry a
    /// Max-Age; browser sessions do not, so the cookie dies with the browser.
    pub fn cookie(&self) -> String {
        let base = format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            self.token.as_str()
        );
        match self.expires_at {
            Some(_) => format!(
                "{base}; Max-Age={}",
                // TTL in whole seconds, as handed to the manager.
                self.persistent_max_age()
            ),
            None => base,
        }
    }

    fn persistent_max_age(&self) -> i64 {
        self.expires_at
            .map(|at| (at - Utc::now()).num_seconds().max(0))
            .unwrap_or(0)
    }
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Pull the session token out of a raw `Cookie` request header.
pub fn token_from_cookie_header(header: &str) -> Option<SessionToken> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty())
            .then(|| SessionToken::from_cookie_value(value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips_and_rejects_wrong_password() {
        let hash = PasswordHash::new("Str0ng!pass");
        assert!(hash.verify("Str0ng!pass"));
        assert!(!hash.verify("Str0ng!pas"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn identical_passwords_hash_differently() {
        let first = PasswordHash::new("Str0ng!pass");
        let second = PasswordHash::new("Str0ng!pass");
        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!PasswordHash::from_stored("no-dollar-sign").verify("anything"));
        assert!(!PasswordHash::from_stored("!!!$???").verify("anything"));
    }

    #[test]
    fn browser_session_has_no_expiry_or_max_age() {
        let manager = SessionManager::new(Duration::hours(336));
        let session = manager.establish_session(IdentityId(1), false, Utc::now());
        assert_eq!(session.expires_at, None);
        assert!(!session.cookie().contains("Max-Age"));
    }

    #[test]
    fn persistent_session_expires_after_ttl() {
        let manager = SessionManager::new(Duration::hours(2));
        let now = Utc::now();
        let session = manager.establish_session(IdentityId(1), true, now);
        assert!(session.cookie().contains("Max-Age"));

        assert_eq!(
            manager.resolve(&session.token, now + Duration::hours(1)),
            Some(IdentityId(1))
        );
        assert_eq!(
            manager.resolve(&session.token, now + Duration::hours(3)),
            None
        );
        // Expired entries are dropped, not just hidden.
        assert_eq!(manager.resolve(&session.token, now), None);
    }

    #[test]
    fn end_session_is_unconditional() {
        let manager = SessionManager::new(Duration::hours(2));
        let now = Utc::now();
        let session = manager.establish_session(IdentityId(7), true, now);
        manager.end_session(&session.token);
        assert_eq!(manager.resolve(&session.token, now), None);

        // Ending an unknown token is fine.
        manager.end_session(&SessionToken::from_cookie_value("ghost"));
    }

    #[test]
    fn cookie_header_parsing() {
        let session = SessionManager::new(Duration::hours(1)).establish_session(
            IdentityId(1),
            false,
            Utc::now(),
        );
        let header = format!("theme=dark; {}; lang=en", session.cookie());
        let token = token_from_cookie_header(&header).expect("token parses");
        assert_eq!(token, session.token);

        assert_eq!(token_from_cookie_header("theme=dark"), None);
        assert_eq!(
            token_from_cookie_header(&format!("{SESSION_COOKIE}=")),
            None
        );
    }
}
