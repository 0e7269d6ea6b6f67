//! In-memory storage for pending challenge sessions
//!
//! Sessions are short-lived (5 minute default) and never persisted. A sharded
//! map keeps contention per key: concurrent ceremonies for different users
//! never wait on each other.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use webauthn_rs::prelude::{PasskeyAuthentication, PasskeyRegistration};

use crate::challenge::Challenge;
use crate::credential::CredentialId;
use crate::error::{CeremonyError, Result};

/// Default lifetime of a pending challenge (5 minutes)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(300);

/// Which ceremony a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl CeremonyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Authentication => "authentication",
        }
    }
}

impl std::fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verifier state saved between `begin` and `finish`
#[derive(Debug)]
pub enum CeremonyState {
    Registration(PasskeyRegistration),
    Authentication(PasskeyAuthentication),
}

impl CeremonyState {
    pub fn kind(&self) -> CeremonyKind {
        match self {
            Self::Registration(_) => CeremonyKind::Registration,
            Self::Authentication(_) => CeremonyKind::Authentication,
        }
    }
}

/// One in-flight ceremony
#[derive(Debug)]
pub struct ChallengeSession {
    pub username: String,
    pub kind: CeremonyKind,
    pub challenge: Challenge,
    pub state: CeremonyState,
    /// Identity the challenge was issued to
    pub user_id: i64,
    /// Credential ids offered in the login allow-list (empty for registration)
    pub allowed_credentials: Vec<CredentialId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

type SessionKey = (String, CeremonyKind);

/// Pending challenges keyed by (username, ceremony kind)
pub struct ChallengeSessionStore {
    sessions: DashMap<SessionKey, ChallengeSession>,
    ttl: chrono::Duration,
}

impl ChallengeSessionStore {
    /// Create a store with the default 5 minute TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Session lifetime in milliseconds, as advertised in options payloads
    pub fn ttl_millis(&self) -> u64 {
        self.ttl.num_milliseconds().max(0) as u64
    }

    /// Build a session for `username` that expires one TTL from now.
    pub fn open(
        &self,
        username: &str,
        challenge: Challenge,
        state: CeremonyState,
        user_id: i64,
    ) -> ChallengeSession {
        let created_at = Utc::now();
        ChallengeSession {
            username: username.to_string(),
            kind: state.kind(),
            challenge,
            state,
            user_id,
            allowed_credentials: Vec::new(),
            created_at,
            expires_at: created_at + self.ttl,
        }
    }

    /// Store a session, replacing any pending one for the same username and
    /// kind. The replaced session is returned.
    pub fn put(&self, session: ChallengeSession) -> Option<ChallengeSession> {
        let key = (session.username.clone(), session.kind);
        self.sessions.insert(key, session)
    }

    /// Atomically remove and return the pending session.
    ///
    /// An expired entry is removed as well and reported as
    /// [`CeremonyError::SessionExpired`].
    pub fn take(&self, username: &str, kind: CeremonyKind) -> Result<ChallengeSession> {
        let (_, session) = self
            .sessions
            .remove(&(username.to_string(), kind))
            .ok_or(CeremonyError::SessionNotFound(kind))?;

        if session.is_expired_at(Utc::now()) {
            return Err(CeremonyError::SessionExpired(kind));
        }
        Ok(session)
    }

    /// Remove expired sessions (called periodically). Returns how many went.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of pending sessions of the given kind
    pub fn count(&self, kind: CeremonyKind) -> usize {
        self.sessions.iter().filter(|e| e.key().1 == kind).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for ChallengeSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChallengeSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeSessionStore")
            .field("registration_sessions", &self.count(CeremonyKind::Registration))
            .field(
                "authentication_sessions",
                &self.count(CeremonyKind::Authentication),
            )
            .field("ttl_millis", &self.ttl_millis())
            .finish()
    }
}
