//! Per-session human verification codes.
//!
//! This is a presentation-layer speed bump, not a credential: a random
//! 4-digit number the user has to type back before a transaction is
//! analysed. The risk evaluator never sees it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("unknown or expired session")]
    UnknownSession,

    #[error("incorrect security code")]
    Mismatch,
}

/// Freshly issued session.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCode {
    pub session_id: Uuid,
    pub code: String,
}

#[derive(Debug, Clone)]
struct Entry {
    code: String,
    touched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VerificationStore {
    inner: Arc<Mutex<HashMap<Uuid, Entry>>>,
    ttl: Duration,
}

fn random_code() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

impl VerificationStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000)),
        }
    }

    /// Start a new session with its own code. Expired sessions are dropped.
    pub async fn issue(&self) -> IssuedCode {
        let now = Utc::now();
        let mut sessions = self.inner.lock().await;

        let ttl = self.ttl;
        let before = sessions.len();
        sessions.retain(|_, e| now - e.touched_at <= ttl);
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Expired verification sessions removed");
        }

        let session_id = Uuid::new_v4();
        let code = random_code();
        sessions.insert(
            session_id,
            Entry {
                code: code.clone(),
                touched_at: now,
            },
        );

        IssuedCode { session_id, code }
    }

    /// Current code for a live session.
    pub async fn current(&self, session_id: Uuid) -> Option<String> {
        let sessions = self.inner.lock().await;
        sessions
            .get(&session_id)
            .filter(|e| !self.is_expired(e))
            .map(|e| e.code.clone())
    }

    /// Replace the session's code with a new random one.
    pub async fn regenerate(&self, session_id: Uuid) -> Result<String, VerificationError> {
        let mut sessions = self.inner.lock().await;
        let entry = sessions
            .get_mut(&session_id)
            .filter(|e| Utc::now() - e.touched_at <= self.ttl)
            .ok_or(VerificationError::UnknownSession)?;

        entry.code = random_code();
        entry.touched_at = Utc::now();
        Ok(entry.code.clone())
    }

    /// Check a user-entered code. Surrounding whitespace is ignored.
    pub async fn verify(&self, session_id: Uuid, input: &str) -> Result<(), VerificationError> {
        let sessions = self.inner.lock().await;
        let result = match sessions.get(&session_id) {
            Some(e) if self.is_expired(e) => Err(VerificationError::UnknownSession),
            Some(e) if e.code == input.trim() => Ok(()),
            Some(_) => Err(VerificationError::Mismatch),
            None => Err(VerificationError::UnknownSession),
        };

        if let Err(e) = &result {
            counter!("verification_failures_total").increment(1);
            tracing::debug!(session = %session_id, error = %e, "Verification failed");
        }
        result
    }

    /// Check the code and, if it matches, replace it in the same critical
    /// section. Returns the code for the next submission.
    pub async fn verify_and_rotate(
        &self,
        session_id: Uuid,
        input: &str,
    ) -> Result<String, VerificationError> {
        let mut sessions = self.inner.lock().await;
        let result = match sessions.get_mut(&session_id) {
            Some(e) if Utc::now() - e.touched_at > self.ttl => Err(VerificationError::UnknownSession),
            Some(e) if e.code == input.trim() => {
                e.code = random_code();
                e.touched_at = Utc::now();
                Ok(e.code.clone())
            }
            Some(_) => Err(VerificationError::Mismatch),
            None => Err(VerificationError::UnknownSession),
        };

        if let Err(e) = &result {
            counter!("verification_failures_total").increment(1);
            tracing::debug!(session = %session_id, error = %e, "Verification failed");
        }
        result
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        Utc::now() - entry.touched_at > self.ttl
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    #[cfg(test)]
    async fn backdate(&self, session_id: Uuid, by: Duration) {
        if let Some(e) = self.inner.lock().await.get_mut(&session_id) {
            e.touched_at = e.touched_at - by;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_four_digits() {
        for _ in 0..1000 {
            let code = random_code();
            let n: u32 = code.parse().unwrap();
            assert_eq!(code.len(), 4);
            assert!((1000..=9999).contains(&n));
        }
    }

    #[tokio::test]
    async fn test_verify_matching_code() {
        let store = VerificationStore::new(3600);
        let issued = store.issue().await;

        assert_eq!(store.verify(issued.session_id, &issued.code).await, Ok(()));
        let padded = format!("  {}\n", issued.code);
        assert_eq!(store.verify(issued.session_id, &padded).await, Ok(()));
    }

    #[tokio::test]
    async fn test_verify_wrong_code() {
        let store = VerificationStore::new(3600);
        let issued = store.issue().await;

        assert_eq!(
            store.verify(issued.session_id, "12345").await,
            Err(VerificationError::Mismatch)
        );
        assert_eq!(
            store.verify(issued.session_id, "").await,
            Err(VerificationError::Mismatch)
        );
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = VerificationStore::new(3600);
        assert_eq!(
            store.verify(Uuid::new_v4(), "1234").await,
            Err(VerificationError::UnknownSession)
        );
        assert_eq!(
            store.regenerate(Uuid::new_v4()).await,
            Err(VerificationError::UnknownSession)
        );
    }

    #[tokio::test]
    async fn test_regenerate_replaces_code() {
        let store = VerificationStore::new(3600);
        let issued = store.issue().await;

        let fresh = store.regenerate(issued.session_id).await.unwrap();
        assert_eq!(store.current(issued.session_id).await, Some(fresh.clone()));
        assert_eq!(store.verify(issued.session_id, &fresh).await, Ok(()));
    }

    #[tokio::test]
    async fn test_verify_and_rotate() {
        let store = VerificationStore::new(3600);
        let issued = store.issue().await;

        assert_eq!(
            store.verify_and_rotate(issued.session_id, "0000").await,
            Err(VerificationError::Mismatch)
        );
        assert_eq!(store.current(issued.session_id).await, Some(issued.code.clone()));

        let next = store.verify_and_rotate(issued.session_id, &issued.code).await.unwrap();
        assert_eq!(store.current(issued.session_id).await, Some(next.clone()));
        assert_eq!(store.verify_and_rotate(issued.session_id, &next).await.map(|c| c.len()), Ok(4));
    }

    #[tokio::test]
    async fn test_verify_and_rotate_expired() {
        let store = VerificationStore::new(60);
        let issued = store.issue().await;
        store.backdate(issued.session_id, Duration::seconds(61)).await;

        assert_eq!(
            store.verify_and_rotate(issued.session_id, &issued.code).await,
            Err(VerificationError::UnknownSession)
        );
    }

    #[tokio::test]
    async fn test_expired_session_rejected_and_pruned() {
        let store = VerificationStore::new(60);
        let old = store.issue().await;
        store.backdate(old.session_id, Duration::seconds(120)).await;

        assert_eq!(
            store.verify(old.session_id, &old.code).await,
            Err(VerificationError::UnknownSession)
        );
        assert_eq!(store.current(old.session_id).await, None);

        store.issue().await;
        assert_eq!(store.len().await, 1);
    }
}
