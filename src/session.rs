//! Session table: which client owns which in-flight correlation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::command::{CorrelationId, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session {0} is not open")]
    NotOpen(SessionId),
    #[error("The default session cannot be closed")]
    DefaultSession,
    #[error("Correlation id {0} is already in flight")]
    DuplicateCorrelation(CorrelationId),
}

#[derive(Debug)]
struct Session {
    created_at: DateTime<Utc>,
    pending: IndexSet<CorrelationId>,
}

impl Session {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            pending: IndexSet::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<SessionId, Session>,
    /// Reverse index; keeps each correlation in at most one pending set.
    owners: HashMap<CorrelationId, SessionId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub pending: usize,
}

/// Active sessions. The default session (empty id) always exists.
#[derive(Debug)]
pub struct SessionTable {
    inner: Mutex<Tables>,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTable {
    pub fn new() -> Self {
        let mut tables = Tables::default();
        tables
            .sessions
            .insert(SessionId::default_session(), Session::new());
        Self {
            inner: Mutex::new(tables),
        }
    }

    pub fn open(&self) -> SessionId {
        let id = SessionId::new(Uuid::new_v4().to_string());
        self.inner.lock().sessions.insert(id.clone(), Session::new());
        info!(session = %id, "session opened");
        id
    }

    /// Remove a session and return the correlations that were still pending
    /// on it. The caller is responsible for failing them.
    pub fn close(&self, id: &SessionId) -> Result<Vec<CorrelationId>, SessionError> {
        if id.is_default() {
            return Err(SessionError::DefaultSession);
        }
        let mut guard = self.inner.lock();
        let tables = &mut *guard;
        let session = tables
            .sessions
            .remove(id)
            .ok_or_else(|| SessionError::NotOpen(id.clone()))?;
        for cid in &session.pending {
            tables.owners.remove(cid);
        }
        let pending: Vec<CorrelationId> = session.pending.into_iter().collect();
        info!(session = %id, pending = pending.len(), "session closed");
        Ok(pending)
    }

    pub fn track(&self, id: &SessionId, cid: &CorrelationId) -> Result<(), SessionError> {
        let mut guard = self.inner.lock();
        let tables = &mut *guard;
        if tables.owners.contains_key(cid) {
            return Err(SessionError::DuplicateCorrelation(cid.clone()));
        }
        let session = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotOpen(id.clone()))?;
        session.pending.insert(cid.clone());
        tables.owners.insert(cid.clone(), id.clone());
        Ok(())
    }

    /// Forget a correlation. Untracking something already gone is a no-op.
    pub fn untrack(&self, id: &SessionId, cid: &CorrelationId) {
        let mut guard = self.inner.lock();
        let tables = &mut *guard;
        if tables.owners.get(cid) != Some(id) {
            return;
        }
        tables.owners.remove(cid);
        if let Some(session) = tables.sessions.get_mut(id) {
            session.pending.shift_remove(cid);
        }
    }

    pub fn is_open(&self, id: &SessionId) -> bool {
        self.inner.lock().sessions.contains_key(id)
    }

    pub fn is_tracked(&self, cid: &CorrelationId) -> bool {
        self.inner.lock().owners.contains_key(cid)
    }

    /// Number of sessions, including the default one.
    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<SessionSummary> {
        let tables = self.inner.lock();
        let mut out: Vec<SessionSummary> = tables
            .sessions
            .iter()
            .map(|(id, s)| SessionSummary {
                id: id.clone(),
                created_at: s.created_at,
                pending: s.pending.len(),
            })
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.as_str().cmp(b.id.as_str())));
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn cid(s: &str) -> CorrelationId {
        CorrelationId::parse(s).unwrap()
    }

    #[test]
    fn default_session_always_exists() {
        let table = SessionTable::new();
        assert!(table.is_open(&SessionId::default_session()));
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.close(&SessionId::default_session()),
            Err(SessionError::DefaultSession)
        );
    }

    #[test]
    fn close_returns_pending_and_removes() {
        let table = SessionTable::new();
        let id = table.open();
        table.track(&id, &cid("a")).unwrap();
        table.track(&id, &cid("b")).unwrap();
        table.untrack(&id, &cid("a"));

        let pending = table.close(&id).unwrap();
        assert_eq!(pending, vec![cid("b")]);
        assert!(!table.is_open(&id));
        assert!(!table.is_tracked(&cid("b")));
        assert_eq!(table.close(&id), Err(SessionError::NotOpen(id)));
    }

    #[test]
    fn correlation_belongs_to_one_session() {
        let table = SessionTable::new();
        let a = table.open();
        let b = table.open();
        table.track(&a, &cid("x")).unwrap();
        assert_eq!(
            table.track(&b, &cid("x")),
            Err(SessionError::DuplicateCorrelation(cid("x")))
        );
        // Untracking from the wrong session leaves the owner intact.
        table.untrack(&b, &cid("x"));
        assert!(table.is_tracked(&cid("x")));
    }

    #[test]
    fn track_on_unknown_session_fails() {
        let table = SessionTable::new();
        let ghost = SessionId::new("ghost");
        assert_eq!(
            table.track(&ghost, &cid("x")),
            Err(SessionError::NotOpen(ghost))
        );
    }

    #[test]
    fn snapshot_counts_pending() {
        let table = SessionTable::new();
        let id = table.open();
        table.track(&id, &cid("x")).unwrap();
        let snap = table.snapshot();
        assert_eq!(snap.len(), 2);
        let entry = snap.iter().find(|s| s.id == id).unwrap();
        assert_eq!(entry.pending, 1);
    }
}
