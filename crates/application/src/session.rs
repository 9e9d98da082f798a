//! Values shared between the steps of a suite.
//!
//! A slot is written at most once, by the case that captured it, and only
//! after that case passed. Later steps read it while building their requests.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

/// Misuse of a session slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The slot already holds a value.
    #[error("session slot {0:?} was already written")]
    AlreadyWritten(String),

    /// The slot was read before any case wrote it.
    #[error("session slot {0:?} has not been written")]
    Unset(String),
}

/// Write-once named slots shared by every chain of a run.
#[derive(Debug, Default)]
pub struct SessionContext {
    slots: RwLock<HashMap<String, String>>,
}

impl SessionContext {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyWritten`] if the slot is taken.
    pub fn write(&self, slot: &str, value: impl Into<String>) -> Result<(), SessionError> {
        let mut slots = self.slots.write();
        if slots.contains_key(slot) {
            return Err(SessionError::AlreadyWritten(slot.to_string()));
        }
        slots.insert(slot.to_string(), value.into());
        Ok(())
    }

    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Unset`] if nothing was written to the slot.
    pub fn read(&self, slot: &str) -> Result<String, SessionError> {
        self.slots
            .read()
            .get(slot)
            .cloned()
            .ok_or_else(|| SessionError::Unset(slot.to_string()))
    }

    /// Whether the slot holds a value.
    #[must_use]
    pub fn contains(&self, slot: &str) -> bool {
        self.slots.read().contains_key(slot)
    }

    /// Number of written slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether no slot has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_write_once() {
        let session = SessionContext::new();
        session.write("etag", "\"abc\"").unwrap();
        assert_eq!(session.read("etag").unwrap(), "\"abc\"");
        assert_eq!(
            session.write("etag", "\"def\"").unwrap_err(),
            SessionError::AlreadyWritten("etag".to_string())
        );
        assert_eq!(session.read("etag").unwrap(), "\"abc\"");
    }

    #[test]
    fn test_unset_read_fails() {
        let session = SessionContext::new();
        assert!(session.is_empty());
        assert_eq!(
            session.read("missing").unwrap_err(),
            SessionError::Unset("missing".to_string())
        );
    }

    #[test]
    fn test_concurrent_writers_one_wins() {
        let session = Arc::new(SessionContext::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || session.write("slot", i.to_string()).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(session.len(), 1);
    }
}
