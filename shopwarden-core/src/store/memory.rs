use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use shopwarden_model::{Session, SessionId};

use crate::error::{PatrolError, Result};
use crate::store::SessionStore;

/// In-process store for tests and runs that don't need durability.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &Session) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| PatrolError::Store("session map poisoned".into()))?;
        if sessions.contains_key(&session.id) {
            return Err(PatrolError::Store(format!(
                "session {} already exists",
                session.id
            )));
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| PatrolError::Store("session map poisoned".into()))?;
        match sessions.get_mut(&session.id) {
            Some(slot) => {
                *slot = session.clone();
                Ok(())
            }
            None => Err(PatrolError::Store(format!(
                "unknown session {}",
                session.id
            ))),
        }
    }

    async fn fetch(&self, id: SessionId) -> Result<Option<Session>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| PatrolError::Store("session map poisoned".into()))?;
        Ok(sessions.get(&id).cloned())
    }
}
