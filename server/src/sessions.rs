use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use chatbot::ChatSession;
use uuid::Uuid;

/// A session locked for the whole of one exchange, so its turns stay paired.
pub type SharedSession = Arc<tokio::sync::Mutex<ChatSession>>;

struct Entry {
    session: SharedSession,
    last_used: Instant,
}

/// Live sessions by slug. Sessions exist from `create` until `remove`, or
/// until they sit unused past the idle limit.
#[derive(Clone, Default)]
pub struct SessionStore(Arc<Mutex<HashMap<Uuid, Entry>>>);

impl SessionStore {
    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self) -> Uuid {
        let session = ChatSession::new();
        let slug = session.slug();
        self.sessions().insert(
            slug,
            Entry {
                session: Arc::new(tokio::sync::Mutex::new(session)),
                last_used: Instant::now(),
            },
        );
        slug
    }

    /// Looks up a session and marks it as used.
    pub fn get(&self, slug: Uuid) -> Option<SharedSession> {
        let mut sessions = self.sessions();
        let entry = sessions.get_mut(&slug)?;
        entry.last_used = Instant::now();
        Some(entry.session.clone())
    }

    pub fn remove(&self, slug: Uuid) -> bool {
        self.sessions().remove(&slug).is_some()
    }

    /// Drops sessions unused for longer than `max_idle`; returns how many.
    pub fn expire_idle(&self, max_idle: Duration) -> usize {
        match Instant::now().checked_sub(max_idle) {
            Some(cutoff) => self.expire_before(cutoff),
            None => 0,
        }
    }

    fn expire_before(&self, cutoff: Instant) -> usize {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_used > cutoff);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}
