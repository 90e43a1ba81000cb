/// Session registry (spec S3): session id -> session record, guarded by a
/// single mutex. Insert/remove acquire the write path; stats iteration
/// and shutdown sweep acquire the read path via `snapshot`.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::session::Session;

#[derive(Clone)]
pub struct Registry {
    inner: Arc<Mutex<HashMap<String, Arc<Session>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn insert(&self, session: Arc<Session>) {
        self.inner.lock().unwrap().insert(session.id.clone(), session);
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.inner.lock().unwrap().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.inner.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every live session, for stats aggregation or the
    /// shutdown sweep (spec S3 "iteration is only for stats and shutdown").
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.inner.lock().unwrap().values().cloned().collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
