use std::collections::HashSet;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ApiError;

/// At most one pending request per (session, action, resource).
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

/// Holds the slot; dropping it releases the slot, on success or error.
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

fn slot_key(session: &str, action: &str, resource: &dyn Display) -> String {
    format!("{session}:{action}:{resource}")
}

fn lock(keys: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    // A panic while holding the lock leaves the set itself consistent.
    keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InFlight {
    pub fn try_begin(
        &self,
        session: &str,
        action: &str,
        resource: impl Display,
    ) -> Result<InFlightGuard, ApiError> {
        let key = slot_key(session, action, &resource);
        if !lock(&self.keys).insert(key.clone()) {
            tracing::info!(session, action, %resource, "duplicate request while one is in flight");
            return Err(ApiError::in_flight());
        }
        Ok(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.keys).len()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}
