use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Remembers every (message, user) pair that has already triggered a
/// translation in this process.
///
/// Entries are never evicted, so the set grows for the life of the process.
#[derive(Debug, Default)]
pub struct DedupGuard {
    claimed: Mutex<HashSet<(String, String)>>,
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a pair. Returns `true` the first time and `false` on every
    /// later call, however the calls interleave.
    pub fn try_claim(&self, message_id: &str, user_id: &str) -> bool {
        let claimed = self
            .claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((message_id.to_string(), user_id.to_string()));

        if !claimed {
            debug!(
                "Duplicate trigger for message {} by user {}",
                message_id, user_id
            );
        }
        claimed
    }

    pub fn len(&self) -> usize {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
