//! Pending direction requests.
//!
//! Connection tasks write here without touching the world; the tick loop
//! drains everything once per tick.

use protocol::Direction;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Latest direction request per client. A newer request overwrites an older
/// one that has not been consumed yet.
#[derive(Debug, Default)]
pub struct CommandIntake {
    pending: Mutex<HashMap<u32, Direction>>,
}

impl CommandIntake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pending(&self, client_id: u32, dir: Direction) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(client_id, dir);
    }

    /// Take every pending request, leaving the intake empty.
    pub fn consume(&self) -> HashMap<u32, Direction> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Drop a departed client's pending request.
    pub fn forget(&self, client_id: u32) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&client_id);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_request_wins() {
        let intake = CommandIntake::new();
        intake.set_pending(1, Direction::Up);
        intake.set_pending(1, Direction::Left);
        intake.set_pending(2, Direction::Down);
        let drained = intake.consume();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[&1], Direction::Left);
        assert!(intake.is_empty());
        assert!(intake.consume().is_empty());
    }

    #[test]
    fn test_forget() {
        let intake = CommandIntake::new();
        intake.set_pending(3, Direction::Right);
        intake.forget(3);
        intake.forget(4);
        assert!(intake.is_empty());
    }
}
