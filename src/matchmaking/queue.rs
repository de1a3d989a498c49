//! Matchmaking queue implementation

use std::collections::VecDeque;

use crate::game::ConnectionId;

/// FIFO of connections waiting for an opponent
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    queue: VecDeque<ConnectionId>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the back of the queue. A connection that is
    /// already waiting loses its place and rejoins at the back.
    pub fn enqueue(&mut self, connection_id: ConnectionId) {
        self.remove(&connection_id);
        self.queue.push_back(connection_id);
    }

    /// Remove a connection from the queue
    pub fn remove(&mut self, connection_id: &ConnectionId) -> bool {
        if let Some(pos) = self.queue.iter().position(|c| c == connection_id) {
            self.queue.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.queue.contains(connection_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Take the two longest-waiting connections, oldest first
    pub fn try_pair(&mut self) -> Option<(ConnectionId, ConnectionId)> {
        if self.queue.len() < 2 {
            return None;
        }
        let first = self.queue.pop_front()?;
        let second = self.queue.pop_front()?;
        Some((first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn pairs_in_arrival_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut queue = MatchmakingQueue::new();
        assert!(queue.try_pair().is_none());

        queue.enqueue(a);
        assert!(queue.try_pair().is_none());
        assert_eq!(queue.len(), 1);

        queue.enqueue(b);
        queue.enqueue(c);
        assert_eq!(queue.try_pair(), Some((a, b)));
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(&c));
    }

    #[test]
    fn requeue_moves_to_back() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut queue = MatchmakingQueue::new();
        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(a);
        assert_eq!(queue.len(), 2);

        queue.enqueue(c);
        assert_eq!(queue.try_pair(), Some((b, a)));
    }

    #[test]
    fn remove_unknown_is_noop() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut queue = MatchmakingQueue::new();
        queue.enqueue(a);
        assert!(!queue.remove(&b));
        assert!(queue.remove(&a));
        assert_eq!(queue.len(), 0);
        assert!(!queue.remove(&a));
    }
}
