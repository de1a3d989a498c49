//! Matchmaking service - owns the queue, the match registry and every
//! connection's outbound channel, driven by commands from the sockets

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::{ConnectionId, ConnectionTx, GameMatch, Intent, MatchRegistry, Side};
use crate::ws::protocol::ServerMsg;

use super::queue::MatchmakingQueue;

/// Commands accepted by the lobby task
#[derive(Debug)]
pub enum LobbyCommand {
    Connect {
        connection_id: ConnectionId,
        tx: ConnectionTx,
    },
    FindMatch {
        connection_id: ConnectionId,
    },
    Input {
        connection_id: ConnectionId,
        intent: Intent,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Stats {
        reply: oneshot::Sender<LobbyStats>,
    },
    /// Close every match and stop the lobby
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Point-in-time lobby counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LobbyStats {
    pub connections: usize,
    pub queue_size: usize,
    pub active_matches: usize,
    pub players_in_matches: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("Lobby is not running")]
    Closed,
}

/// Cloneable sender side of the lobby
#[derive(Clone)]
pub struct LobbyHandle {
    tx: mpsc::UnboundedSender<LobbyCommand>,
}

impl LobbyHandle {
    pub fn connect(&self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.send(LobbyCommand::Connect { connection_id, tx });
    }

    pub fn find_match(&self, connection_id: ConnectionId) {
        self.send(LobbyCommand::FindMatch { connection_id });
    }

    pub fn input(&self, connection_id: ConnectionId, intent: Intent) {
        self.send(LobbyCommand::Input {
            connection_id,
            intent,
        });
    }

    pub fn disconnect(&self, connection_id: ConnectionId) {
        self.send(LobbyCommand::Disconnect { connection_id });
    }

    pub async fn stats(&self) -> Result<LobbyStats, LobbyError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LobbyCommand::Stats { reply })
            .map_err(|_| LobbyError::Closed)?;
        rx.await.map_err(|_| LobbyError::Closed)
    }

    /// Close all matches and wait for the lobby to stop
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        let (done, rx) = oneshot::channel();
        self.tx
            .send(LobbyCommand::Shutdown { done })
            .map_err(|_| LobbyError::Closed)?;
        rx.await.map_err(|_| LobbyError::Closed)
    }

    fn send(&self, cmd: LobbyCommand) {
        if self.tx.send(cmd).is_err() {
            debug!("Lobby stopped, command dropped");
        }
    }
}

/// Matchmaking service
pub struct MatchmakingService {
    queue: MatchmakingQueue,
    registry: MatchRegistry,
    /// Outbound channel of every live connection
    connections: HashMap<ConnectionId, ConnectionTx>,
    commands: mpsc::UnboundedReceiver<LobbyCommand>,
    /// First serve of new matches; random when unset
    serve_toward: Option<Side>,
}

impl MatchmakingService {
    pub fn new() -> (Self, LobbyHandle) {
        Self::with_serve_side(None)
    }

    /// Service whose matches always open with a serve toward `serve_toward`
    pub fn with_serve_side(serve_toward: Option<Side>) -> (Self, LobbyHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let service = Self {
            queue: MatchmakingQueue::new(),
            registry: MatchRegistry::new(),
            connections: HashMap::new(),
            commands,
            serve_toward,
        };
        (service, LobbyHandle { tx })
    }

    /// Process commands until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        info!("Matchmaking service started");

        while let Some(cmd) = self.commands.recv().await {
            if !self.handle(cmd) {
                break;
            }
        }

        self.close_all();
        info!("Matchmaking service stopped");
    }

    /// Apply one command. Returns false when the lobby should stop.
    fn handle(&mut self, cmd: LobbyCommand) -> bool {
        match cmd {
            LobbyCommand::Connect { connection_id, tx } => {
                self.connections.insert(connection_id, tx);
                debug!(connection_id = %connection_id, "Connection registered");
            }
            LobbyCommand::FindMatch { connection_id } => self.find_match(connection_id),
            LobbyCommand::Input {
                connection_id,
                intent,
            } => self.route_input(connection_id, intent),
            LobbyCommand::Disconnect { connection_id } => self.disconnect(connection_id),
            LobbyCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            LobbyCommand::Shutdown { done } => {
                self.close_all();
                let _ = done.send(());
                return false;
            }
        }
        true
    }

    fn find_match(&mut self, connection_id: ConnectionId) {
        if !self.connections.contains_key(&connection_id) {
            warn!(connection_id = %connection_id, "find_match from unknown connection");
            return;
        }
        if self.registry.seat(&connection_id).is_some() {
            debug!(connection_id = %connection_id, "Already in a match, find_match ignored");
            return;
        }

        let requeued = self.queue.contains(&connection_id);
        self.queue.enqueue(connection_id);
        info!(
            connection_id = %connection_id,
            requeued,
            queue_size = self.queue.len(),
            "Player joined matchmaking queue"
        );

        self.try_match();
    }

    /// Pair waiting connections two at a time
    fn try_match(&mut self) {
        while let Some((left, right)) = self.queue.try_pair() {
            let left_tx = self.connections.get(&left).cloned();
            let right_tx = self.connections.get(&right).cloned();
            let (Some(left_tx), Some(right_tx)) = (left_tx, right_tx) else {
                // Disconnect removes from the queue, so this only guards a stale entry
                for id in [left, right] {
                    if self.connections.contains_key(&id) {
                        self.queue.enqueue(id);
                    }
                }
                continue;
            };

            let match_id = Uuid::new_v4();
            let (game_match, mut handle) = GameMatch::new(
                match_id,
                (left, left_tx.clone()),
                (right, right_tx.clone()),
                self.serve_toward,
            );

            // Sent before the tick task exists, so `matched` precedes any state
            let _ = left_tx.send(ServerMsg::Matched {
                side: Side::Left,
                match_id,
            });
            let _ = right_tx.send(ServerMsg::Matched {
                side: Side::Right,
                match_id,
            });

            handle.attach(tokio::spawn(game_match.run()));
            self.registry.insert(handle);

            info!(
                match_id = %match_id,
                left = %left,
                right = %right,
                active_matches = self.registry.active_matches(),
                "Created new match"
            );
        }
    }

    fn route_input(&self, connection_id: ConnectionId, intent: Intent) {
        let Some(seat) = self.registry.seat(&connection_id) else {
            return;
        };
        if let Some(handle) = self.registry.get(&seat.match_id) {
            handle.send_intent(seat.side, intent);
        }
    }

    fn disconnect(&mut self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
        if self.queue.remove(&connection_id) {
            debug!(connection_id = %connection_id, "Removed from matchmaking queue");
        }

        let Some(seat) = self.registry.seat(&connection_id) else {
            return;
        };
        if let Some(mut handle) = self.registry.remove(&seat.match_id) {
            handle.close(Some(seat.side));
            info!(
                match_id = %seat.match_id,
                leaver = %connection_id,
                "Match closed, opponent left"
            );
        }
    }

    fn stats(&self) -> LobbyStats {
        LobbyStats {
            connections: self.connections.len(),
            queue_size: self.queue.len(),
            active_matches: self.registry.active_matches(),
            players_in_matches: self.registry.seated_players(),
        }
    }

    /// Stop every match without notifying anyone
    fn close_all(&mut self) {
        let handles = self.registry.drain();
        if handles.is_empty() {
            return;
        }
        info!(count = handles.len(), "Closing active matches");
        for mut handle in handles {
            handle.close(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio_test::{assert_err, assert_ok};

    type Rx = mpsc::UnboundedReceiver<ServerMsg>;

    fn start() -> LobbyHandle {
        let (service, lobby) = MatchmakingService::with_serve_side(Some(Side::Right));
        tokio::spawn(service.run());
        lobby
    }

    fn connect(lobby: &LobbyHandle) -> (ConnectionId, Rx) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        lobby.connect(id, tx);
        (id, rx)
    }

    async fn next(rx: &mut Rx) -> ServerMsg {
        rx.recv().await.expect("connection channel closed")
    }

    /// Pair two fresh connections and consume their `matched` messages
    async fn paired(lobby: &LobbyHandle) -> ((ConnectionId, Rx), (ConnectionId, Rx)) {
        let (a, mut a_rx) = connect(lobby);
        let (b, mut b_rx) = connect(lobby);
        lobby.find_match(a);
        lobby.find_match(b);
        assert!(matches!(next(&mut a_rx).await, ServerMsg::Matched { .. }));
        assert!(matches!(next(&mut b_rx).await, ServerMsg::Matched { .. }));
        ((a, a_rx), (b, b_rx))
    }

    #[tokio::test(start_paused = true)]
    async fn first_in_queue_plays_left() {
        let lobby = start();
        let (a, mut a_rx) = connect(&lobby);
        let (b, mut b_rx) = connect(&lobby);

        lobby.find_match(a);
        let stats = assert_ok!(lobby.stats().await);
        assert_eq!(stats.queue_size, 1);
        assert_eq!(stats.active_matches, 0);

        lobby.find_match(b);

        let ServerMsg::Matched { side, match_id } = next(&mut a_rx).await else {
            panic!("expected matched first");
        };
        assert_eq!(side, Side::Left);
        let ServerMsg::Matched {
            side: b_side,
            match_id: b_match,
        } = next(&mut b_rx).await
        else {
            panic!("expected matched first");
        };
        assert_eq!(b_side, Side::Right);
        assert_eq!(b_match, match_id);

        for rx in [&mut a_rx, &mut b_rx] {
            let ServerMsg::GameState { state, tick } = next(rx).await else {
                panic!("expected game_state");
            };
            assert_eq!(tick, 1);
            assert!(state.serving);
            assert_eq!(state.serve_direction, Some(1));
        }

        let stats = assert_ok!(lobby.stats().await);
        assert_eq!(stats.queue_size, 0);
        assert_eq!(stats.active_matches, 1);
        assert_eq!(stats.players_in_matches, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_notifies_opponent_once() {
        let lobby = start();
        let ((a, _a_rx), (b, mut b_rx)) = paired(&lobby).await;

        for _ in 0..3 {
            assert!(matches!(next(&mut b_rx).await, ServerMsg::GameState { .. }));
        }

        lobby.disconnect(a);
        loop {
            match next(&mut b_rx).await {
                ServerMsg::GameState { .. } => continue,
                ServerMsg::OpponentLeft => break,
                other => panic!("unexpected {other:?}"),
            }
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(b_rx.try_recv().unwrap_err(), TryRecvError::Empty);

        // A second disconnect of the same side changes nothing
        lobby.disconnect(a);
        let stats = assert_ok!(lobby.stats().await);
        assert_eq!(stats.active_matches, 0);
        assert_eq!(stats.players_in_matches, 0);
        assert_eq!(b_rx.try_recv().unwrap_err(), TryRecvError::Empty);

        // The survivor is free to queue again
        lobby.find_match(b);
        let stats = assert_ok!(lobby.stats().await);
        assert_eq!(stats.queue_size, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_player_disconnect_leaves_queue() {
        let lobby = start();
        let (a, _a_rx) = connect(&lobby);
        lobby.find_match(a);
        lobby.disconnect(a);

        let stats = assert_ok!(lobby.stats().await);
        assert_eq!(stats.queue_size, 0);
        assert_eq!(stats.connections, 0);

        // A disconnected player is never paired
        let (b, mut b_rx) = connect(&lobby);
        lobby.find_match(b);
        let stats = assert_ok!(lobby.stats().await);
        assert_eq!(stats.active_matches, 0);
        assert_eq!(b_rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn input_without_match_is_ignored() {
        let lobby = start();
        let (a, mut a_rx) = connect(&lobby);
        lobby.input(a, Intent::TrackTarget { y: 100.0 });
        lobby.input(Uuid::new_v4(), Intent::NEUTRAL);

        let stats = assert_ok!(lobby.stats().await);
        assert_eq!(stats.connections, 1);
        assert_eq!(a_rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn input_moves_own_paddle() {
        let lobby = start();
        let ((_, mut a_rx), (b, _b_rx)) = paired(&lobby).await;

        lobby.input(b, Intent::TrackTarget { y: 150.0 });
        let mut moved = false;
        for _ in 0..5 {
            let ServerMsg::GameState { state, .. } = next(&mut a_rx).await else {
                panic!("expected game_state");
            };
            if state.right_paddle_y == 150.0 {
                moved = true;
                break;
            }
        }
        assert!(moved);
    }

    #[tokio::test(start_paused = true)]
    async fn find_match_while_seated_is_ignored() {
        let lobby = start();
        let ((a, _a_rx), _b) = paired(&lobby).await;

        lobby.find_match(a);
        let stats = assert_ok!(lobby.stats().await);
        assert_eq!(stats.queue_size, 0);
        assert_eq!(stats.active_matches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_matches_silently() {
        let lobby = start();
        let (_a, (_, mut b_rx)) = paired(&lobby).await;

        assert_ok!(lobby.shutdown().await);
        tokio::time::sleep(Duration::from_millis(200)).await;

        while let Ok(msg) = b_rx.try_recv() {
            assert!(matches!(msg, ServerMsg::GameState { .. }));
        }
        assert_err!(lobby.stats().await);
    }
}
