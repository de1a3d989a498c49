//! Match registry and authoritative tick loop

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::util::time::{tick_delta, tick_period};
use crate::ws::protocol::ServerMsg;

use super::physics::step;
use super::snapshot::GameStateView;
use super::state::{Intent, Intents, MatchState, Side};

pub type MatchId = Uuid;
pub type ConnectionId = Uuid;

/// Outbound message channel of one connection
pub type ConnectionTx = mpsc::UnboundedSender<ServerMsg>;

/// Latest intent of one side, consumed once per tick
#[derive(Debug, Default)]
struct IntentBuffer {
    /// Arrived since the previous tick
    pending: Option<Intent>,
    /// Applied on the previous tick
    last_applied: Intent,
}

impl IntentBuffer {
    fn record(&mut self, intent: Intent) {
        self.pending = Some(intent);
    }

    /// Intent for this tick. Without a fresh message the previous tick's intent
    /// is reused, so a dropped input does not stall the paddle.
    fn take_for_tick(&mut self) -> Intent {
        let intent = self.pending.take().unwrap_or(self.last_applied);
        self.last_applied = intent;
        intent
    }
}

/// Both connections of a live match
struct MatchOutbox {
    left: ConnectionTx,
    right: ConnectionTx,
}

impl MatchOutbox {
    fn to(&self, side: Side) -> &ConnectionTx {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Fire-and-forget; a closed connection is noticed by its own disconnect event
    fn broadcast(&self, msg: ServerMsg) {
        let _ = self.left.send(msg.clone());
        let _ = self.right.send(msg);
    }
}

/// Cleared on teardown; the tick loop broadcasts only while it is `Some`
type SharedOutbox = Arc<Mutex<Option<MatchOutbox>>>;

/// A player's place in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    pub match_id: MatchId,
    pub side: Side,
}

/// Handle to a running match
pub struct MatchHandle {
    pub id: MatchId,
    left: ConnectionId,
    right: ConnectionId,
    input_tx: mpsc::UnboundedSender<(Side, Intent)>,
    outbox: SharedOutbox,
    task: Option<JoinHandle<()>>,
}

impl MatchHandle {
    pub fn connection(&self, side: Side) -> ConnectionId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Buffer an intent for the next tick
    pub fn send_intent(&self, side: Side, intent: Intent) {
        let _ = self.input_tx.send((side, intent));
    }

    /// Bind the spawned tick loop to this handle
    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.task = Some(task);
    }

    /// Stop the match. Once this returns no further tick is broadcast. When
    /// `leaver` is given, the other side is told its opponent left.
    ///
    /// Returns false if the match was already closed.
    pub fn close(&mut self, leaver: Option<Side>) -> bool {
        let outbox = self.outbox.lock().take();
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let Some(outbox) = outbox else {
            return false;
        };
        if let Some(leaver) = leaver {
            let _ = outbox.to(leaver.opponent()).send(ServerMsg::OpponentLeft);
        }
        true
    }
}

impl Drop for MatchHandle {
    fn drop(&mut self) {
        self.close(None);
    }
}

/// Registry of active matches and the seat of every matched connection
#[derive(Default)]
pub struct MatchRegistry {
    matches: HashMap<MatchId, MatchHandle>,
    seats: HashMap<ConnectionId, Seat>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: MatchHandle) {
        for side in [Side::Left, Side::Right] {
            self.seats.insert(
                handle.connection(side),
                Seat {
                    match_id: handle.id,
                    side,
                },
            );
        }
        self.matches.insert(handle.id, handle);
    }

    pub fn get(&self, id: &MatchId) -> Option<&MatchHandle> {
        self.matches.get(id)
    }

    pub fn seat(&self, connection_id: &ConnectionId) -> Option<Seat> {
        self.seats.get(connection_id).copied()
    }

    /// Remove a match together with both of its seats
    pub fn remove(&mut self, id: &MatchId) -> Option<MatchHandle> {
        let handle = self.matches.remove(id)?;
        self.seats.remove(&handle.left);
        self.seats.remove(&handle.right);
        Some(handle)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn seated_players(&self) -> usize {
        self.seats.len()
    }

    /// Remove every match
    pub fn drain(&mut self) -> Vec<MatchHandle> {
        self.seats.clear();
        self.matches.drain().map(|(_, handle)| handle).collect()
    }
}

/// The authoritative game match, owned by its tick task
pub struct GameMatch {
    id: MatchId,
    state: MatchState,
    tick: u64,
    left: IntentBuffer,
    right: IntentBuffer,
    input_rx: mpsc::UnboundedReceiver<(Side, Intent)>,
    outbox: SharedOutbox,
}

impl GameMatch {
    /// Create a new match between two connections. `serve_toward` fixes the
    /// first serve; `None` picks a random side.
    pub fn new(
        id: MatchId,
        left: (ConnectionId, ConnectionTx),
        right: (ConnectionId, ConnectionTx),
        serve_toward: Option<Side>,
    ) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let outbox = Arc::new(Mutex::new(Some(MatchOutbox {
            left: left.1,
            right: right.1,
        })));

        let handle = MatchHandle {
            id,
            left: left.0,
            right: right.0,
            input_tx,
            outbox: outbox.clone(),
            task: None,
        };

        let game_match = Self {
            id,
            state: MatchState::new(serve_toward),
            tick: 0,
            left: IntentBuffer::default(),
            right: IntentBuffer::default(),
            input_rx,
            outbox,
        };

        (game_match, handle)
    }

    /// Run the fixed-rate tick loop until the match is closed
    pub async fn run(mut self) {
        info!(match_id = %self.id, "Match started");

        let mut ticker = interval(tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if !self.run_tick() {
                break;
            }
        }

        debug!(match_id = %self.id, tick = self.tick, "Tick loop stopped");
    }

    /// Advance one tick and broadcast the result. Returns false once the
    /// match has been closed.
    fn run_tick(&mut self) -> bool {
        self.process_inputs();

        let intents = Intents {
            left: self.left.take_for_tick(),
            right: self.right.take_for_tick(),
        };

        let was_over = self.state.is_game_over();
        let was_serving = self.state.is_serving();
        self.state = step(&self.state, &intents, tick_delta(), None);
        self.tick += 1;

        if was_serving && !self.state.is_serving() {
            debug!(match_id = %self.id, tick = self.tick, "Ball served");
        }

        if !was_over {
            if let Some(winner) = self.state.winner {
                info!(
                    match_id = %self.id,
                    winner = ?winner,
                    score_left = self.state.score_left,
                    score_right = self.state.score_right,
                    "Match decided"
                );
            }
        }

        let guard = self.outbox.lock();
        let Some(outbox) = guard.as_ref() else {
            return false;
        };
        outbox.broadcast(ServerMsg::GameState {
            state: GameStateView::from(&self.state),
            tick: self.tick,
        });
        true
    }

    /// Drain buffered inputs; only the newest per side survives
    fn process_inputs(&mut self) {
        while let Ok((side, intent)) = self.input_rx.try_recv() {
            match side {
                Side::Left => self.left.record(intent),
                Side::Right => self.right.record(intent),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{PADDLE_SPEED, SERVE_DELAY_SECS};
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;

    struct Harness {
        game_match: GameMatch,
        handle: MatchHandle,
        left_rx: mpsc::UnboundedReceiver<ServerMsg>,
        right_rx: mpsc::UnboundedReceiver<ServerMsg>,
    }

    fn harness() -> Harness {
        let (left_tx, left_rx) = mpsc::unbounded_channel();
        let (right_tx, right_rx) = mpsc::unbounded_channel();
        let (game_match, handle) = GameMatch::new(
            Uuid::new_v4(),
            (Uuid::new_v4(), left_tx),
            (Uuid::new_v4(), right_tx),
            Some(Side::Right),
        );
        Harness {
            game_match,
            handle,
            left_rx,
            right_rx,
        }
    }

    fn expect_state(rx: &mut mpsc::UnboundedReceiver<ServerMsg>) -> (GameStateView, u64) {
        match rx.try_recv() {
            Ok(ServerMsg::GameState { state, tick }) => (state, tick),
            other => panic!("expected game_state, got {other:?}"),
        }
    }

    #[test]
    fn intent_buffer_reuses_last_applied() {
        let mut buffer = IntentBuffer::default();
        assert_eq!(buffer.take_for_tick(), Intent::NEUTRAL);

        let up = Intent::Hold {
            up: true,
            down: false,
        };
        buffer.record(up);
        assert_eq!(buffer.take_for_tick(), up);
        assert_eq!(buffer.take_for_tick(), up);

        let target = Intent::TrackTarget { y: 200.0 };
        buffer.record(Intent::NEUTRAL);
        buffer.record(target);
        assert_eq!(buffer.take_for_tick(), target);
    }

    #[test]
    fn tick_broadcasts_identical_state_to_both_sides() {
        let mut h = harness();
        assert!(h.game_match.run_tick());
        assert!(h.game_match.run_tick());

        let (left_1, tick_1) = expect_state(&mut h.left_rx);
        let (right_1, right_tick_1) = expect_state(&mut h.right_rx);
        assert_eq!(tick_1, 1);
        assert_eq!(right_tick_1, 1);
        assert_eq!(left_1, right_1);

        let (_, tick_2) = expect_state(&mut h.left_rx);
        assert_eq!(tick_2, 2);
    }

    #[test]
    fn inputs_apply_on_next_tick_only() {
        let mut h = harness();
        h.game_match.run_tick();
        let (before, _) = expect_state(&mut h.left_rx);

        h.handle.send_intent(
            Side::Left,
            Intent::Hold {
                up: false,
                down: true,
            },
        );
        assert_eq!(h.game_match.state.left_paddle_y, before.left_paddle_y);

        h.game_match.run_tick();
        let (after, _) = expect_state(&mut h.left_rx);
        let moved = PADDLE_SPEED * tick_delta();
        assert!((after.left_paddle_y - (before.left_paddle_y + moved)).abs() < 1e-9);
        assert_eq!(after.right_paddle_y, before.right_paddle_y);

        // No new message: the held direction keeps applying
        h.game_match.run_tick();
        let (again, _) = expect_state(&mut h.left_rx);
        assert!((again.left_paddle_y - (after.left_paddle_y + moved)).abs() < 1e-9);
    }

    #[test]
    fn close_notifies_peer_once_and_stops_ticks() {
        let mut h = harness();
        h.game_match.run_tick();
        let _ = expect_state(&mut h.left_rx);
        let _ = expect_state(&mut h.right_rx);

        assert!(h.handle.close(Some(Side::Left)));
        assert!(!h.handle.close(Some(Side::Left)));

        // The outbox held the only senders, so both channels end after teardown
        assert!(matches!(h.right_rx.try_recv(), Ok(ServerMsg::OpponentLeft)));
        assert_eq!(h.right_rx.try_recv().unwrap_err(), TryRecvError::Disconnected);
        assert_eq!(h.left_rx.try_recv().unwrap_err(), TryRecvError::Disconnected);

        assert!(!h.game_match.run_tick());
    }

    #[test]
    fn registry_tracks_seats() {
        let h = harness();
        let id = h.handle.id;
        let left = h.handle.connection(Side::Left);
        let right = h.handle.connection(Side::Right);

        let mut registry = MatchRegistry::new();
        registry.insert(h.handle);
        assert_eq!(registry.active_matches(), 1);
        assert_eq!(registry.seated_players(), 2);
        assert_eq!(
            registry.seat(&right),
            Some(Seat {
                match_id: id,
                side: Side::Right
            })
        );

        let removed = registry.remove(&id).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(registry.seat(&left), None);
        assert_eq!(registry.active_matches(), 0);
        assert!(registry.remove(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_match_ticks_in_order_until_closed() {
        let Harness {
            game_match,
            mut handle,
            mut left_rx,
            mut right_rx,
        } = harness();
        handle.attach(tokio::spawn(game_match.run()));

        let mut last_tick = 0;
        let mut served = false;
        while last_tick < 40 {
            let Some(ServerMsg::GameState { state, tick }) = left_rx.recv().await else {
                panic!("expected game_state");
            };
            assert_eq!(tick, last_tick + 1);
            last_tick = tick;
            served |= !state.serving;
        }
        assert!(served, "serve should launch within {SERVE_DELAY_SECS}s");

        handle.close(Some(Side::Left));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut saw_opponent_left = false;
        while let Ok(msg) = right_rx.try_recv() {
            match msg {
                ServerMsg::OpponentLeft => saw_opponent_left = true,
                ServerMsg::GameState { .. } => assert!(!saw_opponent_left),
                ServerMsg::Matched { .. } => panic!("unexpected matched"),
            }
        }
        assert!(saw_opponent_left);
        assert!(left_rx.try_recv().is_err());
    }
}
