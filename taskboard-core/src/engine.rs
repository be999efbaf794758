/// Board engine: the state container for one board view.
///
/// Owns the board snapshot, the presence registry and the optimistic ledger.
/// Every entry point takes `&mut self` and finishes its scan-mutate-resort
/// before returning, so calls never interleave. Concurrent callers (UI event
/// loop, transport callbacks) share one engine through `SharedEngine`.
///
/// Conflict policy is last-writer-wins: mutations apply in arrival order and
/// nothing is versioned. A remote change that lands on top of a pending local
/// one simply overwrites it; rejecting the local one afterwards applies its
/// undo over whatever is there at that point.
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::board::{BoardSnapshot, BoardStatus};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::BoardError;
use crate::events::{EngineEvent, Origin};
use crate::ledger::{generate_operation_id, OperationId, OptimisticLedger};
use crate::mutation::{Mutation, Undo};
use crate::presence::{PresenceRegistry, PresenceSummary};
use crate::sync::{OperationOutcome, OutgoingMutation, RemoteEvent};
use crate::types::{Card, CardPatch, Column, ColumnPatch, OnlineUser};

pub type SharedEngine = Arc<Mutex<BoardEngine>>;

/// Result of rejecting an operation. The operation is finished in every case.
#[derive(Debug, Clone, PartialEq)]
pub enum RevertOutcome {
    Reverted,
    /// No undo was recorded, or it was dropped by a board reload.
    NothingToUndo,
    /// The undo no longer applies to the current snapshot.
    Failed(BoardError),
}

/// What an expiry pass removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub expired_users: Vec<String>,
    pub expired_operations: Vec<OperationId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired_users.is_empty() && self.expired_operations.is_empty()
    }
}

pub struct BoardEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    board: BoardSnapshot,
    presence: PresenceRegistry,
    ledger: OptimisticLedger,
    events: broadcast::Sender<EngineEvent>,
}

impl std::fmt::Debug for BoardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardEngine")
            .field("board_id", &self.board.board_id())
            .field("columns", &self.board.columns().len())
            .field("online", &self.presence.len())
            .field("pending", &self.ledger.len())
            .finish_non_exhaustive()
    }
}

impl BoardEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(config: EngineConfig, clock: impl Clock + 'static) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            clock: Arc::new(clock),
            board: BoardSnapshot::new(),
            presence: PresenceRegistry::new(),
            ledger: OptimisticLedger::new(),
            events,
        }
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    fn emit(&self, event: EngineEvent) {
        // Err only means nobody is subscribed yet.
        let _ = self.events.send(event);
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Back to the initial empty state. Config, clock and subscribers stay.
    pub fn reset(&mut self) {
        log::info!(
            "[taskboard.engine.reset] Resetting board {:?} ({} pending operations dropped)",
            self.board.board_id(),
            self.ledger.len()
        );
        self.board.reset();
        self.presence.clear();
        self.ledger.clear();
        self.emit(EngineEvent::Reset);
    }

    /// Tear the engine down. Subscribers see the channel close.
    pub fn dispose(self) {
        log::info!(
            "[taskboard.engine.dispose] Disposing board {:?} with {} pending operations",
            self.board.board_id(),
            self.ledger.len()
        );
    }

    // ── Board load ──────────────────────────────────────────────────────────

    /// Replace the snapshot with authoritative state.
    ///
    /// Pending operations stay pending, but their undo is dropped: the new
    /// snapshot already reflects whatever the authority decided.
    pub fn set_board(
        &mut self,
        board_id: impl Into<String>,
        workspace_id: impl Into<String>,
        columns: Vec<Column>,
    ) {
        let board_id = board_id.into();
        let now = self.now();
        self.board.set_board(board_id.clone(), workspace_id, columns, now);
        self.ledger.forget_undo();
        let card_count = self.board.get_card_count();
        log::info!(
            "[taskboard.engine.load] Loaded board {} ({} columns, {} cards)",
            board_id,
            self.board.columns().len(),
            card_count
        );
        self.emit(EngineEvent::BoardLoaded {
            board_id,
            card_count,
        });
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.board.set_loading(loading);
        self.emit_status();
    }

    pub fn set_error(&mut self, error: Option<String>) {
        if let Some(message) = &error {
            log::warn!("[taskboard.engine.load] Board load failed: {}", message);
        }
        self.board.set_error(error);
        self.emit_status();
    }

    fn emit_status(&self) {
        let status = self.board.status();
        self.emit(EngineEvent::StatusChanged {
            is_loading: status.is_loading,
            error: status.error.clone(),
        });
    }

    // ── Mutations ───────────────────────────────────────────────────────────

    fn apply(
        &mut self,
        mutation: Mutation,
        origin: Origin,
        op_id: Option<OperationId>,
    ) -> Result<Undo, BoardError> {
        let kind = mutation.kind();
        let applied = mutation.clone();
        match mutation.apply(&mut self.board) {
            Ok(undo) => {
                log::debug!("[taskboard.engine.{}] Applied {:?} mutation", kind, origin);
                self.emit(EngineEvent::Mutated {
                    mutation: applied,
                    origin,
                    op_id,
                });
                Ok(undo)
            }
            Err(e) => {
                log::debug!("[taskboard.engine.{}] Skipped {:?} mutation: {}", kind, origin, e);
                Err(e)
            }
        }
    }

    /// Apply a change that does not go through the ledger: remote events, or
    /// direct calls from a caller that tracks nothing.
    pub fn apply_remote(&mut self, mutation: Mutation) -> Result<(), BoardError> {
        self.apply(mutation, Origin::Remote, None).map(|_| ())
    }

    /// Apply an optimistic local change and record it as pending.
    /// Returns the id to correlate with the server's answer.
    pub fn apply_local(&mut self, mutation: Mutation) -> Result<OperationId, BoardError> {
        let op_id = generate_operation_id();
        self.apply_local_with_id(op_id.clone(), mutation)?;
        Ok(op_id)
    }

    /// `apply_local` with a caller-minted id. Nothing is applied or recorded
    /// on error, including when `op_id` is already pending.
    pub fn apply_local_with_id(
        &mut self,
        op_id: OperationId,
        mutation: Mutation,
    ) -> Result<(), BoardError> {
        if self.ledger.is_pending(&op_id) {
            return Err(BoardError::OperationPending(op_id.to_string()));
        }
        let undo = self.apply(mutation, Origin::Local, Some(op_id.clone()))?;
        let now = self.now();
        self.ledger.start_operation(op_id.clone(), now);
        self.ledger.record_undo(&op_id, undo);
        self.emit(EngineEvent::OperationStarted { op_id });
        Ok(())
    }

    /// Apply locally and package the mutation for the transport.
    pub fn submit(&mut self, mutation: Mutation) -> Result<OutgoingMutation, BoardError> {
        let op_id = self.apply_local(mutation.clone())?;
        Ok(OutgoingMutation { op_id, mutation })
    }

    pub fn add_card(&mut self, card: Card) -> Result<(), BoardError> {
        self.apply_remote(Mutation::AddCard { card })
    }

    pub fn move_card(
        &mut self,
        card_id: &str,
        target_column_id: &str,
        position: f64,
    ) -> Result<(), BoardError> {
        self.apply_remote(Mutation::MoveCard {
            card_id: card_id.to_string(),
            target_column_id: target_column_id.to_string(),
            position,
        })
    }

    pub fn update_card(&mut self, card_id: &str, patch: CardPatch) -> Result<(), BoardError> {
        self.apply_remote(Mutation::UpdateCard {
            card_id: card_id.to_string(),
            patch,
        })
    }

    pub fn delete_card(&mut self, card_id: &str) -> Result<(), BoardError> {
        self.apply_remote(Mutation::DeleteCard {
            card_id: card_id.to_string(),
        })
    }

    pub fn add_column(&mut self, column: Column) -> Result<(), BoardError> {
        self.apply_remote(Mutation::AddColumn { column })
    }

    pub fn update_column(&mut self, column_id: &str, patch: ColumnPatch) -> Result<(), BoardError> {
        self.apply_remote(Mutation::UpdateColumn {
            column_id: column_id.to_string(),
            patch,
        })
    }

    pub fn delete_column(&mut self, column_id: &str) -> Result<(), BoardError> {
        self.apply_remote(Mutation::DeleteColumn {
            column_id: column_id.to_string(),
        })
    }

    /// Destructive: columns missing from `column_ids` are removed. Returns
    /// the ids of the removed columns.
    pub fn reorder_columns(&mut self, column_ids: Vec<String>) -> Vec<String> {
        let dropped: Vec<String> =
            match self.apply(Mutation::ReorderColumns { column_ids }, Origin::Remote, None) {
                Ok(Undo::RestoreColumnOrder { dropped, .. }) => {
                    dropped.into_iter().map(|c| c.id).collect()
                }
                _ => Vec::new(),
            };
        if !dropped.is_empty() {
            log::debug!(
                "[taskboard.engine.reorderColumns] Dropped columns not in order list: {:?}",
                dropped
            );
        }
        dropped
    }

    // ── Optimistic ledger ───────────────────────────────────────────────────

    /// Returns false if `op_id` was already pending. That entry is left as is.
    pub fn start_operation(&mut self, op_id: OperationId) -> bool {
        let now = self.now();
        if !self.ledger.start_operation(op_id.clone(), now) {
            log::debug!("[taskboard.engine.startOperation] Operation {} already pending", op_id);
            return false;
        }
        self.emit(EngineEvent::OperationStarted { op_id });
        true
    }

    /// Idempotent. Returns true if the operation was pending.
    pub fn finish_operation(&mut self, op_id: &OperationId) -> bool {
        let finished = self.ledger.finish_operation(op_id).is_some();
        if finished {
            self.emit(EngineEvent::OperationFinished {
                op_id: op_id.clone(),
                reverted: false,
            });
        }
        finished
    }

    /// The server accepted the operation.
    pub fn confirm_operation(&mut self, op_id: &OperationId) -> Result<(), BoardError> {
        if self.finish_operation(op_id) {
            Ok(())
        } else {
            Err(BoardError::OperationNotFound(op_id.to_string()))
        }
    }

    /// The server refused the operation: finish it and apply its undo.
    pub fn reject_operation(&mut self, op_id: &OperationId) -> Result<RevertOutcome, BoardError> {
        let entry = self
            .ledger
            .finish_operation(op_id)
            .ok_or_else(|| BoardError::OperationNotFound(op_id.to_string()))?;

        let outcome = match entry.undo {
            None => {
                log::warn!("[taskboard.engine.revert] Operation {} rejected with nothing to undo", op_id);
                RevertOutcome::NothingToUndo
            }
            Some(undo) => match self.apply_undo(undo) {
                Ok(()) => RevertOutcome::Reverted,
                Err(e) => {
                    log::warn!("[taskboard.engine.revert] Could not revert operation {}: {}", op_id, e);
                    RevertOutcome::Failed(e)
                }
            },
        };
        self.emit(EngineEvent::OperationFinished {
            op_id: op_id.clone(),
            reverted: outcome == RevertOutcome::Reverted,
        });
        Ok(outcome)
    }

    fn apply_undo(&mut self, undo: Undo) -> Result<(), BoardError> {
        let reverted = match &undo {
            Undo::Apply(mutation) => Some(mutation.clone()),
            Undo::RestoreColumnOrder { .. } => None,
        };
        undo.apply(&mut self.board)?;
        // A restored order is reported as the reorder that produces it.
        let mutation = reverted.unwrap_or_else(|| Mutation::ReorderColumns {
            column_ids: self.board.column_ids(),
        });
        log::debug!("[taskboard.engine.{}] Applied Revert mutation", mutation.kind());
        self.emit(EngineEvent::Mutated {
            mutation,
            origin: Origin::Revert,
            op_id: None,
        });
        Ok(())
    }

    /// Put a card back where it was before a rejected move.
    pub fn revert_card_move(
        &mut self,
        card_id: &str,
        original_column_id: &str,
        original_position: f64,
    ) -> Result<(), BoardError> {
        self.apply(
            Mutation::MoveCard {
                card_id: card_id.to_string(),
                target_column_id: original_column_id.to_string(),
                position: original_position,
            },
            Origin::Revert,
            None,
        )
        .map(|_| ())
    }

    pub fn is_pending(&self, op_id: &OperationId) -> bool {
        self.ledger.is_pending(op_id)
    }

    pub fn pending_operations(&self) -> Vec<OperationId> {
        self.ledger.pending_ids()
    }

    // ── Presence ────────────────────────────────────────────────────────────

    pub fn add_online_user(&mut self, user: OnlineUser) {
        let now = self.now();
        log::debug!("[taskboard.engine.presence] {} joined", user.id);
        self.presence.add_online_user(user, now);
        self.emit_presence();
    }

    /// Idempotent. Returns true if the user was online.
    pub fn remove_online_user(&mut self, user_id: &str) -> bool {
        let removed = self.presence.remove_online_user(user_id).is_some();
        if removed {
            log::debug!("[taskboard.engine.presence] {} left", user_id);
            self.emit_presence();
        }
        removed
    }

    pub fn update_user_cursor(&mut self, user_id: &str, x: f64, y: f64) -> Result<(), BoardError> {
        let now = self.now();
        self.presence.update_user_cursor(user_id, x, y, now)?;
        self.emit(EngineEvent::CursorMoved {
            user_id: user_id.to_string(),
            x,
            y,
        });
        Ok(())
    }

    pub fn touch_user(&mut self, user_id: &str) -> Result<(), BoardError> {
        let now = self.now();
        self.presence.touch(user_id, now)
    }

    fn emit_presence(&self) {
        self.emit(EngineEvent::PresenceChanged {
            online: self.presence.len(),
        });
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn recently_active(&self) -> Vec<OnlineUser> {
        self.presence.recently_active()
    }

    pub fn presence_summary(&self) -> PresenceSummary {
        self.presence.summary(self.config.max_visible_users)
    }

    pub fn activity_label(&self, user_id: &str) -> Option<String> {
        let now = self.now();
        self.presence.get(user_id).map(|u| u.activity_label(now))
    }

    // ── Expiry ──────────────────────────────────────────────────────────────

    /// Expiry pass over presence and the ledger, run on the transport's
    /// heartbeat cadence. Expired operations are dropped without revert.
    pub fn sweep(&mut self) -> SweepReport {
        let now = self.now();
        let expired_users = self.presence.expire_idle(now, self.config.presence_ttl());
        let expired_operations: Vec<OperationId> = self
            .ledger
            .expire_stale(now, self.config.operation_ttl())
            .into_iter()
            .map(|entry| entry.id)
            .collect();

        if !expired_users.is_empty() {
            log::info!("[taskboard.engine.sweep] Expired idle users: {:?}", expired_users);
            self.emit_presence();
        }
        for op_id in &expired_operations {
            log::warn!("[taskboard.engine.sweep] Operation {} never acknowledged, dropped", op_id);
            self.emit(EngineEvent::OperationExpired {
                op_id: op_id.clone(),
            });
        }
        SweepReport {
            expired_users,
            expired_operations,
        }
    }

    // ── Transport ───────────────────────────────────────────────────────────

    /// Dispatch an event delivered by the transport.
    pub fn handle_remote(&mut self, event: RemoteEvent) -> Result<(), BoardError> {
        match event {
            RemoteEvent::BoardLoaded {
                board_id,
                workspace_id,
                columns,
            } => {
                self.set_board(board_id, workspace_id, columns);
                Ok(())
            }
            RemoteEvent::Mutation { mutation } => self.apply_remote(mutation),
            RemoteEvent::UserJoined { user } => {
                self.add_online_user(user);
                Ok(())
            }
            RemoteEvent::UserLeft { user_id } => {
                self.remove_online_user(&user_id);
                Ok(())
            }
            RemoteEvent::Cursor { user_id, x, y } => self.update_user_cursor(&user_id, x, y),
            RemoteEvent::Heartbeat { user_id } => self.touch_user(&user_id),
            RemoteEvent::Outcome { outcome } => match outcome {
                OperationOutcome::Confirmed { op_id } => self.confirm_operation(&op_id),
                OperationOutcome::Rejected { op_id, reason } => {
                    log::info!(
                        "[taskboard.engine.revert] Operation {} rejected: {}",
                        op_id,
                        reason.as_deref().unwrap_or("no reason given")
                    );
                    self.reject_operation(&op_id).map(|_| ())
                }
            },
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> &BoardSnapshot {
        &self.board
    }

    pub fn status(&self) -> &BoardStatus {
        self.board.status()
    }

    pub fn columns(&self) -> &[Column] {
        self.board.columns()
    }

    pub fn get_card(&self, card_id: &str) -> Option<&Card> {
        self.board.get_card(card_id)
    }

    pub fn get_column(&self, column_id: &str) -> Option<&Column> {
        self.board.get_column(column_id)
    }

    pub fn get_card_count(&self) -> usize {
        self.board.get_card_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::fixtures::*;
    use crate::types::Cursor;
    use tokio::sync::broadcast::error::TryRecvError;

    fn engine() -> (BoardEngine, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let mut engine = BoardEngine::with_clock(EngineConfig::default(), clock.clone());
        engine.set_board(
            "board-1",
            "ws-1",
            vec![
                column("A", 0.0, vec![card("1", "A", 0.0), card("2", "A", 1.0)]),
                column("B", 1.0, vec![]),
            ],
        );
        (engine, clock)
    }

    fn online(id: &str) -> OnlineUser {
        OnlineUser {
            id: id.to_string(),
            name: id.to_string(),
            avatar: None,
            cursor: None,
            last_activity: 0,
        }
    }

    fn move_mutation(card_id: &str, column_id: &str, position: f64) -> Mutation {
        Mutation::MoveCard {
            card_id: card_id.to_string(),
            target_column_id: column_id.to_string(),
            position,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
        events
    }

    #[test]
    fn test_set_board_stamps_last_sync_from_clock() {
        let (engine, _) = engine();
        assert_eq!(engine.status().last_sync, Some(1_000_000));
        assert_eq!(engine.snapshot().board_id(), Some("board-1"));
        assert_eq!(engine.get_card_count(), 2);
    }

    #[test]
    fn test_end_to_end_move() {
        let (mut engine, _) = engine();
        engine.move_card("1", "B", 0.0).unwrap();
        let a = engine.get_column("A").unwrap();
        assert_eq!(a.cards.len(), 1);
        assert_eq!((a.cards[0].id.as_str(), a.cards[0].position), ("2", 1.0));
        let b = engine.get_column("B").unwrap();
        assert_eq!(b.cards.len(), 1);
        assert_eq!(b.cards[0].id, "1");
        assert_eq!(b.cards[0].column_id, "B");
        assert_eq!(b.cards[0].position, 0.0);
    }

    #[test]
    fn test_local_move_then_confirm() {
        let (mut engine, _) = engine();
        let op = engine.apply_local(move_mutation("1", "B", 0.0)).unwrap();
        assert!(engine.is_pending(&op));
        assert_eq!(engine.get_card("1").unwrap().column_id, "B");

        engine.confirm_operation(&op).unwrap();
        assert!(!engine.is_pending(&op));
        assert_eq!(engine.get_card("1").unwrap().column_id, "B");
        assert_eq!(
            engine.confirm_operation(&op),
            Err(BoardError::OperationNotFound(op.to_string()))
        );
    }

    #[test]
    fn test_local_move_then_reject_restores_placement() {
        let (mut engine, _) = engine();
        let before = engine.snapshot().clone();
        let op = engine.apply_local(move_mutation("1", "B", 0.0)).unwrap();
        assert_eq!(engine.reject_operation(&op), Ok(RevertOutcome::Reverted));
        assert_eq!(engine.snapshot(), &before);
        assert!(engine.pending_operations().is_empty());
    }

    #[test]
    fn test_reject_reverts_delete_and_reorder() {
        let (mut engine, _) = engine();
        let before = engine.snapshot().clone();

        let delete = engine
            .apply_local(Mutation::DeleteColumn {
                column_id: "A".to_string(),
            })
            .unwrap();
        let reorder = engine
            .apply_local(Mutation::ReorderColumns {
                column_ids: vec!["B".to_string()],
            })
            .unwrap();
        assert_eq!(engine.columns().len(), 1);

        assert_eq!(engine.reject_operation(&reorder), Ok(RevertOutcome::Reverted));
        assert_eq!(engine.reject_operation(&delete), Ok(RevertOutcome::Reverted));
        assert_eq!(engine.snapshot(), &before);
    }

    #[test]
    fn test_reject_reorder_keeps_remote_card() {
        let (mut engine, _) = engine();
        let op = engine
            .apply_local(Mutation::ReorderColumns {
                column_ids: vec!["B".to_string(), "A".to_string()],
            })
            .unwrap();
        engine.add_card(card("remote", "A", 0.5)).unwrap();

        assert_eq!(engine.reject_operation(&op), Ok(RevertOutcome::Reverted));
        assert_eq!(engine.get_card("remote").unwrap().column_id, "A");
        let order: Vec<(&str, f64)> = engine
            .columns()
            .iter()
            .map(|c| (c.id.as_str(), c.position))
            .collect();
        assert_eq!(order, vec![("A", 0.0), ("B", 1.0)]);
        assert_eq!(engine.get_card_count(), 3);
    }

    #[test]
    fn test_reject_destructive_reorder_restores_dropped_column_only() {
        let (mut engine, _) = engine();
        let mut rx = engine.subscribe();
        let op = engine
            .apply_local(Mutation::ReorderColumns {
                column_ids: vec!["B".to_string()],
            })
            .unwrap();
        engine.add_card(card("remote", "B", 0.0)).unwrap();
        drain(&mut rx);

        assert_eq!(engine.reject_operation(&op), Ok(RevertOutcome::Reverted));
        assert_eq!(engine.get_column("A").unwrap().cards.len(), 2);
        assert_eq!(engine.get_card("remote").unwrap().column_id, "B");
        assert_eq!(
            drain(&mut rx)[0],
            EngineEvent::Mutated {
                mutation: Mutation::ReorderColumns {
                    column_ids: vec!["A".to_string(), "B".to_string()],
                },
                origin: Origin::Revert,
                op_id: None,
            }
        );
    }

    #[test]
    fn test_pending_id_cannot_be_restarted_or_reused() {
        let (mut engine, _) = engine();
        let op = OperationId::from("x");
        engine.apply_local_with_id(op.clone(), move_mutation("1", "B", 0.0)).unwrap();

        assert!(!engine.start_operation(op.clone()));
        assert_eq!(
            engine.apply_local_with_id(op.clone(), move_mutation("2", "B", 1.0)),
            Err(BoardError::OperationPending("x".to_string()))
        );
        assert_eq!(engine.get_card("2").unwrap().column_id, "A");

        assert_eq!(engine.reject_operation(&op), Ok(RevertOutcome::Reverted));
        assert_eq!(engine.get_card("1").unwrap().column_id, "A");
    }

    #[test]
    fn test_failed_local_mutation_records_nothing() {
        let (mut engine, _) = engine();
        let mut rx = engine.subscribe();
        let result = engine.apply_local(move_mutation("1", "missing", 0.0));
        assert_eq!(result, Err(BoardError::ColumnNotFound("missing".to_string())));
        assert!(engine.pending_operations().is_empty());
        assert_eq!(engine.get_card("1").unwrap().column_id, "A");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_reject_after_reload_has_nothing_to_undo() {
        let (mut engine, _) = engine();
        let op = engine.apply_local(move_mutation("1", "B", 0.0)).unwrap();
        engine.set_board("board-1", "ws-1", vec![column("A", 0.0, vec![card("1", "A", 0.0)])]);
        assert!(engine.is_pending(&op));
        assert_eq!(engine.reject_operation(&op), Ok(RevertOutcome::NothingToUndo));
        assert!(!engine.is_pending(&op));
        assert_eq!(engine.get_card("1").unwrap().column_id, "A");
    }

    #[test]
    fn test_reject_when_undo_no_longer_applies() {
        let (mut engine, _) = engine();
        let op = engine.apply_local(move_mutation("1", "B", 0.0)).unwrap();
        // Another user removes the original column before the rejection arrives.
        engine.delete_column("A").unwrap();
        assert_eq!(
            engine.reject_operation(&op),
            Ok(RevertOutcome::Failed(BoardError::ColumnNotFound("A".to_string())))
        );
        assert!(!engine.is_pending(&op));
        assert_eq!(engine.get_card("1").unwrap().column_id, "B");
    }

    #[test]
    fn test_last_writer_wins() {
        let (mut engine, _) = engine();
        engine.add_column(column("C", 2.0, vec![])).unwrap();
        let op = engine.apply_local(move_mutation("1", "B", 0.0)).unwrap();
        engine.move_card("1", "C", 4.0).unwrap();
        assert_eq!(engine.get_card("1").unwrap().column_id, "C");

        engine.confirm_operation(&op).unwrap();
        assert_eq!(engine.get_card("1").unwrap().column_id, "C");
    }

    #[test]
    fn test_revert_card_move() {
        let (mut engine, _) = engine();
        engine.start_operation(OperationId::from("op-7"));
        engine.move_card("2", "B", 3.0).unwrap();
        engine.revert_card_move("2", "A", 1.0).unwrap();
        assert!(engine.finish_operation(&OperationId::from("op-7")));
        let a = engine.get_column("A").unwrap();
        assert_eq!(a.cards.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["1", "2"]);
        assert!(engine.pending_operations().is_empty());
    }

    #[test]
    fn test_ledger_start_finish() {
        let (mut engine, _) = engine();
        let op = OperationId::from("op-1");
        engine.start_operation(op.clone());
        assert!(engine.is_pending(&op));
        assert!(engine.finish_operation(&op));
        assert!(!engine.is_pending(&op));
        assert!(!engine.finish_operation(&op));
    }

    #[test]
    fn test_submit_packages_outgoing_mutation() {
        let (mut engine, _) = engine();
        let outgoing = engine.submit(move_mutation("2", "B", 0.0)).unwrap();
        assert!(engine.is_pending(&outgoing.op_id));
        assert_eq!(outgoing.mutation, move_mutation("2", "B", 0.0));
    }

    #[test]
    fn test_events_for_local_operation() {
        let (mut engine, _) = engine();
        let mut rx = engine.subscribe();
        let op = engine.apply_local(move_mutation("1", "B", 0.0)).unwrap();
        engine.confirm_operation(&op).unwrap();

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                EngineEvent::Mutated {
                    mutation: move_mutation("1", "B", 0.0),
                    origin: Origin::Local,
                    op_id: Some(op.clone()),
                },
                EngineEvent::OperationStarted { op_id: op.clone() },
                EngineEvent::OperationFinished {
                    op_id: op,
                    reverted: false,
                },
            ]
        );
    }

    #[test]
    fn test_presence_flow_with_clock() {
        let (mut engine, clock) = engine();
        engine.add_online_user(online("ann"));
        clock.advance(1_000);
        engine.add_online_user(online("bob"));
        clock.advance(44_000);
        engine.update_user_cursor("ann", 5.0, 6.0).unwrap();

        let order: Vec<String> = engine.recently_active().into_iter().map(|u| u.id).collect();
        assert_eq!(order, vec!["ann", "bob"]);
        assert_eq!(
            engine.presence().get("ann").unwrap().cursor,
            Some(Cursor { x: 5.0, y: 6.0 })
        );
        assert_eq!(engine.activity_label("bob").as_deref(), Some("44s ago"));
        assert_eq!(engine.activity_label("ann").as_deref(), Some("just now"));
        assert!(engine.activity_label("nobody").is_none());

        assert!(engine.update_user_cursor("nobody", 0.0, 0.0).is_err());
        assert!(engine.remove_online_user("bob"));
        assert!(!engine.remove_online_user("bob"));
        assert_eq!(engine.presence_summary().total, 1);
    }

    #[test]
    fn test_sweep_expires_idle_users_and_stale_operations() {
        let config = EngineConfig {
            presence_ttl_secs: 60,
            operation_ttl_secs: 30,
            ..EngineConfig::default()
        };
        let clock = ManualClock::new(0);
        let mut engine = BoardEngine::with_clock(config, clock.clone());
        engine.set_board("b", "w", vec![column("A", 0.0, vec![card("1", "A", 0.0)])]);

        engine.add_online_user(online("idle"));
        let stale = engine
            .apply_local(Mutation::UpdateCard {
                card_id: "1".to_string(),
                patch: CardPatch {
                    title: Some("edited".to_string()),
                    ..Default::default()
                },
            })
            .unwrap();

        clock.advance(40_000);
        engine.add_online_user(online("active"));
        let fresh = engine.apply_local(move_mutation("1", "A", 2.0)).unwrap();

        clock.advance(25_000);
        let report = engine.sweep();
        assert_eq!(report.expired_users, vec!["idle"]);
        assert_eq!(report.expired_operations, vec![stale.clone()]);
        assert!(engine.is_pending(&fresh));
        assert!(!engine.is_pending(&stale));
        // Expired operations are not reverted.
        assert_eq!(engine.get_card("1").unwrap().title, "edited");

        assert!(engine.sweep().is_empty());
    }

    #[test]
    fn test_handle_remote_dispatch() {
        let (mut engine, _) = engine();
        let op = engine.apply_local(move_mutation("1", "B", 0.0)).unwrap();

        engine
            .handle_remote(RemoteEvent::UserJoined { user: online("u1") })
            .unwrap();
        engine
            .handle_remote(RemoteEvent::Cursor {
                user_id: "u1".to_string(),
                x: 1.0,
                y: 2.0,
            })
            .unwrap();
        engine
            .handle_remote(RemoteEvent::Mutation {
                mutation: Mutation::DeleteCard {
                    card_id: "2".to_string(),
                },
            })
            .unwrap();
        engine
            .handle_remote(RemoteEvent::Outcome {
                outcome: OperationOutcome::Rejected {
                    op_id: op.clone(),
                    reason: Some("column locked".to_string()),
                },
            })
            .unwrap();

        assert_eq!(engine.get_card("1").unwrap().column_id, "A");
        assert!(engine.get_card("2").is_none());
        assert!(engine.presence().contains("u1"));

        assert!(engine
            .handle_remote(RemoteEvent::Heartbeat {
                user_id: "ghost".to_string()
            })
            .is_err());
        engine
            .handle_remote(RemoteEvent::UserLeft {
                user_id: "u1".to_string(),
            })
            .unwrap();
        assert!(engine.presence().is_empty());
    }

    #[test]
    fn test_reorder_columns_via_engine() {
        let (mut engine, _) = engine();
        engine.add_column(column("C", 2.0, vec![])).unwrap();
        let dropped = engine.reorder_columns(vec!["C".to_string(), "A".to_string()]);
        assert_eq!(dropped, vec!["B".to_string()]);
        let order: Vec<(&str, f64)> = engine
            .columns()
            .iter()
            .map(|c| (c.id.as_str(), c.position))
            .collect();
        assert_eq!(order, vec![("C", 0.0), ("A", 1.0)]);
        assert!(engine.get_column("B").is_none());
    }

    #[test]
    fn test_reset_and_dispose() {
        let (mut engine, _) = engine();
        let mut rx = engine.subscribe();
        engine.add_online_user(online("u1"));
        engine.start_operation(OperationId::from("op"));
        engine.set_loading(true);

        engine.reset();
        assert!(engine.columns().is_empty());
        assert!(engine.presence().is_empty());
        assert!(engine.pending_operations().is_empty());
        assert_eq!(engine.status(), &BoardStatus::default());

        engine.dispose();
        let events = drain(&mut rx);
        assert_eq!(events.last(), Some(&EngineEvent::Reset));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
    }

    #[test]
    fn test_set_error_event() {
        let (mut engine, _) = engine();
        let mut rx = engine.subscribe();
        engine.set_loading(true);
        engine.set_error(Some("boom".to_string()));
        assert_eq!(
            drain(&mut rx),
            vec![
                EngineEvent::StatusChanged {
                    is_loading: true,
                    error: None,
                },
                EngineEvent::StatusChanged {
                    is_loading: false,
                    error: Some("boom".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_shared_engine_across_threads() {
        let (engine, _) = engine();
        let shared = engine.into_shared();
        let transport = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            let mut engine = transport.lock().unwrap();
            engine.add_online_user(online("remote"));
        });
        handle.join().unwrap();
        assert!(shared.lock().unwrap().presence().contains("remote"));
    }
}
