/// Change notifications emitted by the engine to its subscribers.
use serde::{Deserialize, Serialize};

use crate::ledger::OperationId;
use crate::mutation::Mutation;

/// Where a mutation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// Optimistic change made on this client.
    Local,
    /// Change delivered by the transport, or a direct call outside the ledger.
    Remote,
    /// Undo of a rejected or reverted local change.
    Revert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    #[serde(rename_all = "camelCase")]
    BoardLoaded {
        board_id: String,
        card_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        is_loading: bool,
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Mutated {
        mutation: Mutation,
        origin: Origin,
        #[serde(skip_serializing_if = "Option::is_none")]
        op_id: Option<OperationId>,
    },
    #[serde(rename_all = "camelCase")]
    PresenceChanged { online: usize },
    #[serde(rename_all = "camelCase")]
    CursorMoved { user_id: String, x: f64, y: f64 },
    #[serde(rename_all = "camelCase")]
    OperationStarted { op_id: OperationId },
    #[serde(rename_all = "camelCase")]
    OperationFinished { op_id: OperationId, reverted: bool },
    /// Dropped by an expiry pass without an answer from the server.
    #[serde(rename_all = "camelCase")]
    OperationExpired { op_id: OperationId },
    Reset,
}
