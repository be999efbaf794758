/// Message types exchanged with the realtime transport.
///
/// The transport owns the wire (WebSocket, SSE or polling). It decodes what
/// the server sends into `RemoteEvent` and hands it to
/// `BoardEngine::handle_remote`; local mutations leave as `Mutation` tagged
/// with the `OperationId` returned by `BoardEngine::apply_local`.
use serde::{Deserialize, Serialize};

use crate::ledger::OperationId;
use crate::mutation::Mutation;
use crate::types::{Column, OnlineUser};

/// Server verdict on a local optimistic operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OperationOutcome {
    #[serde(rename_all = "camelCase")]
    Confirmed { op_id: OperationId },
    #[serde(rename_all = "camelCase")]
    Rejected {
        op_id: OperationId,
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Events delivered into the engine by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RemoteEvent {
    #[serde(rename_all = "camelCase")]
    BoardLoaded {
        board_id: String,
        workspace_id: String,
        columns: Vec<Column>,
    },
    #[serde(rename_all = "camelCase")]
    Mutation { mutation: Mutation },
    #[serde(rename_all = "camelCase")]
    UserJoined { user: OnlineUser },
    #[serde(rename_all = "camelCase")]
    UserLeft { user_id: String },
    #[serde(rename_all = "camelCase")]
    Cursor { user_id: String, x: f64, y: f64 },
    #[serde(rename_all = "camelCase")]
    Heartbeat { user_id: String },
    #[serde(rename_all = "camelCase")]
    Outcome { outcome: OperationOutcome },
}

/// Outgoing local mutation, ready for the transport to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMutation {
    pub op_id: OperationId,
    pub mutation: Mutation,
}
