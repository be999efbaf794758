//! In-memory state engine for a collaborative task board.
//!
//! Holds one board's columns and cards, the roster of collaborators viewing
//! it, and the ledger of local optimistic changes awaiting the server. The
//! presentation layer and the realtime transport both drive a single
//! [`BoardEngine`]; the transport itself lives outside this crate.

pub mod board;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod mutation;
pub mod presence;
pub mod query;
pub mod sync;
pub mod types;

pub use board::{BoardSnapshot, BoardStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, EngineConfig};
pub use engine::{BoardEngine, RevertOutcome, SharedEngine, SweepReport};
pub use error::BoardError;
pub use events::{EngineEvent, Origin};
pub use ledger::{generate_operation_id, OperationId, OptimisticLedger, PendingOperation};
pub use mutation::{Mutation, Undo};
pub use presence::{relative_time_label, PresenceRegistry, PresenceSummary};
pub use sync::{OperationOutcome, OutgoingMutation, RemoteEvent};
pub use types::{Card, CardPatch, Column, ColumnPatch, Cursor, OnlineUser, Priority, User};
