/// Errors returned by board, presence and ledger operations.
///
/// Every variant marks a no-op: when an operation returns an error the
/// engine state is exactly what it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoardError {
    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("User not online: {0}")]
    UserNotFound(String),

    #[error("Operation not pending: {0}")]
    OperationNotFound(String),

    #[error("Operation already pending: {0}")]
    OperationPending(String),

    #[error("Card {0} already exists on the board")]
    DuplicateCard(String),

    #[error("Column {0} already exists on the board")]
    DuplicateColumn(String),
}
