/// The card and column mutations shared by local and remote callers.
use serde::{Deserialize, Serialize};

use crate::board::BoardSnapshot;
use crate::error::BoardError;
use crate::types::{Card, CardPatch, Column, ColumnPatch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    #[serde(rename_all = "camelCase")]
    AddCard { card: Card },
    #[serde(rename_all = "camelCase")]
    MoveCard {
        card_id: String,
        target_column_id: String,
        position: f64,
    },
    #[serde(rename_all = "camelCase")]
    UpdateCard { card_id: String, patch: CardPatch },
    #[serde(rename_all = "camelCase")]
    DeleteCard { card_id: String },
    #[serde(rename_all = "camelCase")]
    AddColumn { column: Column },
    #[serde(rename_all = "camelCase")]
    UpdateColumn { column_id: String, patch: ColumnPatch },
    #[serde(rename_all = "camelCase")]
    DeleteColumn { column_id: String },
    #[serde(rename_all = "camelCase")]
    ReorderColumns { column_ids: Vec<String> },
}

/// What has to run to take back an applied mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Undo {
    Apply(Mutation),
    /// Column order before a reorder, plus the columns it dropped.
    RestoreColumnOrder {
        order: Vec<(String, f64)>,
        dropped: Vec<Column>,
    },
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::AddCard { .. } => "addCard",
            Mutation::MoveCard { .. } => "moveCard",
            Mutation::UpdateCard { .. } => "updateCard",
            Mutation::DeleteCard { .. } => "deleteCard",
            Mutation::AddColumn { .. } => "addColumn",
            Mutation::UpdateColumn { .. } => "updateColumn",
            Mutation::DeleteColumn { .. } => "deleteColumn",
            Mutation::ReorderColumns { .. } => "reorderColumns",
        }
    }

    /// Apply to the snapshot and return the undo for what actually changed.
    pub fn apply(self, board: &mut BoardSnapshot) -> Result<Undo, BoardError> {
        let undo = match self {
            Mutation::AddCard { card } => {
                let card_id = card.id.clone();
                board.add_card(card)?;
                Undo::Apply(Mutation::DeleteCard { card_id })
            }
            Mutation::MoveCard {
                card_id,
                target_column_id,
                position,
            } => {
                let (column_id, original) = board.move_card(&card_id, &target_column_id, position)?;
                Undo::Apply(Mutation::MoveCard {
                    card_id,
                    target_column_id: column_id,
                    position: original,
                })
            }
            Mutation::UpdateCard { card_id, patch } => {
                let patch = board.update_card(&card_id, &patch)?;
                Undo::Apply(Mutation::UpdateCard { card_id, patch })
            }
            Mutation::DeleteCard { card_id } => {
                let card = board.delete_card(&card_id)?;
                Undo::Apply(Mutation::AddCard { card })
            }
            Mutation::AddColumn { column } => {
                let column_id = column.id.clone();
                board.add_column(column)?;
                Undo::Apply(Mutation::DeleteColumn { column_id })
            }
            Mutation::UpdateColumn { column_id, patch } => {
                let patch = board.update_column(&column_id, &patch)?;
                Undo::Apply(Mutation::UpdateColumn { column_id, patch })
            }
            Mutation::DeleteColumn { column_id } => {
                let column = board.delete_column(&column_id)?;
                Undo::Apply(Mutation::AddColumn { column })
            }
            Mutation::ReorderColumns { column_ids } => {
                let order = board
                    .columns()
                    .iter()
                    .map(|c| (c.id.clone(), c.position))
                    .collect();
                let dropped = board.reorder_columns(&column_ids);
                Undo::RestoreColumnOrder { order, dropped }
            }
        };
        Ok(undo)
    }
}

impl Undo {
    /// Run the undo. Returns the undo of the undo, so it can be redone.
    pub fn apply(self, board: &mut BoardSnapshot) -> Result<Undo, BoardError> {
        match self {
            Undo::Apply(mutation) => mutation.apply(board),
            Undo::RestoreColumnOrder { order, dropped } => {
                let column_ids = board.column_ids();
                board.restore_column_order(&order, dropped);
                Ok(Undo::Apply(Mutation::ReorderColumns { column_ids }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::*;
    use crate::types::Priority;

    fn board() -> BoardSnapshot {
        let mut board = BoardSnapshot::new();
        board.set_board(
            "b",
            "w",
            vec![
                column("A", 0.0, vec![card("1", "A", 0.0), card("2", "A", 1.0)]),
                column("B", 1.0, vec![card("3", "B", 2.0)]),
                column("C", 2.0, vec![]),
            ],
            0,
        );
        board
    }

    fn assert_undo_restores(mutation: Mutation) {
        let mut board = board();
        let before = board.clone();
        let undo = mutation.clone().apply(&mut board).unwrap();
        assert_ne!(board, before, "{} should change the board", mutation.kind());
        undo.apply(&mut board).unwrap();
        assert_eq!(board, before, "undo of {} should restore the board", mutation.kind());
    }

    #[test]
    fn test_undo_restores_every_kind() {
        assert_undo_restores(Mutation::AddCard {
            card: card("9", "C", 0.0),
        });
        assert_undo_restores(Mutation::MoveCard {
            card_id: "1".to_string(),
            target_column_id: "B".to_string(),
            position: 5.0,
        });
        assert_undo_restores(Mutation::UpdateCard {
            card_id: "2".to_string(),
            patch: CardPatch {
                priority: Some(Priority::High),
                labels: Some(Some(vec!["bug".to_string()])),
                ..Default::default()
            },
        });
        assert_undo_restores(Mutation::DeleteCard {
            card_id: "2".to_string(),
        });
        assert_undo_restores(Mutation::AddColumn {
            column: column("D", 3.0, vec![card("7", "D", 0.0)]),
        });
        assert_undo_restores(Mutation::UpdateColumn {
            column_id: "B".to_string(),
            patch: ColumnPatch {
                name: Some("Doing".to_string()),
                color: Some(Some("#ff0000".to_string())),
                position: None,
            },
        });
        assert_undo_restores(Mutation::DeleteColumn {
            column_id: "B".to_string(),
        });
        assert_undo_restores(Mutation::ReorderColumns {
            column_ids: vec!["C".to_string(), "A".to_string()],
        });
    }

    #[test]
    fn test_reorder_undo_keeps_cards_added_since() {
        let mut board = board();
        let undo = Mutation::ReorderColumns {
            column_ids: vec!["C".to_string(), "A".to_string()],
        }
        .apply(&mut board)
        .unwrap();
        board.add_card(card("late", "A", 0.5)).unwrap();

        let redo = undo.apply(&mut board).unwrap();
        assert_eq!(board.column_ids(), vec!["A", "B", "C"]);
        assert!(board.contains_card("late"));
        assert!(board.contains_card("3"));

        redo.apply(&mut board).unwrap();
        assert_eq!(board.column_ids(), vec!["C", "A"]);
        assert!(board.contains_card("late"));
    }

    #[test]
    fn test_failed_mutation_returns_error() {
        let mut board = board();
        let before = board.clone();
        let result = Mutation::MoveCard {
            card_id: "1".to_string(),
            target_column_id: "Z".to_string(),
            position: 0.0,
        }
        .apply(&mut board);
        assert_eq!(result, Err(BoardError::ColumnNotFound("Z".to_string())));
        assert_eq!(board, before);
    }

    #[test]
    fn test_undo_can_be_redone() {
        let mut board = board();
        let undo = Mutation::DeleteCard {
            card_id: "3".to_string(),
        }
        .apply(&mut board)
        .unwrap();
        let after_delete = board.clone();
        let redo = undo.apply(&mut board).unwrap();
        assert!(board.contains_card("3"));
        redo.apply(&mut board).unwrap();
        assert_eq!(board, after_delete);
    }

    #[test]
    fn test_mutation_wire_format() {
        let json = serde_json::to_value(Mutation::MoveCard {
            card_id: "1".to_string(),
            target_column_id: "B".to_string(),
            position: 0.0,
        })
        .unwrap();
        assert_eq!(json["type"], "moveCard");
        assert_eq!(json["cardId"], "1");
        assert_eq!(json["targetColumnId"], "B");

        let parsed: Mutation =
            serde_json::from_str(r#"{"type":"deleteColumn","columnId":"A"}"#).unwrap();
        assert_eq!(
            parsed,
            Mutation::DeleteColumn {
                column_id: "A".to_string()
            }
        );
    }
}
