/// Board snapshot: ordered columns holding ordered cards.
///
/// Invariants kept by every mutation:
/// - each column's cards are sorted ascending by `position` (stable sort)
/// - a card id appears in exactly one column, and that column's id equals
///   the card's `column_id`
///
/// Mutations that cannot resolve their references return an error and leave
/// the snapshot untouched. Scans are linear: columns in order, then cards.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::BoardError;
use crate::types::{Card, CardPatch, Column, ColumnPatch};

/// Load status rendered by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStatus {
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Epoch milliseconds of the last `set_board`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub(crate) board_id: Option<String>,
    pub(crate) workspace_id: Option<String>,
    pub(crate) columns: Vec<Column>,
    pub(crate) status: BoardStatus,
}

fn sort_columns(columns: &mut [Column]) {
    columns.sort_by(|a, b| a.position.total_cmp(&b.position));
}

impl BoardSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board_id(&self) -> Option<&str> {
        self.board_id.as_deref()
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace_id.as_deref()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn status(&self) -> &BoardStatus {
        &self.status
    }

    // ── Board lifecycle ─────────────────────────────────────────────────────

    /// Replace the whole snapshot with authoritative state.
    ///
    /// Cards are sorted per column and their `column_id` is normalised to the
    /// column that delivered them.
    pub fn set_board(
        &mut self,
        board_id: impl Into<String>,
        workspace_id: impl Into<String>,
        columns: Vec<Column>,
        now: i64,
    ) {
        self.board_id = Some(board_id.into());
        self.workspace_id = Some(workspace_id.into());
        self.columns = columns
            .into_iter()
            .map(|mut col| {
                for card in &mut col.cards {
                    if card.column_id != col.id {
                        card.column_id = col.id.clone();
                    }
                }
                col.sort_cards();
                col
            })
            .collect();
        self.status.is_loading = false;
        self.status.error = None;
        self.status.last_sync = Some(now);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.status.is_loading = loading;
    }

    /// Record a load failure. Setting an error always clears the loading flag.
    pub fn set_error(&mut self, error: Option<String>) {
        self.status.error = error;
        self.status.is_loading = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ── Cards ───────────────────────────────────────────────────────────────

    fn locate_card(&self, card_id: &str) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(ci, col)| col.card_index(card_id).map(|i| (ci, i)))
    }

    fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    pub fn add_card(&mut self, card: Card) -> Result<(), BoardError> {
        if self.locate_card(&card.id).is_some() {
            return Err(BoardError::DuplicateCard(card.id));
        }
        let ci = self
            .column_index(&card.column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(card.column_id.clone()))?;
        let column = &mut self.columns[ci];
        column.cards.push(card);
        column.sort_cards();
        Ok(())
    }

    /// Move a card to `target_column_id` at `position`.
    ///
    /// Returns the card's previous `(column_id, position)`. The target is
    /// checked before the card leaves its column, so a bad target never
    /// loses the card.
    pub fn move_card(
        &mut self,
        card_id: &str,
        target_column_id: &str,
        position: f64,
    ) -> Result<(String, f64), BoardError> {
        let (src, idx) = self
            .locate_card(card_id)
            .ok_or_else(|| BoardError::CardNotFound(card_id.to_string()))?;
        let target = self
            .column_index(target_column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(target_column_id.to_string()))?;

        let mut card = self.columns[src].cards.remove(idx);
        let previous = (card.column_id.clone(), card.position);
        card.column_id = target_column_id.to_string();
        card.position = position;

        let column = &mut self.columns[target];
        column.cards.push(card);
        column.sort_cards();
        Ok(previous)
    }

    /// Merge `patch` into the card. Returns the patch that undoes it.
    pub fn update_card(&mut self, card_id: &str, patch: &CardPatch) -> Result<CardPatch, BoardError> {
        let (ci, idx) = self
            .locate_card(card_id)
            .ok_or_else(|| BoardError::CardNotFound(card_id.to_string()))?;
        let card = &mut self.columns[ci].cards[idx];
        let undo = patch.inverse_against(card);
        patch.apply_to(card);
        Ok(undo)
    }

    pub fn delete_card(&mut self, card_id: &str) -> Result<Card, BoardError> {
        let (ci, idx) = self
            .locate_card(card_id)
            .ok_or_else(|| BoardError::CardNotFound(card_id.to_string()))?;
        Ok(self.columns[ci].cards.remove(idx))
    }

    // ── Columns ─────────────────────────────────────────────────────────────

    pub fn add_column(&mut self, mut column: Column) -> Result<(), BoardError> {
        if self.column_index(&column.id).is_some() {
            return Err(BoardError::DuplicateColumn(column.id));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = column
            .cards
            .iter()
            .find(|c| !seen.insert(c.id.as_str()) || self.locate_card(&c.id).is_some())
        {
            return Err(BoardError::DuplicateCard(dup.id.clone()));
        }
        for card in &mut column.cards {
            card.column_id = column.id.clone();
        }
        column.sort_cards();
        self.columns.push(column);
        sort_columns(&mut self.columns);
        Ok(())
    }

    /// Merge `patch` into the column. Returns the patch that undoes it.
    pub fn update_column(
        &mut self,
        column_id: &str,
        patch: &ColumnPatch,
    ) -> Result<ColumnPatch, BoardError> {
        let ci = self
            .column_index(column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(column_id.to_string()))?;
        let column = &mut self.columns[ci];
        let undo = patch.inverse_against(column);
        patch.apply_to(column);
        if patch.position.is_some() {
            sort_columns(&mut self.columns);
        }
        Ok(undo)
    }

    /// Remove a column together with its cards.
    pub fn delete_column(&mut self, column_id: &str) -> Result<Column, BoardError> {
        let ci = self
            .column_index(column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(column_id.to_string()))?;
        Ok(self.columns.remove(ci))
    }

    /// Rebuild the column sequence from `ids`.
    ///
    /// Each listed column gets `position` = its index in `ids`. Columns not
    /// listed are dropped and returned. Unknown ids are skipped and a repeated
    /// id only counts at its first occurrence.
    pub fn reorder_columns<S: AsRef<str>>(&mut self, ids: &[S]) -> Vec<Column> {
        let mut remaining = std::mem::take(&mut self.columns);
        let mut reordered = Vec::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            let id = id.as_ref();
            if let Some(pos) = remaining.iter().position(|c| c.id == id) {
                let mut col = remaining.remove(pos);
                col.position = index as f64;
                reordered.push(col);
            }
        }
        self.columns = reordered;
        remaining
    }

    /// Take back a reorder without touching anything that changed since.
    ///
    /// `order` is the column sequence before the reorder with each column's
    /// old position. Surviving columns get their old slot and position back
    /// and keep the cards they hold now. Columns in `dropped` come back only
    /// if still absent, minus cards that live elsewhere by now. Columns added
    /// after the reorder stay, slotted by position.
    pub(crate) fn restore_column_order(&mut self, order: &[(String, f64)], mut dropped: Vec<Column>) {
        let on_board: HashSet<String> = self
            .columns
            .iter()
            .flat_map(|col| col.cards.iter().map(|c| c.id.clone()))
            .collect();
        let mut current = std::mem::take(&mut self.columns);
        let mut restored = Vec::with_capacity(order.len() + current.len());
        for (id, position) in order {
            if let Some(i) = current.iter().position(|c| &c.id == id) {
                let mut col = current.remove(i);
                col.position = *position;
                restored.push(col);
            } else if let Some(i) = dropped.iter().position(|c| &c.id == id) {
                let mut col = dropped.remove(i);
                col.cards.retain(|c| !on_board.contains(&c.id));
                restored.push(col);
            }
        }
        for col in current {
            let at = restored
                .iter()
                .position(|c| c.position > col.position)
                .unwrap_or(restored.len());
            restored.insert(at, col);
        }
        self.columns = restored;
    }
}
