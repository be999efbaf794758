/// Read-only lookups over the board snapshot. Nothing here is cached.
use crate::board::BoardSnapshot;
use crate::types::{Card, Column};

impl BoardSnapshot {
    /// First card with this id, scanning columns in order.
    pub fn get_card(&self, card_id: &str) -> Option<&Card> {
        self.columns
            .iter()
            .flat_map(|col| col.cards.iter())
            .find(|c| c.id == card_id)
    }

    pub fn get_column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn get_card_count(&self) -> usize {
        self.columns.iter().map(|c| c.cards.len()).sum()
    }

    pub fn contains_card(&self, card_id: &str) -> bool {
        self.get_card(card_id).is_some()
    }

    /// The column currently holding the card.
    pub fn column_of(&self, card_id: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|col| col.cards.iter().any(|c| c.id == card_id))
    }

    pub fn cards_in(&self, column_id: &str) -> &[Card] {
        self.get_column(column_id)
            .map(|c| c.cards.as_slice())
            .unwrap_or(&[])
    }

    pub fn column_ids(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.id.clone()).collect()
    }
}
