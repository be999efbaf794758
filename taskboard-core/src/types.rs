use serde::{Deserialize, Serialize};

/// A user reference embedded in cards. Always a value snapshot, never a
/// live link to a user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Id of the owning column. Kept equal to the column that holds the card.
    pub column_id: String,
    pub position: f64,
    pub creator: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<User>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub name: String,
    pub position: f64,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Column {
    /// Stable ascending sort of the cards by position.
    pub(crate) fn sort_cards(&mut self) {
        self.cards.sort_by(|a, b| a.position.total_cmp(&b.position));
    }

    pub(crate) fn card_index(&self, card_id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

/// A collaborator currently viewing the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    /// Epoch milliseconds of the last join, cursor or heartbeat event.
    #[serde(default)]
    pub last_activity: i64,
}

impl OnlineUser {
    /// Upper-cased first character of the name, used when there is no avatar.
    pub fn initial(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    /// "Active ..." label relative to `now` (epoch milliseconds).
    pub fn activity_label(&self, now: i64) -> String {
        crate::presence::relative_time_label(now - self.last_activity)
    }
}

/// Partial update for a card. `None` leaves a field untouched; for optional
/// card fields `Some(None)` clears the value.
///
/// Placement (`column_id`, `position`) is deliberately absent: it only
/// changes through `move_card`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Option<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Option<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        *self == CardPatch::default()
    }

    /// Patch that restores the fields this patch touches to their values in `card`.
    pub fn inverse_against(&self, card: &Card) -> CardPatch {
        CardPatch {
            title: self.title.as_ref().map(|_| card.title.clone()),
            description: self.description.as_ref().map(|_| card.description.clone()),
            priority: self.priority.map(|_| card.priority),
            due_date: self.due_date.as_ref().map(|_| card.due_date.clone()),
            assignee: self.assignee.as_ref().map(|_| card.assignee.clone()),
            labels: self.labels.as_ref().map(|_| card.labels.clone()),
            comments: self.comments.map(|_| card.comments),
            updated_at: self.updated_at.as_ref().map(|_| card.updated_at.clone()),
        }
    }

    pub(crate) fn apply_to(&self, card: &mut Card) {
        if let Some(title) = &self.title {
            card.title = title.clone();
        }
        if let Some(description) = &self.description {
            card.description = description.clone();
        }
        if let Some(priority) = self.priority {
            card.priority = priority;
        }
        if let Some(due_date) = &self.due_date {
            card.due_date = due_date.clone();
        }
        if let Some(assignee) = &self.assignee {
            card.assignee = assignee.clone();
        }
        if let Some(labels) = &self.labels {
            card.labels = labels.clone();
        }
        if let Some(comments) = self.comments {
            card.comments = comments;
        }
        if let Some(updated_at) = &self.updated_at {
            card.updated_at = updated_at.clone();
        }
    }
}

/// Partial update for a column. Cards are never replaced through a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
}

impl ColumnPatch {
    pub fn inverse_against(&self, column: &Column) -> ColumnPatch {
        ColumnPatch {
            name: self.name.as_ref().map(|_| column.name.clone()),
            position: self.position.map(|_| column.position),
            color: self.color.as_ref().map(|_| column.color.clone()),
        }
    }

    pub(crate) fn apply_to(&self, column: &mut Column) {
        if let Some(name) = &self.name {
            column.name = name.clone();
        }
        if let Some(position) = self.position {
            column.position = position;
        }
        if let Some(color) = &self.color {
            column.color = color.clone();
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: format!("User {}", id),
            email: None,
            avatar: None,
        }
    }

    pub fn card(id: &str, column_id: &str, position: f64) -> Card {
        Card {
            id: id.to_string(),
            title: format!("Card {}", id),
            description: None,
            priority: Priority::Medium,
            due_date: None,
            column_id: column_id.to_string(),
            position,
            creator: user("creator"),
            assignee: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            labels: None,
            comments: None,
        }
    }

    pub fn column(id: &str, position: f64, cards: Vec<Card>) -> Column {
        Column {
            id: id.to_string(),
            name: id.to_string(),
            position,
            cards,
            color: None,
        }
    }
}
