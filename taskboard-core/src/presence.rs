/// Presence registry: who is looking at the board right now.
///
/// Join overwrites any previous entry for the user. Cursor and heartbeat
/// events for users that never joined are dropped, not queued.
/// Entries never expire on their own; `expire_idle` is run by the caller on
/// its heartbeat cadence.
use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BoardError;
use crate::types::{Cursor, OnlineUser};

/// Human label for time since last activity.
///
/// Floor division at every step: <10s "just now", <60s "Ns ago",
/// <60m "Nm ago", <24h "Nh ago", else "recently".
pub fn relative_time_label(elapsed_ms: i64) -> String {
    let seconds = elapsed_ms.div_euclid(1000);
    let minutes = seconds.div_euclid(60);
    let hours = minutes.div_euclid(60);

    if seconds < 10 {
        "just now".to_string()
    } else if seconds < 60 {
        format!("{}s ago", seconds)
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else {
        "recently".to_string()
    }
}

/// The avatar stack: the most recently active users plus an overflow count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSummary {
    pub visible: Vec<OnlineUser>,
    pub remaining: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PresenceRegistry {
    /// user_id -> entry
    users: HashMap<String, OnlineUser>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a user, stamping `last_activity = now`.
    pub fn add_online_user(&mut self, mut user: OnlineUser, now: i64) {
        user.last_activity = now;
        self.users.insert(user.id.clone(), user);
    }

    /// Idempotent. Returns the removed entry, if there was one.
    pub fn remove_online_user(&mut self, user_id: &str) -> Option<OnlineUser> {
        self.users.remove(user_id)
    }

    pub fn update_user_cursor(&mut self, user_id: &str, x: f64, y: f64, now: i64) -> Result<(), BoardError> {
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| BoardError::UserNotFound(user_id.to_string()))?;
        user.cursor = Some(Cursor { x, y });
        user.last_activity = now;
        Ok(())
    }

    /// Heartbeat without cursor movement.
    pub fn touch(&mut self, user_id: &str, now: i64) -> Result<(), BoardError> {
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| BoardError::UserNotFound(user_id.to_string()))?;
        user.last_activity = now;
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Option<OnlineUser> {
        self.users.get(user_id).cloned()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Owned copy of every entry, in no particular order.
    pub fn users(&self) -> Vec<OnlineUser> {
        self.users.values().cloned().collect()
    }

    /// Entries sorted by `last_activity` descending, ties by id.
    pub fn recently_active(&self) -> Vec<OnlineUser> {
        let mut users = self.users();
        users.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then_with(|| a.id.cmp(&b.id))
        });
        users
    }

    pub fn summary(&self, max_visible: usize) -> PresenceSummary {
        let mut visible = self.recently_active();
        let total = visible.len();
        visible.truncate(max_visible);
        PresenceSummary {
            remaining: total - visible.len(),
            visible,
            total,
        }
    }

    /// Drop users idle for at least `ttl`. Returns the removed ids, sorted.
    pub fn expire_idle(&mut self, now: i64, ttl: Duration) -> Vec<String> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let mut expired = Vec::new();
        self.users.retain(|id, user| {
            let keep = now.saturating_sub(user.last_activity) < ttl_ms;
            if !keep {
                expired.push(id.clone());
            }
            keep
        });
        expired.sort();
        expired
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}
