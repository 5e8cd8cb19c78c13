// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity and lifecycle timestamps shared by every persisted record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Embedded (flattened) into each stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    /// Assigned by the store at insert; `0` until then
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    pub fn new(id: u64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Metadata for a record that has not been inserted yet.
    pub fn unsaved() -> Self {
        Self::new(0, Utc::now())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_stamps() {
        let created = Utc::now();
        let mut meta = RecordMeta::new(5, created);
        assert!(!meta.is_deleted());

        let later = created + chrono::Duration::seconds(10);
        meta.mark_deleted(later);
        assert!(meta.is_deleted());
        assert_eq!(meta.updated_at, later);
        assert_eq!(meta.created_at, created);
    }

    #[test]
    fn deleted_at_omitted_until_set() {
        let meta = RecordMeta::new(1, Utc::now());
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("deletedAt").is_none());
        assert_eq!(json["id"], 1);
    }
}
