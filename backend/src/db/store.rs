use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Matching, MemberSummary, NewMatching, UserId};
use crate::services::query::MatchingQuery;

/// Result of [`MatchingStore::add_membership`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Added,
    /// The membership already existed.
    Duplicate,
    /// The matching was gone by the time the row was inserted.
    MissingMatching,
}

/// Persistence operations the matching services need. No business rules
/// live here; implementations only store and fetch.
#[async_trait]
pub trait MatchingStore: Send + Sync {
    /// Insert an OPEN matching owned by `owner_id`. The store assigns the id.
    async fn create_matching(
        &self,
        owner_id: UserId,
        fields: NewMatching,
        created_at: DateTime<Utc>,
    ) -> Result<Matching>;

    /// Load a matching, with its membership rows when `include_members` is set.
    async fn find_matching(&self, id: Uuid, include_members: bool) -> Result<Option<Matching>>;

    /// Total matching rows plus the requested page, read atomically.
    async fn list_matchings(&self, query: &MatchingQuery) -> Result<(i64, Vec<Matching>)>;

    /// Insert-if-absent. The outcome comes from the store's own constraints,
    /// so it stays correct under concurrent joins and deletes.
    async fn add_membership(
        &self,
        matching_id: Uuid,
        user_id: UserId,
        joined_at: DateTime<Utc>,
    ) -> Result<JoinOutcome>;

    /// Returns false when there was no such membership.
    async fn remove_membership(&self, matching_id: Uuid, user_id: UserId) -> Result<bool>;

    /// Close every OPEN matching whose window ended at or before `now`.
    async fn bulk_close_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Delete a matching and its membership rows. Returns true if it existed.
    async fn delete_matching(&self, id: Uuid) -> Result<bool>;

    /// Members of matchings `caller_id` owns or belongs to whose name
    /// contains `pattern`, case-insensitively.
    async fn search_members(&self, caller_id: UserId, pattern: &str) -> Result<Vec<MemberSummary>>;
}
