use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::store::{JoinOutcome, MatchingStore};
use crate::models::{Matching, MatchingStatus, MemberSummary, Membership, NewMatching, UserId};
use crate::services::query::MatchingQuery;

#[derive(Debug, Default)]
struct MemoryState {
    matchings: HashMap<Uuid, Matching>,
    /// In join order.
    members: Vec<Membership>,
    /// Stand-in for the user directory: id -> display name.
    users: HashMap<UserId, String>,
}

impl MemoryState {
    fn has_member(&self, matching_id: Uuid, user_id: UserId) -> bool {
        self.members
            .iter()
            .any(|m| m.matching_id == matching_id && m.user_id == user_id)
    }
}

/// Process-local [`MatchingStore`]. Every operation holds one lock, so
/// count+page reads and insert-if-absent joins are atomic.
#[derive(Debug, Default)]
pub struct InMemoryMatchingStore {
    state: Mutex<MemoryState>,
}

impl InMemoryMatchingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display name, as the account service would.
    pub async fn insert_user(&self, id: UserId, name: impl Into<String>) {
        self.state.lock().await.users.insert(id, name.into());
    }
}

#[async_trait]
impl MatchingStore for InMemoryMatchingStore {
    async fn create_matching(
        &self,
        owner_id: UserId,
        fields: NewMatching,
        created_at: DateTime<Utc>,
    ) -> Result<Matching> {
        let matching = Matching {
            id: Uuid::new_v4(),
            owner_id,
            matching_type: fields.matching_type,
            title: fields.title,
            description: fields.description,
            location: fields.location,
            matching_date: fields.matching_date,
            duration: fields.duration,
            status: MatchingStatus::Open,
            created_at,
            members: None,
        };

        self.state
            .lock()
            .await
            .matchings
            .insert(matching.id, matching.clone());

        Ok(matching)
    }

    async fn find_matching(&self, id: Uuid, include_members: bool) -> Result<Option<Matching>> {
        let state = self.state.lock().await;
        let Some(mut matching) = state.matchings.get(&id).cloned() else {
            return Ok(None);
        };

        if include_members {
            let members = state
                .members
                .iter()
                .filter(|m| m.matching_id == id)
                .cloned()
                .collect();
            matching.members = Some(members);
        }

        Ok(Some(matching))
    }

    async fn list_matchings(&self, query: &MatchingQuery) -> Result<(i64, Vec<Matching>)> {
        let state = self.state.lock().await;

        let mut found: Vec<&Matching> = state
            .matchings
            .values()
            .filter(|m| {
                let owner_name = state.users.get(&m.owner_id).map(String::as_str);
                query.predicate.matches(m, owner_name)
            })
            .collect();
        found.sort_by(|a, b| query.sort.compare(a, b));

        let total = found.len() as i64;
        let items = found
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((total, items))
    }

    async fn add_membership(
        &self,
        matching_id: Uuid,
        user_id: UserId,
        joined_at: DateTime<Utc>,
    ) -> Result<JoinOutcome> {
        let mut state = self.state.lock().await;

        if !state.matchings.contains_key(&matching_id) {
            return Ok(JoinOutcome::MissingMatching);
        }
        if state.has_member(matching_id, user_id) {
            return Ok(JoinOutcome::Duplicate);
        }

        state.members.push(Membership {
            matching_id,
            user_id,
            joined_at,
        });
        Ok(JoinOutcome::Added)
    }

    async fn remove_membership(&self, matching_id: Uuid, user_id: UserId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.members.len();
        state
            .members
            .retain(|m| !(m.matching_id == matching_id && m.user_id == user_id));
        Ok(state.members.len() < before)
    }

    async fn bulk_close_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut closed = 0;
        for matching in state.matchings.values_mut() {
            if matching.is_open() && matching.is_expired(now) {
                matching.status = MatchingStatus::Closed;
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn delete_matching(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let existed = state.matchings.remove(&id).is_some();
        state.members.retain(|m| m.matching_id != id);
        Ok(existed)
    }

    async fn search_members(&self, caller_id: UserId, pattern: &str) -> Result<Vec<MemberSummary>> {
        let state = self.state.lock().await;
        let needle = pattern.to_lowercase();

        let in_scope = |matching_id: Uuid| {
            state
                .matchings
                .get(&matching_id)
                .is_some_and(|m| m.owner_id == caller_id)
                || state.has_member(matching_id, caller_id)
        };

        let mut found: Vec<MemberSummary> = state
            .members
            .iter()
            .filter(|m| in_scope(m.matching_id))
            .filter_map(|m| {
                let name = state.users.get(&m.user_id)?;
                name.to_lowercase().contains(&needle).then(|| MemberSummary {
                    matching_id: m.matching_id,
                    user_id: m.user_id,
                    name: name.clone(),
                })
            })
            .collect();
        found.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.matching_id.cmp(&b.matching_id))
                .then(a.user_id.cmp(&b.user_id))
        });

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchingType;
    use crate::services::query::{MatchingPredicate, Sort, StatusFilter, TimeRange};
    use chrono::{Duration, TimeZone};

    fn quick(title: &str, duration: i32) -> NewMatching {
        NewMatching {
            matching_type: MatchingType::Quick,
            title: title.to_string(),
            description: None,
            location: None,
            matching_date: None,
            duration: Some(duration),
        }
    }

    fn query(predicate: MatchingPredicate, limit: i64, offset: i64) -> MatchingQuery {
        MatchingQuery {
            predicate,
            sort: Sort::default(),
            limit,
            offset,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_list_pages_newest_first_with_full_total() {
        let store = InMemoryMatchingStore::new();
        for i in 0..5 {
            store
                .create_matching(1, quick(&format!("m{i}"), 30), t0() + Duration::minutes(i))
                .await
                .unwrap();
        }

        let (total, items) = store
            .list_matchings(&query(MatchingPredicate::default(), 2, 1))
            .await
            .unwrap();
        assert_eq!(total, 5);
        let titles: Vec<_> = items.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["m3", "m2"]);
    }

    #[tokio::test]
    async fn test_created_bounds_are_after_inclusive_before_exclusive() {
        let store = InMemoryMatchingStore::new();
        store.create_matching(1, quick("at-start", 30), t0()).await.unwrap();
        store
            .create_matching(1, quick("at-end", 30), t0() + Duration::hours(1))
            .await
            .unwrap();

        let predicate = MatchingPredicate {
            created_at: TimeRange {
                after: Some(t0()),
                before: Some(t0() + Duration::hours(1)),
            },
            ..Default::default()
        };
        let (total, items) = store.list_matchings(&query(predicate, 10, 0)).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].title, "at-start");
    }

    #[tokio::test]
    async fn test_owner_name_filter_uses_directory() {
        let store = InMemoryMatchingStore::new();
        store.insert_user(1, "Tanaka").await;
        store.insert_user(2, "Suzuki").await;
        store.create_matching(1, quick("a", 30), t0()).await.unwrap();
        store.create_matching(2, quick("b", 30), t0()).await.unwrap();
        store.create_matching(3, quick("unknown owner", 30), t0()).await.unwrap();

        let predicate = MatchingPredicate {
            owner_name: Some("tana".to_string()),
            status: StatusFilter::Any,
            ..Default::default()
        };
        let (total, items) = store.list_matchings(&query(predicate, 10, 0)).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].owner_id, 1);
    }

    #[tokio::test]
    async fn test_membership_rows_are_unique_and_cascade_on_delete() {
        let store = InMemoryMatchingStore::new();
        let m = store.create_matching(1, quick("a", 30), t0()).await.unwrap();

        assert_eq!(store.add_membership(m.id, 2, t0()).await.unwrap(), JoinOutcome::Added);
        assert_eq!(store.add_membership(m.id, 2, t0()).await.unwrap(), JoinOutcome::Duplicate);
        assert_eq!(store.add_membership(m.id, 3, t0()).await.unwrap(), JoinOutcome::Added);

        let loaded = store.find_matching(m.id, true).await.unwrap().unwrap();
        assert_eq!(loaded.members.as_ref().map(Vec::len), Some(2));
        let bare = store.find_matching(m.id, false).await.unwrap().unwrap();
        assert!(bare.members.is_none());

        assert!(store.delete_matching(m.id).await.unwrap());
        assert!(!store.remove_membership(m.id, 2).await.unwrap());
        assert_eq!(
            store.add_membership(m.id, 2, t0()).await.unwrap(),
            JoinOutcome::MissingMatching
        );
    }

    #[tokio::test]
    async fn test_bulk_close_only_touches_expired_open_rows() {
        let store = InMemoryMatchingStore::new();
        let short = store.create_matching(1, quick("short", 10), t0()).await.unwrap();
        let long = store.create_matching(1, quick("long", 120), t0()).await.unwrap();

        let now = t0() + Duration::minutes(10);
        assert_eq!(store.bulk_close_expired(now).await.unwrap(), 1);
        assert_eq!(store.bulk_close_expired(now).await.unwrap(), 0);

        let short = store.find_matching(short.id, false).await.unwrap().unwrap();
        let long = store.find_matching(long.id, false).await.unwrap().unwrap();
        assert_eq!(short.status, MatchingStatus::Closed);
        assert_eq!(long.status, MatchingStatus::Open);
    }
}
