use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::db::{JoinOutcome, MatchingStore};
use crate::error::{MatchingError, MatchingResult};
use crate::models::{Matching, MemberSummary, UserId};
use crate::utils::Clock;

/// Join, leave/evict and member search.
#[derive(Clone)]
pub struct MembershipService {
    store: Arc<dyn MatchingStore>,
    clock: Arc<dyn Clock>,
    /// When false, a member leaving on their own is removed and then told
    /// "not allowed operation", which is what existing clients expect.
    self_leave_succeeds: bool,
}

impl MembershipService {
    pub fn new(store: Arc<dyn MatchingStore>, clock: Arc<dyn Clock>, self_leave_succeeds: bool) -> Self {
        Self {
            store,
            clock,
            self_leave_succeeds,
        }
    }

    async fn existing(&self, matching_id: Uuid) -> MatchingResult<Matching> {
        self.store
            .find_matching(matching_id, false)
            .await?
            .ok_or(MatchingError::NotFound(matching_id))
    }

    #[instrument(name = "matchings.join", skip(self))]
    pub async fn join(&self, matching_id: Uuid, user_id: UserId) -> MatchingResult<()> {
        let matching = self.existing(matching_id).await?;

        if !matching.is_open() {
            debug!("Rejected join on closed matching");
            return Err(MatchingError::conflict("matching is closed"));
        }

        // The store's constraints decide, so concurrent duplicates get exactly
        // one winner and a delete racing this join still reads as NotFound
        match self
            .store
            .add_membership(matching_id, user_id, self.clock.now())
            .await?
        {
            JoinOutcome::Added => {
                info!("User joined matching");
                Ok(())
            }
            JoinOutcome::Duplicate => {
                debug!("Rejected duplicate join");
                Err(MatchingError::conflict("already joined"))
            }
            JoinOutcome::MissingMatching => {
                debug!("Matching deleted before the join landed");
                Err(MatchingError::NotFound(matching_id))
            }
        }
    }

    /// Owner evicting `target_user_id`, or the caller leaving.
    #[instrument(name = "matchings.leave", skip(self))]
    pub async fn leave(
        &self,
        matching_id: Uuid,
        caller_id: UserId,
        target_user_id: Option<UserId>,
    ) -> MatchingResult<()> {
        let matching = self.existing(matching_id).await?;

        if caller_id == matching.owner_id {
            if let Some(target) = target_user_id {
                let removed = self.store.remove_membership(matching_id, target).await?;
                info!(target_user_id = target, removed, "Owner removed member");
                return Ok(());
            }
        }

        let removed = self.store.remove_membership(matching_id, caller_id).await?;
        info!(removed, "Member left matching");

        if self.self_leave_succeeds {
            return Ok(());
        }
        Err(MatchingError::forbidden("not allowed operation"))
    }

    pub async fn search_members_by_name(
        &self,
        caller_id: UserId,
        name_pattern: &str,
    ) -> MatchingResult<Vec<MemberSummary>> {
        let pattern = name_pattern.trim();
        if pattern.is_empty() {
            return Err(MatchingError::validation("name pattern must not be empty"));
        }

        Ok(self.store.search_members(caller_id, pattern).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryMatchingStore;
    use crate::models::{MatchingStatus, MatchingType, NewMatching};
    use crate::services::query::MatchingQuery;
    use crate::utils::ManualClock;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const OWNER: UserId = 1;
    const ALICE: UserId = 2;
    const BOB: UserId = 3;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap()
    }

    fn badminton() -> NewMatching {
        NewMatching {
            matching_type: MatchingType::Quick,
            title: "badminton".to_string(),
            description: None,
            location: None,
            matching_date: None,
            duration: Some(60),
        }
    }

    async fn setup(self_leave_succeeds: bool) -> (MembershipService, Arc<InMemoryMatchingStore>, Matching) {
        let store = Arc::new(InMemoryMatchingStore::new());
        store.insert_user(OWNER, "Owner Ogawa").await;
        store.insert_user(ALICE, "Alice Aoki").await;
        store.insert_user(BOB, "Bob Ban").await;

        let matching = store.create_matching(OWNER, badminton(), start()).await.unwrap();

        let clock = Arc::new(ManualClock::new(start() + Duration::minutes(5)));
        (MembershipService::new(store.clone(), clock, self_leave_succeeds), store, matching)
    }

    async fn member_ids(store: &InMemoryMatchingStore, matching_id: Uuid) -> Vec<UserId> {
        store
            .find_matching(matching_id, true)
            .await
            .unwrap()
            .and_then(|m| m.members)
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.user_id)
            .collect()
    }

    #[tokio::test]
    async fn test_join_unknown_matching_is_not_found() {
        let (service, _, _) = setup(false).await;
        assert!(matches!(service.join(Uuid::new_v4(), ALICE).await, Err(MatchingError::NotFound(_))));
    }

    /// Deletes each matching right after handing it out, so a join's
    /// insert lands on a row that no longer exists.
    struct DeletedAfterReadStore {
        inner: Arc<InMemoryMatchingStore>,
    }

    #[async_trait]
    impl MatchingStore for DeletedAfterReadStore {
        async fn create_matching(
            &self,
            owner_id: UserId,
            fields: NewMatching,
            created_at: DateTime<Utc>,
        ) -> anyhow::Result<Matching> {
            self.inner.create_matching(owner_id, fields, created_at).await
        }

        async fn find_matching(&self, id: Uuid, include_members: bool) -> anyhow::Result<Option<Matching>> {
            let found = self.inner.find_matching(id, include_members).await?;
            self.inner.delete_matching(id).await?;
            Ok(found)
        }

        async fn list_matchings(&self, query: &MatchingQuery) -> anyhow::Result<(i64, Vec<Matching>)> {
            self.inner.list_matchings(query).await
        }

        async fn add_membership(
            &self,
            matching_id: Uuid,
            user_id: UserId,
            joined_at: DateTime<Utc>,
        ) -> anyhow::Result<JoinOutcome> {
            self.inner.add_membership(matching_id, user_id, joined_at).await
        }

        async fn remove_membership(&self, matching_id: Uuid, user_id: UserId) -> anyhow::Result<bool> {
            self.inner.remove_membership(matching_id, user_id).await
        }

        async fn bulk_close_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
            self.inner.bulk_close_expired(now).await
        }

        async fn delete_matching(&self, id: Uuid) -> anyhow::Result<bool> {
            self.inner.delete_matching(id).await
        }

        async fn search_members(&self, caller_id: UserId, pattern: &str) -> anyhow::Result<Vec<MemberSummary>> {
            self.inner.search_members(caller_id, pattern).await
        }
    }

    #[tokio::test]
    async fn test_join_racing_a_delete_is_not_found() {
        let inner = Arc::new(InMemoryMatchingStore::new());
        let matching = inner.create_matching(OWNER, badminton(), start()).await.unwrap();
        let store = Arc::new(DeletedAfterReadStore { inner: inner.clone() });
        let service = MembershipService::new(store, Arc::new(ManualClock::new(start())), false);

        match service.join(matching.id, ALICE).await {
            Err(MatchingError::NotFound(id)) => assert_eq!(id, matching.id),
            other => panic!("expected not found, got {other:?}"),
        }
        assert!(inner.find_matching(matching.id, true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_joined_at_comes_from_the_service_clock() {
        let (service, store, matching) = setup(false).await;
        service.join(matching.id, ALICE).await.unwrap();

        let loaded = store.find_matching(matching.id, true).await.unwrap().unwrap();
        let members = loaded.members.unwrap();
        assert_eq!(members[0].joined_at, start() + Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_second_join_by_same_user_conflicts() {
        let (service, store, matching) = setup(false).await;
        service.join(matching.id, ALICE).await.unwrap();
        match service.join(matching.id, ALICE).await {
            Err(MatchingError::Conflict(message)) => assert_eq!(message, "already joined"),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(member_ids(&store, matching.id).await, vec![ALICE]);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_joins_have_one_winner() {
        let (service, store, matching) = setup(false).await;
        let (a, b) = tokio::join!(service.join(matching.id, BOB), service.join(matching.id, BOB));

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        let conflicts = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(MatchingError::Conflict(_))))
            .count();
        assert_eq!((successes, conflicts), (1, 1));
        assert_eq!(member_ids(&store, matching.id).await, vec![BOB]);
    }

    #[tokio::test]
    async fn test_join_after_sweep_closed_it_is_rejected() {
        let (service, store, matching) = setup(false).await;
        let after_end = matching.created_at + Duration::minutes(61);
        assert_eq!(store.bulk_close_expired(after_end).await.unwrap(), 1);

        let closed = store.find_matching(matching.id, false).await.unwrap().unwrap();
        assert_eq!(closed.status, MatchingStatus::Closed);
        match service.join(matching.id, ALICE).await {
            Err(MatchingError::Conflict(message)) => assert_eq!(message, "matching is closed"),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(member_ids(&store, matching.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_owner_can_join_own_matching() {
        let (service, store, matching) = setup(false).await;
        service.join(matching.id, OWNER).await.unwrap();
        assert_eq!(member_ids(&store, matching.id).await, vec![OWNER]);
    }

    #[tokio::test]
    async fn test_owner_evicts_member() {
        let (service, store, matching) = setup(false).await;
        service.join(matching.id, ALICE).await.unwrap();
        service.join(matching.id, BOB).await.unwrap();

        service.leave(matching.id, OWNER, Some(ALICE)).await.unwrap();
        assert_eq!(member_ids(&store, matching.id).await, vec![BOB]);
    }

    #[tokio::test]
    async fn test_owner_evicting_non_member_is_a_silent_no_op() {
        let (service, store, matching) = setup(false).await;
        service.join(matching.id, BOB).await.unwrap();

        assert!(service.leave(matching.id, OWNER, Some(ALICE)).await.is_ok());
        assert_eq!(member_ids(&store, matching.id).await, vec![BOB]);
    }

    #[tokio::test]
    async fn test_self_leave_removes_membership_then_reports_forbidden() {
        let (service, store, matching) = setup(false).await;
        service.join(matching.id, ALICE).await.unwrap();

        match service.leave(matching.id, ALICE, None).await {
            Err(MatchingError::Forbidden(message)) => assert_eq!(message, "not allowed operation"),
            other => panic!("expected forbidden, got {other:?}"),
        }
        // The removal sticks despite the error
        assert!(member_ids(&store, matching.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_owner_target_is_ignored_and_caller_leaves() {
        let (service, store, matching) = setup(false).await;
        service.join(matching.id, ALICE).await.unwrap();
        service.join(matching.id, BOB).await.unwrap();

        let result = service.leave(matching.id, ALICE, Some(BOB)).await;
        assert!(matches!(result, Err(MatchingError::Forbidden(_))));
        assert_eq!(member_ids(&store, matching.id).await, vec![BOB]);
    }

    #[tokio::test]
    async fn test_self_leave_succeeds_when_configured() {
        let (service, store, matching) = setup(true).await;
        service.join(matching.id, ALICE).await.unwrap();

        service.leave(matching.id, ALICE, None).await.unwrap();
        assert!(member_ids(&store, matching.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_leave_unknown_matching_is_not_found() {
        let (service, _, _) = setup(true).await;
        assert!(matches!(
            service.leave(Uuid::new_v4(), OWNER, Some(ALICE)).await,
            Err(MatchingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_requires_pattern() {
        let (service, _, _) = setup(false).await;
        for blank in ["", "   "] {
            assert!(matches!(
                service.search_members_by_name(OWNER, blank).await,
                Err(MatchingError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_scoped_to_callers_matchings() {
        let (service, store, matching) = setup(false).await;
        service.join(matching.id, ALICE).await.unwrap();
        service.join(matching.id, BOB).await.unwrap();

        // Owner sees members by substring, any case
        let found = service.search_members_by_name(OWNER, "aOk").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id, ALICE);
        assert_eq!(found[0].name, "Alice Aoki");
        assert_eq!(found[0].matching_id, matching.id);

        // A member sees fellow members
        let found = service.search_members_by_name(BOB, "alice").await.unwrap();
        assert_eq!(found.len(), 1);

        // An outsider sees nothing
        store.insert_user(99, "Outsider").await;
        assert!(service.search_members_by_name(99, "a").await.unwrap().is_empty());
    }
}
