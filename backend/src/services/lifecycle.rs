use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::db::MatchingStore;
use crate::error::{MatchingError, MatchingResult};
use crate::models::{Matching, MatchingType, NewMatching, UserId};
use crate::services::pagination::{wrap, Paginated};
use crate::services::query::{MatchingListParams, MatchingQueryBuilder, StatusFilter};
use crate::utils::Clock;

/// Creation, lookup, listing, deletion and expiry of matchings.
#[derive(Clone)]
pub struct MatchingService {
    store: Arc<dyn MatchingStore>,
    clock: Arc<dyn Clock>,
    queries: MatchingQueryBuilder,
}

impl MatchingService {
    pub fn new(store: Arc<dyn MatchingStore>, clock: Arc<dyn Clock>, queries: MatchingQueryBuilder) -> Self {
        Self { store, clock, queries }
    }

    #[instrument(
        name = "matchings.create",
        skip(self, input),
        fields(matching_type = ?input.matching_type)
    )]
    pub async fn create(&self, owner_id: UserId, mut input: NewMatching) -> MatchingResult<Matching> {
        let now = self.clock.now();
        validate_new_matching(&input, now)?;
        input.title = input.title.trim().to_string();

        let matching = self.store.create_matching(owner_id, input, now).await?;

        info!(matching_id = %matching.id, "Created matching");
        Ok(matching)
    }

    /// A matching with its members. Never changes status.
    pub async fn find_one(&self, id: Uuid) -> MatchingResult<Matching> {
        self.store
            .find_matching(id, true)
            .await?
            .ok_or(MatchingError::NotFound(id))
    }

    /// Public listing; only OPEN matchings unless `status` says otherwise.
    pub async fn list(&self, params: &MatchingListParams) -> MatchingResult<Paginated<Matching>> {
        let query = self.queries.build(params, StatusFilter::default())?;
        let (total, items) = self.store.list_matchings(&query).await?;
        debug!(total, returned = items.len(), "Listed matchings");
        Ok(wrap(total, items))
    }

    /// The caller's own matchings, any status unless `status` says otherwise.
    pub async fn list_owned(
        &self,
        caller_id: UserId,
        params: &MatchingListParams,
    ) -> MatchingResult<Paginated<Matching>> {
        let mut query = self.queries.build(params, StatusFilter::Any)?;
        query.predicate.owner_id = Some(caller_id);
        let (total, items) = self.store.list_matchings(&query).await?;
        Ok(wrap(total, items))
    }

    #[instrument(name = "matchings.remove", skip(self))]
    pub async fn remove(&self, id: Uuid, caller_id: UserId) -> MatchingResult<()> {
        let matching = self
            .store
            .find_matching(id, false)
            .await?
            .ok_or(MatchingError::NotFound(id))?;

        if matching.owner_id != caller_id {
            warn!(owner_id = matching.owner_id, "Non-owner tried to delete matching");
            return Err(MatchingError::forbidden("only the owner may delete a matching"));
        }

        if !self.store.delete_matching(id).await? {
            // Deleted concurrently
            return Err(MatchingError::NotFound(id));
        }

        info!("Deleted matching");
        Ok(())
    }

    /// Close every OPEN matching whose window has elapsed. Safe to run
    /// repeatedly or concurrently with other requests.
    pub async fn sweep_expired(&self) -> MatchingResult<u64> {
        let now = self.clock.now();
        let closed = self.store.bulk_close_expired(now).await?;
        if closed > 0 {
            info!(closed, %now, "Closed expired matchings");
        }
        Ok(closed)
    }
}

fn validate_new_matching(input: &NewMatching, now: DateTime<Utc>) -> MatchingResult<()> {
    let missing = match input.matching_type {
        MatchingType::Quick => input.duration.is_none(),
        MatchingType::Yotei => input.matching_date.is_none(),
    };
    if missing {
        return Err(MatchingError::validation("missing duration or matching date"));
    }

    if input.duration.is_some_and(|d| d < 0) {
        return Err(MatchingError::validation("invalid duration"));
    }

    if input.matching_date.is_some_and(|date| date <= now) {
        return Err(MatchingError::validation("invalid matching date"));
    }

    let contradictory = match input.matching_type {
        MatchingType::Quick => input.matching_date.is_some(),
        MatchingType::Yotei => input.duration.is_some(),
    };
    if contradictory {
        return Err(MatchingError::validation(
            "a QUICK matching takes only a duration and a YOTEI matching only a matching date",
        ));
    }

    if input.title.trim().is_empty() {
        return Err(MatchingError::validation("title must not be empty"));
    }

    Ok(())
}
