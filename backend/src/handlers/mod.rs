pub mod auth;
pub mod extract;
pub mod matchings;

use std::sync::Arc;

use crate::db::MatchingStore;
use crate::services::{MatchingQueryBuilder, MatchingService, MembershipService};
use crate::utils::{Clock, Config};

pub use auth::CallerId;
pub use matchings::{
    create_matching, delete_matching, get_matching, join_matching, leave_matching, list_matchings,
    list_my_matchings, search_members,
};

#[derive(Clone)]
pub struct AppState {
    pub matchings: MatchingService,
    pub members: MembershipService,
}

impl AppState {
    pub fn new(store: Arc<dyn MatchingStore>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            matchings: MatchingService::new(
                store.clone(),
                clock.clone(),
                MatchingQueryBuilder::from_config(config),
            ),
            members: MembershipService::new(store, clock, config.self_leave_succeeds),
        }
    }
}
