pub mod lifecycle;
pub mod membership;
pub mod pagination;
pub mod query;

pub use lifecycle::MatchingService;
pub use membership::MembershipService;
pub use pagination::{wrap, Paginated};
pub use query::{MatchingListParams, MatchingQuery, MatchingQueryBuilder};
