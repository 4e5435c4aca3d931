pub mod matchings;
pub mod members;

pub use matchings::{Matching, MatchingStatus, MatchingType, NewMatching, UserId};
pub use members::{MemberSummary, Membership};
