use serde::{Deserialize, Serialize};

/// Uniform envelope for paged results. `total` counts every row that
/// matched the query, not just the ones on this page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub total: i64,
    pub items: Vec<T>,
}

pub fn wrap<T>(total: i64, items: Vec<T>) -> Paginated<T> {
    Paginated { total, items }
}
