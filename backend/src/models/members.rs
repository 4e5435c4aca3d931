use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::matchings::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub matching_id: Uuid,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

/// A member as returned by name search, with the directory display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub matching_id: Uuid,
    pub user_id: UserId,
    pub name: String,
}
