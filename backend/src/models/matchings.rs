use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::constants::QUICK_DURATION_UNIT_SECS;
use crate::models::members::Membership;

/// Verified user id handed to us by the auth gateway.
pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "matching_type", rename_all = "UPPERCASE")]
pub enum MatchingType {
    /// Starts now and lasts `duration` units.
    Quick,
    /// Scheduled for `matching_date`.
    Yotei,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "matching_status", rename_all = "UPPERCASE")]
pub enum MatchingStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Matching {
    pub id: Uuid,
    pub owner_id: UserId,
    pub matching_type: MatchingType,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub matching_date: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub status: MatchingStatus,
    pub created_at: DateTime<Utc>,
    /// Only loaded for single-matching lookups.
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Membership>>,
}

impl Matching {
    /// The instant after which the matching is considered over.
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        match self.matching_type {
            MatchingType::Yotei => self.matching_date,
            MatchingType::Quick => self.duration.map(|units| {
                self.created_at + Duration::seconds(i64::from(units) * QUICK_DURATION_UNIT_SECS)
            }),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ends_at().is_some_and(|end| end <= now)
    }

    pub fn is_open(&self) -> bool {
        self.status == MatchingStatus::Open
    }
}

/// Create input as sent by the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMatching {
    pub matching_type: MatchingType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub matching_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<i32>,
}
