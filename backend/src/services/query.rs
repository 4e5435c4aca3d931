//! Turns optional list parameters into a typed, validated [`MatchingQuery`].
//!
//! Bound convention for every time range: the `*After` bound is inclusive
//! and the `*Before` bound is exclusive, i.e. `after <= t < before`.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{MatchingError, MatchingResult};
use crate::models::{Matching, MatchingStatus, UserId};
use crate::utils::Config;

/// Raw list parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingListParams {
    pub owner_name: Option<String>,
    pub match_before: Option<String>,
    pub match_after: Option<String>,
    pub created_before: Option<String>,
    pub created_after: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Only(MatchingStatus),
    Any,
}

impl StatusFilter {
    pub fn allows(&self, status: MatchingStatus) -> bool {
        match self {
            StatusFilter::Only(wanted) => *wanted == status,
            StatusFilter::Any => true,
        }
    }
}

impl Default for StatusFilter {
    fn default() -> Self {
        StatusFilter::Only(MatchingStatus::Open)
    }
}

/// `after <= t < before`; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn is_unbounded(&self) -> bool {
        self.after.is_none() && self.before.is_none()
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.after.is_none_or(|after| t >= after) && self.before.is_none_or(|before| t < before)
    }

    /// A missing timestamp only satisfies an unbounded range.
    pub fn contains_opt(&self, t: Option<DateTime<Utc>>) -> bool {
        match t {
            Some(t) => self.contains(t),
            None => self.is_unbounded(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchingPredicate {
    pub owner_id: Option<UserId>,
    /// Case-insensitive substring of the owner's directory name.
    pub owner_name: Option<String>,
    pub status: StatusFilter,
    pub matching_date: TimeRange,
    pub created_at: TimeRange,
}

impl MatchingPredicate {
    /// Evaluates the predicate in memory. `owner_name` is the owner's
    /// directory name, if the directory knows the owner.
    pub fn matches(&self, matching: &Matching, owner_name: Option<&str>) -> bool {
        if self.owner_id.is_some_and(|id| id != matching.owner_id) {
            return false;
        }
        if let Some(pattern) = &self.owner_name {
            let found = owner_name
                .is_some_and(|name| name.to_lowercase().contains(&pattern.to_lowercase()));
            if !found {
                return false;
            }
        }
        self.status.allows(matching.status)
            && self.matching_date.contains_opt(matching.matching_date)
            && self.created_at.contains(matching.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    MatchingDate,
}

impl SortField {
    /// Whitelisted column name for ORDER BY.
    pub const fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "m.created_at",
            SortField::MatchingDate => "m.matching_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl Sort {
    /// Ordering used by the in-memory store; mirrors the SQL ORDER BY
    /// (`NULLS LAST` in both directions, ties broken by id).
    pub fn compare(&self, a: &Matching, b: &Matching) -> Ordering {
        let primary = match self.field {
            SortField::CreatedAt => self.direction.apply(a.created_at.cmp(&b.created_at)),
            SortField::MatchingDate => match (a.matching_date, b.matching_date) {
                (Some(x), Some(y)) => self.direction.apply(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then_with(|| self.direction.apply(a.id.cmp(&b.id)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingQuery {
    pub predicate: MatchingPredicate,
    pub sort: Sort,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct MatchingQueryBuilder {
    default_limit: i64,
    max_limit: i64,
    timezone: Tz,
}

impl MatchingQueryBuilder {
    pub fn new(default_limit: i64, max_limit: i64, timezone: Tz) -> Self {
        Self {
            default_limit,
            max_limit,
            timezone,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_page_size, config.max_page_size, config.filter_timezone)
    }

    /// `default_status` applies when the request does not name a status.
    pub fn build(
        &self,
        params: &MatchingListParams,
        default_status: StatusFilter,
    ) -> MatchingResult<MatchingQuery> {
        let matching_date = self.range(
            ("matchAfter", params.match_after.as_deref()),
            ("matchBefore", params.match_before.as_deref()),
        )?;
        let created_at = self.range(
            ("createdAfter", params.created_after.as_deref()),
            ("createdBefore", params.created_before.as_deref()),
        )?;

        let status = match non_blank(params.status.as_deref()) {
            Some(raw) => parse_status(raw)?,
            None => default_status,
        };

        let owner_name = non_blank(params.owner_name.as_deref()).map(str::to_string);

        let limit = match params.limit {
            None => self.default_limit,
            Some(limit) if limit <= 0 => {
                return Err(MatchingError::validation("limit must be a positive integer"));
            }
            Some(limit) => limit.min(self.max_limit),
        };
        let offset = match params.offset {
            None => 0,
            Some(offset) if offset < 0 => {
                return Err(MatchingError::validation("offset must not be negative"));
            }
            Some(offset) => offset,
        };

        let sort = match non_blank(params.sort.as_deref()) {
            Some(raw) => parse_sort(raw)?,
            None => Sort::default(),
        };

        Ok(MatchingQuery {
            predicate: MatchingPredicate {
                owner_id: None,
                owner_name,
                status,
                matching_date,
                created_at,
            },
            sort,
            limit,
            offset,
        })
    }

    fn range(&self, after: (&str, Option<&str>), before: (&str, Option<&str>)) -> MatchingResult<TimeRange> {
        let range = TimeRange {
            after: self.parse_instant(after.0, after.1)?,
            before: self.parse_instant(before.0, before.1)?,
        };
        if let (Some(a), Some(b)) = (range.after, range.before) {
            if a >= b {
                return Err(MatchingError::validation(format!(
                    "`{}` must be earlier than `{}`",
                    after.0, before.0
                )));
            }
        }
        Ok(range)
    }

    /// Accepts RFC 3339 timestamps, or `YYYY-MM-DD` meaning local midnight
    /// in the configured timezone.
    fn parse_instant(&self, name: &str, raw: Option<&str>) -> MatchingResult<Option<DateTime<Utc>>> {
        let Some(raw) = non_blank(raw) else {
            return Ok(None);
        };

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(ts.with_timezone(&Utc)));
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(start) = self.start_of_day(date) {
                return Ok(Some(start));
            }
        }

        Err(MatchingError::validation(format!("invalid date for `{}`: '{}'", name, raw)))
    }

    /// First instant of `date` in the filter timezone. When a DST change
    /// skips midnight, the day starts where the gap ends.
    fn start_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let midnight = date.and_time(NaiveTime::MIN);
        (0..=24 * 4)
            .map(|quarter| midnight + Duration::minutes(15 * quarter))
            .find_map(|local| self.timezone.from_local_datetime(&local).earliest())
            .map(|start| start.with_timezone(&Utc))
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_status(raw: &str) -> MatchingResult<StatusFilter> {
    match raw.to_ascii_lowercase().as_str() {
        "open" => Ok(StatusFilter::Only(MatchingStatus::Open)),
        "closed" => Ok(StatusFilter::Only(MatchingStatus::Closed)),
        "all" | "any" => Ok(StatusFilter::Any),
        _ => Err(MatchingError::validation(format!("invalid status: '{}'", raw))),
    }
}

/// `field`, `-field`, or `field:asc|desc`.
fn parse_sort(raw: &str) -> MatchingResult<Sort> {
    let (field, direction) = if let Some((field, direction)) = raw.split_once(':') {
        let direction = match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(MatchingError::validation(format!("invalid sort direction: '{}'", direction))),
        };
        (field.trim(), direction)
    } else if let Some(field) = raw.strip_prefix('-') {
        (field, SortDirection::Desc)
    } else {
        (raw.strip_prefix('+').unwrap_or(raw), SortDirection::Asc)
    };

    let field = match field {
        "createdAt" | "created_at" => SortField::CreatedAt,
        "matchingDate" | "matching_date" => SortField::MatchingDate,
        _ => return Err(MatchingError::validation(format!("invalid sort field: '{}'", field))),
    };

    Ok(Sort { field, direction })
}
