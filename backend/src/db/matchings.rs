use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::constants::QUICK_DURATION_UNIT_SECS;
use crate::db::store::{JoinOutcome, MatchingStore};
use crate::models::{Matching, MemberSummary, Membership, NewMatching, UserId};
use crate::services::query::{MatchingPredicate, MatchingQuery, StatusFilter, TimeRange};

/// Postgres-backed [`MatchingStore`].
#[derive(Debug, Clone)]
pub struct PgMatchingStore {
    pool: PgPool,
}

impl PgMatchingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_MATCHINGS: &str = r#"
    SELECT m.id, m.owner_id, m.matching_type, m.title, m.description, m.location,
           m.matching_date, m.duration, m.status, m.created_at
    FROM matchings m
    LEFT JOIN users u ON u.id = m.owner_id
"#;

const COUNT_MATCHINGS: &str = r#"
    SELECT COUNT(*)
    FROM matchings m
    LEFT JOIN users u ON u.id = m.owner_id
"#;

#[async_trait]
impl MatchingStore for PgMatchingStore {
    async fn create_matching(
        &self,
        owner_id: UserId,
        fields: NewMatching,
        created_at: DateTime<Utc>,
    ) -> Result<Matching> {
        let matching = sqlx::query_as::<_, Matching>(
            r#"
            INSERT INTO matchings
                (owner_id, matching_type, title, description, location, matching_date, duration, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'OPEN', $8)
            RETURNING id, owner_id, matching_type, title, description, location,
                      matching_date, duration, status, created_at
            "#,
        )
        .bind(owner_id)
        .bind(fields.matching_type)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.location)
        .bind(fields.matching_date)
        .bind(fields.duration)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(matching)
    }

    async fn find_matching(&self, id: Uuid, include_members: bool) -> Result<Option<Matching>> {
        let matching = sqlx::query_as::<_, Matching>(
            r#"
            SELECT id, owner_id, matching_type, title, description, location,
                   matching_date, duration, status, created_at
            FROM matchings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut matching) = matching else {
            return Ok(None);
        };

        if include_members {
            let members = sqlx::query_as::<_, Membership>(
                r#"
                SELECT matching_id, user_id, joined_at
                FROM matching_members
                WHERE matching_id = $1
                ORDER BY joined_at ASC, user_id ASC
                "#,
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
            matching.members = Some(members);
        }

        Ok(Some(matching))
    }

    async fn list_matchings(&self, query: &MatchingQuery) -> Result<(i64, Vec<Matching>)> {
        let mut count = QueryBuilder::<Postgres>::new(COUNT_MATCHINGS);
        push_predicate(&mut count, &query.predicate);

        let direction = query.sort.direction.keyword();
        let mut page = QueryBuilder::<Postgres>::new(SELECT_MATCHINGS);
        push_predicate(&mut page, &query.predicate);
        page.push(" ORDER BY ")
            .push(query.sort.field.column())
            .push(" ")
            .push(direction)
            .push(" NULLS LAST, m.id ")
            .push(direction)
            .push(" LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        // Count and page must see the same snapshot
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;
        let items = page.build_query_as::<Matching>().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        Ok((total, items))
    }

    async fn add_membership(
        &self,
        matching_id: Uuid,
        user_id: UserId,
        joined_at: DateTime<Utc>,
    ) -> Result<JoinOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO matching_members (matching_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (matching_id, user_id) DO NOTHING
            "#,
        )
        .bind(matching_id)
        .bind(user_id)
        .bind(joined_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(JoinOutcome::Added),
            Ok(_) => Ok(JoinOutcome::Duplicate),
            // matching_members.matching_id references a row deleted after the caller's read
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Ok(JoinOutcome::MissingMatching),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_membership(&self, matching_id: Uuid, user_id: UserId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM matching_members
            WHERE matching_id = $1 AND user_id = $2
            "#,
        )
        .bind(matching_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn bulk_close_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE matchings
            SET status = 'CLOSED'
            WHERE status = 'OPEN'
            AND (
                (matching_type = 'YOTEI' AND matching_date <= $1)
                OR (matching_type = 'QUICK'
                    AND created_at + make_interval(secs => duration * $2) <= $1)
            )
            "#,
        )
        .bind(now)
        .bind(QUICK_DURATION_UNIT_SECS as f64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_matching(&self, id: Uuid) -> Result<bool> {
        // matching_members rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM matchings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_members(&self, caller_id: UserId, pattern: &str) -> Result<Vec<MemberSummary>> {
        let members = sqlx::query_as::<_, MemberSummary>(
            r#"
            SELECT DISTINCT mm.matching_id, mm.user_id, u.name
            FROM matching_members mm
            JOIN users u ON u.id = mm.user_id
            JOIN matchings m ON m.id = mm.matching_id
            WHERE (
                m.owner_id = $1
                OR EXISTS (
                    SELECT 1 FROM matching_members me
                    WHERE me.matching_id = m.id AND me.user_id = $1
                )
            )
            AND u.name ILIKE $2
            ORDER BY u.name ASC, mm.matching_id ASC, mm.user_id ASC
            "#,
        )
        .bind(caller_id)
        .bind(like_pattern(pattern))
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }
}

fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &MatchingPredicate) {
    qb.push(" WHERE TRUE");

    if let Some(owner_id) = predicate.owner_id {
        qb.push(" AND m.owner_id = ").push_bind(owner_id);
    }
    if let Some(owner_name) = &predicate.owner_name {
        qb.push(" AND u.name ILIKE ").push_bind(like_pattern(owner_name));
    }
    if let StatusFilter::Only(status) = predicate.status {
        qb.push(" AND m.status = ").push_bind(status);
    }
    push_range(qb, "m.matching_date", &predicate.matching_date);
    push_range(qb, "m.created_at", &predicate.created_at);
}

fn push_range(qb: &mut QueryBuilder<'_, Postgres>, column: &'static str, range: &TimeRange) {
    if let Some(after) = range.after {
        qb.push(" AND ").push(column).push(" >= ").push_bind(after);
    }
    if let Some(before) = range.before {
        qb.push(" AND ").push(column).push(" < ").push_bind(before);
    }
}

/// `%needle%` with LIKE wildcards in the needle matched literally.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
