use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::MatchingResult;
use crate::handlers::{
    auth::CallerId,
    extract::{ValidJson, ValidPath, ValidQuery},
    AppState,
};
use crate::models::{Matching, MemberSummary, NewMatching, UserId};
use crate::services::pagination::Paginated;
use crate::services::query::MatchingListParams;

#[derive(Debug, Deserialize)]
pub struct SearchMembersQuery {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveQuery {
    #[serde(default)]
    pub user_id: Option<UserId>,
}

pub async fn create_matching(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    ValidJson(input): ValidJson<NewMatching>,
) -> MatchingResult<(StatusCode, Json<Matching>)> {
    let matching = state.matchings.create(caller_id, input).await?;
    Ok((StatusCode::CREATED, Json(matching)))
}

pub async fn list_matchings(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<MatchingListParams>,
) -> MatchingResult<Json<Paginated<Matching>>> {
    Ok(Json(state.matchings.list(&params).await?))
}

pub async fn list_my_matchings(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    ValidQuery(params): ValidQuery<MatchingListParams>,
) -> MatchingResult<Json<Paginated<Matching>>> {
    Ok(Json(state.matchings.list_owned(caller_id, &params).await?))
}

pub async fn search_members(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    ValidQuery(query): ValidQuery<SearchMembersQuery>,
) -> MatchingResult<Json<Vec<MemberSummary>>> {
    let name = query.name.unwrap_or_default();
    Ok(Json(state.members.search_members_by_name(caller_id, &name).await?))
}

pub async fn get_matching(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
) -> MatchingResult<Json<Matching>> {
    Ok(Json(state.matchings.find_one(id).await?))
}

pub async fn join_matching(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    ValidPath(id): ValidPath<Uuid>,
) -> MatchingResult<StatusCode> {
    state.members.join(id, caller_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `?userId=` lets the owner evict a member; without it the caller leaves.
pub async fn leave_matching(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<LeaveQuery>,
) -> MatchingResult<StatusCode> {
    state.members.leave(id, caller_id, query.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_matching(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    ValidPath(id): ValidPath<Uuid>,
) -> MatchingResult<StatusCode> {
    state.matchings.remove(id, caller_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
