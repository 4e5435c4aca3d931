use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    response::Json,
};

use crate::error::MatchingError;

// axum's own rejections answer in plain text; these wrappers report
// malformed input as a `validation_error` body instead.

pub struct ValidJson<T>(pub T);

pub struct ValidQuery<T>(pub T);

pub struct ValidPath<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = MatchingError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = MatchingError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = MatchingError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for MatchingError {
    fn from(rejection: JsonRejection) -> Self {
        MatchingError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for MatchingError {
    fn from(rejection: QueryRejection) -> Self {
        MatchingError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for MatchingError {
    fn from(rejection: PathRejection) -> Self {
        MatchingError::validation(rejection.body_text())
    }
}
