use super::{run_blocking, ApiError, ApiResult, AppState};
use crate::auth::CurrentUser;
use crate::votes::{VoteDirection, VoteOutcome};
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct VoteRequest {
    direction: i64,
}

pub(crate) async fn cast_vote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(payload): Json<VoteRequest>,
) -> ApiResult<VoteOutcome> {
    let user_id = user.require()?;
    let direction = VoteDirection::try_from(payload.direction).map_err(ApiError::BadRequest)?;
    let votes = state.votes.clone();
    let outcome = run_blocking(move || votes.cast_vote(user_id, post_id, direction)).await?;
    Ok(Json(outcome))
}
