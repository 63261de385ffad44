use super::{run_blocking, ApiResult, AppState};
use crate::auth::CurrentUser;
use crate::feed::{FeedPage, PostView};
use crate::posts::{CreatePostInput, UpdatePostInput};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct FeedParams {
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteResponse {
    deleted: bool,
}

pub(crate) async fn get_feed(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<FeedParams>,
) -> ApiResult<FeedPage> {
    let feed = state.feed.clone();
    let page = run_blocking(move || {
        feed.get_feed(user.id(), params.limit, params.cursor.as_deref())
    })
    .await?;
    Ok(Json(page))
}

pub(crate) async fn get_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> ApiResult<PostView> {
    let feed = state.feed.clone();
    let post = run_blocking(move || feed.get_post(user.id(), post_id)).await?;
    Ok(Json(post))
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreatePostInput>,
) -> ApiResult<PostView> {
    let author_id = user.require()?;
    let posts = state.posts.clone();
    let post = run_blocking(move || posts.create_post(author_id, payload)).await?;
    Ok(Json(post))
}

pub(crate) async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(payload): Json<UpdatePostInput>,
) -> ApiResult<PostView> {
    let user_id = user.require()?;
    let posts = state.posts.clone();
    let post = run_blocking(move || posts.update_post(user_id, post_id, payload)).await?;
    Ok(Json(post))
}

pub(crate) async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> ApiResult<DeleteResponse> {
    let user_id = user.require()?;
    let posts = state.posts.clone();
    run_blocking(move || posts.delete_post(user_id, post_id)).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}
