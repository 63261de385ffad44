use super::{run_blocking, AppState, ApiResult};
use crate::database::models::UserRecord;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterUserRequest {
    username: String,
}

pub(crate) async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> ApiResult<UserRecord> {
    let users = state.users.clone();
    let user = run_blocking(move || users.register(&payload.username)).await?;
    Ok(Json(user))
}
