use axum::extract::State;

use super::dto::{LiveBody, LivesData};
use super::response::{created, ok, Admin, ApiResult, Credential, IdParam, JsonBody};
use super::AppState;

pub async fn list(State(state): State<AppState>, credential: Credential) -> ApiResult<LivesData> {
    ok(state.services.lives.lives(credential.as_deref()).await.into())
}

pub async fn create(
    State(state): State<AppState>,
    admin: Admin,
    JsonBody(body): JsonBody<LiveBody>,
) -> ApiResult<LivesData> {
    let lives = state.services.lives.create_live(admin.as_deref(), body.into()).await?;
    created(lives.into())
}

pub async fn update(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
    JsonBody(body): JsonBody<LiveBody>,
) -> ApiResult<LivesData> {
    let lives = state
        .services
        .lives
        .update_live(admin.as_deref(), id, body.into())
        .await?;
    ok(lives.into())
}

pub async fn remove(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
) -> ApiResult<LivesData> {
    let lives = state.services.cascade.delete_live(admin.as_deref(), id).await?;
    ok(lives.into())
}
