use axum::extract::State;

use super::dto::{EventBody, EventsData, MatchBody, MatchesData};
use super::response::{created, ok, Admin, ApiResult, Credential, IdParam, JsonBody};
use super::AppState;

pub async fn list_matches(State(state): State<AppState>) -> ApiResult<MatchesData> {
    ok(state.services.scheduling.matches().await.into())
}

pub async fn create_match(
    State(state): State<AppState>,
    admin: Admin,
    JsonBody(body): JsonBody<MatchBody>,
) -> ApiResult<MatchesData> {
    let matches = state
        .services
        .scheduling
        .create_match(admin.as_deref(), body.into())
        .await?;
    created(matches.into())
}

pub async fn update_match(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
    JsonBody(body): JsonBody<MatchBody>,
) -> ApiResult<MatchesData> {
    let matches = state
        .services
        .scheduling
        .update_match(admin.as_deref(), id, body.into())
        .await?;
    ok(matches.into())
}

pub async fn delete_match(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
) -> ApiResult<MatchesData> {
    let matches = state.services.cascade.delete_match(admin.as_deref(), id).await?;
    ok(matches.into())
}

/// Drafts are only listed for an authorized caller.
pub async fn list_agenda(State(state): State<AppState>, credential: Credential) -> ApiResult<EventsData> {
    ok(state.services.scheduling.agenda(credential.as_deref()).await.into())
}

pub async fn create_event(
    State(state): State<AppState>,
    admin: Admin,
    JsonBody(body): JsonBody<EventBody>,
) -> ApiResult<EventsData> {
    let events = state
        .services
        .scheduling
        .create_agenda_event(admin.as_deref(), body.into())
        .await?;
    created(events.into())
}

pub async fn update_event(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
    JsonBody(body): JsonBody<EventBody>,
) -> ApiResult<EventsData> {
    let events = state
        .services
        .scheduling
        .update_agenda_event(admin.as_deref(), id, body.into())
        .await?;
    ok(events.into())
}

pub async fn delete_event(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
) -> ApiResult<EventsData> {
    let events = state
        .services
        .cascade
        .delete_agenda_event(admin.as_deref(), id)
        .await?;
    ok(events.into())
}
