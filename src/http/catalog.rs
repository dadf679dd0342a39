use axum::extract::State;

use super::dto::{CascadeData, SchoolBody, SchoolsData, TeamBody, TeamsData};
use super::response::{created, ok, Admin, ApiResult, IdParam, JsonBody};
use super::AppState;

pub async fn list_schools(State(state): State<AppState>) -> ApiResult<SchoolsData> {
    ok(state.services.catalog.schools().await.into())
}

pub async fn create_school(
    State(state): State<AppState>,
    admin: Admin,
    JsonBody(body): JsonBody<SchoolBody>,
) -> ApiResult<SchoolsData> {
    let schools = state.services.catalog.create_school(admin.as_deref(), body.into()).await?;
    created(schools.into())
}

pub async fn update_school(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
    JsonBody(body): JsonBody<SchoolBody>,
) -> ApiResult<SchoolsData> {
    let schools = state
        .services
        .catalog
        .update_school(admin.as_deref(), id, body.into())
        .await?;
    ok(schools.into())
}

pub async fn delete_school(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
) -> ApiResult<CascadeData> {
    let cascade = state.services.cascade.delete_school(admin.as_deref(), id).await?;
    ok(cascade.into())
}

pub async fn list_teams(State(state): State<AppState>) -> ApiResult<TeamsData> {
    ok(state.services.catalog.teams().await.into())
}

pub async fn create_team(
    State(state): State<AppState>,
    admin: Admin,
    JsonBody(body): JsonBody<TeamBody>,
) -> ApiResult<TeamsData> {
    let teams = state.services.catalog.create_team(admin.as_deref(), body.into()).await?;
    created(teams.into())
}

pub async fn update_team(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
    JsonBody(body): JsonBody<TeamBody>,
) -> ApiResult<TeamsData> {
    let teams = state
        .services
        .catalog
        .update_team(admin.as_deref(), id, body.into())
        .await?;
    ok(teams.into())
}

pub async fn delete_team(
    State(state): State<AppState>,
    admin: Admin,
    IdParam(id): IdParam,
) -> ApiResult<TeamsData> {
    let teams = state.services.cascade.delete_team(admin.as_deref(), id).await?;
    ok(teams.into())
}
