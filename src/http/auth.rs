use axum::extract::State;
use tracing::info;

use super::dto::JwtData;
use super::response::{ok, ApiResult, Credential};
use super::AppState;
use crate::auth::{credential_value, Scheme};

/// Basic credentials in, bearer token out.
pub async fn login(State(state): State<AppState>, credential: Credential) -> ApiResult<JwtData> {
    state.admin.check(credential.as_deref(), Scheme::Basic)?;
    let jwt = state.admin.issue_token()?;
    info!("admin logged in");
    ok(JwtData { jwt })
}

pub async fn verify(State(state): State<AppState>, credential: Credential) -> ApiResult<JwtData> {
    let token = credential_value(credential.as_deref(), Scheme::Bearer)?;
    state.admin.verify(token)?;
    ok(JwtData { jwt: token.to_string() })
}

pub async fn logout(State(state): State<AppState>, credential: Credential) -> ApiResult<()> {
    let token = credential_value(credential.as_deref(), Scheme::Bearer)?;
    state.admin.revoke(token)?;
    info!("admin logged out");
    ok(())
}
