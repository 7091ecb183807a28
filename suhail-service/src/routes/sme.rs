use axum::{extract::State, response::Json};

use crate::{
    auth::{CurrentUser, Role},
    dashboard::{SmeDashboard, sme_dashboard},
    error::ApiResult,
    service::AppState,
};

pub async fn dashboard(State(state): State<AppState>, current: CurrentUser) -> ApiResult<SmeDashboard> {
    current.require_role(Role::SmeLeader)?;
    Ok(Json(sme_dashboard(&state.dataset)))
}
