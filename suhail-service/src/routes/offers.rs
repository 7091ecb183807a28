use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    auth::CurrentUser,
    catalog::{PackageBenefits, package_details},
    error::{ApiError, ApiResult, bad_request_error, not_found_error, service_unavailable_error},
    offer::{OfferAssessment, OfferError, OfferRequest, assess_offer},
    service::AppState,
};

#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub assessment: OfferAssessment,
    pub report: String,
}

fn offer_error(e: OfferError) -> ApiError {
    match e {
        OfferError::NoHistoricalData => service_unavailable_error(&e.to_string()),
        OfferError::InvalidInput(_) => bad_request_error(&e.to_string()),
        OfferError::NoMatchingHistory { .. } | OfferError::NoExposure { .. } => not_found_error(&e.to_string()),
    }
}

pub async fn assess(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<OfferRequest>,
) -> ApiResult<AssessmentResponse> {
    let assessment = assess_offer(&state.dataset, &request).map_err(|e| {
        warn!(user_id = current.id(), error = %e, "Offer assessment rejected");
        offer_error(e)
    })?;

    info!(
        user_id = current.id(),
        region = %request.region,
        package = %request.package,
        probability = assessment.final_probability,
        "Offer assessed"
    );
    let report = assessment.report();
    Ok(Json(AssessmentResponse { assessment, report }))
}

pub async fn package(_current: CurrentUser, Path(package): Path<String>) -> ApiResult<Vec<PackageBenefits>> {
    let packages = package_details(&package);
    if packages.is_empty() {
        return Err(not_found_error("Package not found"));
    }
    Ok(Json(packages))
}
