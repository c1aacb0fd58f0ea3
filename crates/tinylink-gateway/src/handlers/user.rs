use super::required_owner;
use crate::error::Result;
use crate::model::MappingSummary;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tinylink_core::ShortCode;
use tracing::{debug, info};

/// Lists the caller's mappings; 204 when there are none.
pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let owner = required_owner(&headers)?;
    let owned = state.shortener().list_by_owner(&owner).await?;

    if owned.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let summaries: Vec<MappingSummary> = owned
        .iter()
        .map(|mapping| MappingSummary::new(mapping, state.base_url()))
        .collect();
    Ok(Json(summaries).into_response())
}

/// Accepts a JSON array of short codes for background deletion.
///
/// Entries that are not well-formed codes cannot match anything and are
/// dropped; an empty array is rejected.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(raw_codes): Json<Vec<String>>,
) -> Result<StatusCode> {
    let owner = required_owner(&headers)?;
    let requested = raw_codes.len();
    let codes: Vec<ShortCode> = raw_codes
        .into_iter()
        .filter_map(|raw| match ShortCode::new(raw.as_str()) {
            Ok(code) => Some(code),
            Err(err) => {
                debug!(code = %raw, error = %err, "skipping malformed code");
                None
            }
        })
        .collect();

    if requested > 0 && codes.is_empty() {
        info!(owner = %owner, requested, "bulk delete named no valid codes");
        return Ok(StatusCode::ACCEPTED);
    }

    state.shortener().delete_batch(codes, owner.clone()).await?;
    info!(owner = %owner, requested, "bulk delete accepted");

    Ok(StatusCode::ACCEPTED)
}
