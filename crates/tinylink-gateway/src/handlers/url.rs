use super::owner;
use crate::error::{AppError, Result};
use crate::model::{BatchShortenItem, BatchShortenResult, ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Redirect;
use axum::Json;
use tinylink_core::{BatchCreateItem, ShortCode, Shortened, ShortenerError};
use tracing::debug;

/// 201 for a new mapping, 409 when the URL was already shortened.
fn created_status(shortened: &Shortened) -> StatusCode {
    if shortened.is_duplicate() {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

/// Shortens the URL sent as a plain-text body.
pub async fn create_text_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, String)> {
    let shortened = state.shortener().create_one(&body, &owner(&headers)).await?;
    Ok((created_status(&shortened), state.short_url(shortened.code())))
}

pub async fn create_json_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>)> {
    let shortened = state
        .shortener()
        .create_one(&request.url, &owner(&headers))
        .await?;

    Ok((
        created_status(&shortened),
        Json(ShortenResponse {
            result: state.short_url(shortened.code()),
        }),
    ))
}

pub async fn create_batch_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(items): Json<Vec<BatchShortenItem>>,
) -> Result<(StatusCode, Json<Vec<BatchShortenResult>>)> {
    let items = items
        .into_iter()
        .map(|item| BatchCreateItem {
            correlation_id: item.correlation_id,
            original_url: item.original_url,
        })
        .collect();

    let results = state
        .shortener()
        .create_batch(items, owner(&headers))
        .await?
        .into_iter()
        .map(|result| BatchShortenResult {
            short_url: result
                .short_code()
                .map(|code| state.short_url(code))
                .unwrap_or_default(),
            correlation_id: result.correlation_id,
        })
        .collect();

    Ok((StatusCode::CREATED, Json(results)))
}

/// 307 to the original URL, 410 for a deleted mapping, 404 otherwise.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(short_code): Path<String>,
) -> Result<Redirect> {
    let code = ShortCode::new(short_code.as_str())
        .map_err(|_| AppError::from(ShortenerError::NotFound(short_code.clone())))?;

    let resolved = state.shortener().resolve(&code).await?;
    if resolved.deleted {
        debug!(code = %code, "redirect to deleted mapping");
        return Err(AppError::Gone(code.to_string()));
    }

    Ok(Redirect::temporary(&resolved.original_url))
}
