mod health;
mod url;
mod user;

pub use health::{ping_handler, stats_handler};
pub use url::{create_batch_handler, create_json_handler, create_text_handler, redirect_handler};
pub use user::{delete_user_urls_handler, list_user_urls_handler};

use crate::error::{AppError, Result};
use axum::http::HeaderMap;
use tinylink_core::OwnerId;

/// Header carrying the caller's identity, set by the authenticating proxy.
pub const OWNER_HEADER: &str = "x-owner-id";

/// The caller's owner id, anonymous when the header is absent or blank.
fn owner(headers: &HeaderMap) -> OwnerId {
    headers
        .get(OWNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(OwnerId::new)
        .unwrap_or_default()
}

fn required_owner(headers: &HeaderMap) -> Result<OwnerId> {
    let owner = owner(headers);
    if owner.is_anonymous() {
        return Err(AppError::Unauthorized);
    }
    Ok(owner)
}
