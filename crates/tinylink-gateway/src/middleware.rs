use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::net::IpAddr;
use tracing::debug;

/// Header carrying the client address, set by the fronting proxy.
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Admits only callers whose `X-Real-IP` falls inside the trusted subnet.
///
/// Every request is refused while no subnet is configured.
pub async fn require_trusted_subnet(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let Some(subnet) = state.trusted_subnet() else {
        return Err(AppError::Forbidden("no trusted subnet configured".to_string()));
    };

    let client = request
        .headers()
        .get(REAL_IP_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<IpAddr>().ok());

    match client {
        Some(ip) if subnet.contains(&ip) => Ok(next.run(request).await),
        Some(ip) => {
            debug!(client = %ip, subnet = %subnet, "client outside trusted subnet");
            Err(AppError::Forbidden(format!("{ip} is not trusted")))
        }
        None => Err(AppError::Forbidden(format!(
            "missing or invalid {REAL_IP_HEADER} header"
        ))),
    }
}
