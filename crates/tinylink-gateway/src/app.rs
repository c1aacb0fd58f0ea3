use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{
    create_batch_handler, create_json_handler, create_text_handler, delete_user_urls_handler,
    list_user_urls_handler, ping_handler, redirect_handler, stats_handler,
};
use crate::middleware::require_trusted_subnet;
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        let internal = Router::new()
            .route("/internal/stats", get(stats_handler))
            .route_layer(from_fn_with_state(state.clone(), require_trusted_subnet));

        Router::new()
            .route("/", post(create_text_handler))
            .route("/ping", get(ping_handler))
            .route("/{short_code}", get(redirect_handler))
            .nest(
                "/api",
                Router::new()
                    .route("/shorten", post(create_json_handler))
                    .route("/shorten/batch", post(create_batch_handler))
                    .route(
                        "/user/urls",
                        get(list_user_urls_handler).delete(delete_user_urls_handler),
                    )
                    .merge(internal),
            )
            .with_state(state)
    }
}
