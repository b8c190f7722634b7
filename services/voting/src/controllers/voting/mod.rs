mod api;
mod voting_error;
pub use self::voting_error::*;

use crate::app_state::AppState;
use utoipa_axum::{router::OpenApiRouter, routes};

pub struct VotingController();

impl VotingController {
    pub fn new() -> Self {
        Self()
    }

    pub fn into_router(self) -> OpenApiRouter<AppState> {
        OpenApiRouter::new()
            .routes(routes!(api::connect))
            .routes(routes!(api::create_session, api::list_sessions))
            .routes(routes!(api::get_session))
            .routes(routes!(api::open_session))
            .routes(routes!(api::close_session))
            .routes(routes!(api::put_participant))
    }
}
