mod app_config;
mod app_state;
mod controllers;
mod services;

use self::{app_config::AppConfig, app_state::AppState};
use anyhow::Error as AnyError;
use assembly_infra::web::{WebAppConfig, WebApplication};
use controllers::{health::HealthController, voting::VotingController};
use utoipa_axum::router::OpenApiRouter;

struct Application;

impl WebApplication for Application {
    type AppConfig = AppConfig;
    type AppState = AppState;

    fn feature_name(&self) -> &'static str {
        "voting"
    }

    async fn create_state(&self, config: &WebAppConfig<Self::AppConfig>) -> Result<Self::AppState, AnyError> {
        AppState::new(config).await
    }

    async fn create_routes(
        &self,
        _config: &WebAppConfig<Self::AppConfig>,
    ) -> Result<OpenApiRouter<Self::AppState>, AnyError> {
        let health_controller = HealthController::new().into_router();
        let voting_controller = VotingController::new().into_router();

        Ok(health_controller.merge(voting_controller))
    }
}

pub fn main() -> Result<(), AnyError> {
    let app = Application;
    assembly_infra::web::run_web_app(app)
}
