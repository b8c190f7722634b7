use crate::{
    telemetry::TelemetryService,
    web::{controllers::HealthController, FeatureConfig, ProblemConfig, WebAppConfig},
};
use anyhow::{anyhow, Error as AnyError};
use axum::{
    http::{header, Method},
    Extension,
};
use axum_server::Handle;
use std::{env, fs, future::Future, net::SocketAddr, path::PathBuf, time::Duration as StdDuration};
use tokio::{net::TcpListener, runtime::Runtime, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Dispatch, Level};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::{Config as SwaggerConfig, SwaggerUi};

#[derive(OpenApi)]
#[openapi(paths(), components(), tags((name = "health", description = "Service health")))]
struct ApiDoc;

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => log::warn!("Received ctrl-c, shutting down the server..."),
            Err(err) => {
                log::error!("Failed to listen for ctrl-c: {err}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                log::warn!("Received SIGTERM, shutting down the server...")
            }
            Err(err) => {
                log::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn graceful_shutdown(handle: Handle) {
    shutdown_signal().await;
    handle.graceful_shutdown(Some(StdDuration::from_secs(10)));
}

pub trait WebApplication {
    type AppConfig: FeatureConfig;
    type AppState: Clone + Send + Sync + 'static;

    fn feature_name(&self) -> &'static str;
    fn create_state(
        &self,
        config: &WebAppConfig<Self::AppConfig>,
    ) -> impl Future<Output = Result<Self::AppState, AnyError>> + Send;
    fn create_routes(
        &self,
        config: &WebAppConfig<Self::AppConfig>,
    ) -> impl Future<Output = Result<OpenApiRouter<Self::AppState>, AnyError>> + Send;
}

fn create_cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, AnyError> {
    let allowed_origins = allowed_origins
        .iter()
        .map(|r| regex::bytes::Regex::new(r))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| anyhow!("Cors config error: {err}"))?;
    let allow_origin = AllowOrigin::predicate(move |origin, _| {
        let origin = origin.as_bytes();
        allowed_origins.iter().any(|r| r.is_match(origin))
    });

    Ok(CorsLayer::default()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true))
}

async fn start_web_app<A: WebApplication>(app: A) -> Result<(), AnyError> {
    let args: Vec<String> = env::args().collect();
    let stage = args.get(1).ok_or(anyhow!("Missing config stage parameter"))?.clone();
    let config_file = args.get(2).map(PathBuf::from);

    let (config, telemetry_service) = {
        // log into the console until the configured telemetry is ready
        let pre_init_log = {
            let _ = tracing_log::LogTracer::init();
            let env_filter = EnvFilter::from_default_env();
            let pre_init_log = tracing_subscriber::fmt().with_env_filter(env_filter).compact().finish();
            Dispatch::new(pre_init_log)
        };
        let _pre_init_log_guard = tracing::dispatcher::set_default(&pre_init_log);

        let config = WebAppConfig::<A::AppConfig>::load(&stage, config_file)?;
        let telemetry_service = TelemetryService::new(app.feature_name(), &config.telemetry)?;
        log::info!("pre-init completed");
        (config, telemetry_service)
    };

    let cors_layer = create_cors_layer(&config.service.allowed_origins)?;
    let log_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));
    let problem_detail_layer = ProblemConfig::new(config.service.full_problem_response).into_layer();

    log::info!("Creating application state...");
    let app_state = app.create_state(&config).await?;
    let mut router = OpenApiRouter::<A::AppState>::new();

    log::info!("Creating common routes...");
    let health_controller = HealthController::new(app.feature_name(), &config).into_routes();
    router = router.nest(&format!("/{}", app.feature_name()), health_controller);

    log::info!("Creating application routes...");
    let app_controller = app.create_routes(&config).await?;
    router = router.nest(&format!("/{}", app.feature_name()), app_controller);

    let (router, router_api) = router.split_for_parts();
    let mut doc = ApiDoc::openapi();
    doc.merge(router_api);

    log::info!("Creating swagger-ui...");
    let swagger = SwaggerUi::new(format!("/{}/doc/swagger-ui", app.feature_name()))
        .url(format!("/{}/doc/openapi.json", app.feature_name()), doc)
        .config(SwaggerConfig::default().show_common_extensions(true));

    let router = router
        .merge(swagger)
        .layer(problem_detail_layer)
        .layer(cors_layer)
        .layer(Extension(telemetry_service))
        .layer(log_layer)
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));

    if let Some(tls_config) = &config.service.tls {
        log::info!("Starting service on https://{addr:?} ...");
        let cert = fs::read(&tls_config.cert)?;
        let key = fs::read(&tls_config.key)?;
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem(cert, key)
            .await
            .map_err(|e| anyhow!(e))?;

        let handle = Handle::new();
        tokio::spawn(graceful_shutdown(handle.clone()));

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(router.into_make_service())
            .await
            .map_err(|e| anyhow!(e))
    } else {
        log::info!("Starting service on http://{addr:?} ...");
        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow!(e))
    }
}

/// Run the application until a shutdown signal is received.
///
/// The first command line argument is the configuration stage, the optional second one
/// overrides the root configuration file.
pub fn run_web_app<A: WebApplication>(app: A) -> Result<(), AnyError> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let rt = Runtime::new()?;
    let result = rt.block_on(start_web_app(app));
    if let Err(err) = &result {
        eprintln!("[ERROR] {}", err);
        let mut cause = err.source();
        if cause.is_some() {
            eprintln!();
            eprintln!("Caused by:");
        }
        let mut i = 0;
        while let Some(e) = cause {
            eprintln!("   {}: {}", i, e);
            cause = e.source();
            i += 1;
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use assembly_test::test;

    #[test]
    fn cors_origins_are_regular_expressions() {
        assert!(create_cors_layer(&["^https://.*\\.example\\.com$".to_string()]).is_ok());
        assert!(create_cors_layer(&["(unclosed".to_string()]).is_err());
    }
}
