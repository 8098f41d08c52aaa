use std::process;
use std::sync::Arc;

use mosaico::{
    cache::{CacheConfig, MemoryStore},
    config,
    error::AppError,
    infra::{
        error::InfraError,
        http::{self, WidgetState},
        telemetry,
    },
    registry::WidgetRegistry,
    router::BatchRouter,
    widget::{WidgetRuntime, builtin},
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let registry = Arc::new(build_registry(&settings)?);
    if registry.is_empty() {
        warn!("widget registry is empty; every batch entry will resolve to WidgetNotFound");
    }

    let cache_config = CacheConfig::from(&settings.cache);
    let store = Arc::new(MemoryStore::new(&cache_config));
    let runtime = WidgetRuntime::new(store, cache_config.ttl, settings.widgets.debug);
    let router = Arc::new(BatchRouter::new(registry, runtime));

    let state = WidgetState::new(router, &settings.http)?;
    let app = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(addr = %settings.server.addr, "mosaico listening");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

/// Populate the registry from the builtin catalog and the configured
/// name → catalog-id mapping. Unknown ids fail startup rather than
/// degrading into WidgetNotFound at request time.
fn build_registry(settings: &config::Settings) -> Result<WidgetRegistry, AppError> {
    let catalog = builtin::catalog();
    let registry = WidgetRegistry::new();

    for (name, kind) in &settings.widgets.registry {
        let factory = catalog.get(kind.as_str()).ok_or_else(|| {
            InfraError::configuration(format!(
                "widgets.registry.{name} refers to unknown widget kind `{kind}`"
            ))
        })?;
        let factory = Arc::clone(factory);
        registry.register(name.clone(), move || factory());
    }

    Ok(registry)
}
