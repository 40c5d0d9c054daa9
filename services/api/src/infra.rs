use knock_squared::backend::{
    BackendClient, FunctionDispatcher, InMemoryAuth, InMemoryPhotoStore, InMemoryStore,
    RecordingDispatcher, RemoteAuth, RemotePhotoStore, RestStore,
};
use knock_squared::config::AppConfig;
use knock_squared::error::AppError;
use knock_squared::http::{KnockServices, ServiceSettings};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type RemoteServices = KnockServices<RemoteAuth, RestStore>;
pub(crate) type OfflineServices = KnockServices<InMemoryAuth, InMemoryStore>;

/// Service graph wired to the hosted backend.
pub(crate) fn remote_services(config: &AppConfig) -> Result<RemoteServices, AppError> {
    let client = BackendClient::new(&config.backend)?;
    Ok(KnockServices::new(
        Arc::new(RemoteAuth::new(client.clone())),
        Arc::new(RestStore::new(client.clone())),
        Arc::new(RemotePhotoStore::new(
            client.clone(),
            config.backend.photo_bucket.clone(),
        )),
        Arc::new(FunctionDispatcher::new(client)),
        ServiceSettings::from(config),
    ))
}

/// In-process backends for the demo command and router tests. The dispatcher
/// handle exposes what would have been sent.
pub(crate) fn offline_services(
    settings: ServiceSettings,
) -> (OfflineServices, Arc<RecordingDispatcher>) {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let services = KnockServices::new(
        Arc::new(InMemoryAuth::default()),
        Arc::new(InMemoryStore::default()),
        Arc::new(InMemoryPhotoStore::default()),
        dispatcher.clone(),
        settings,
    );
    (services, dispatcher)
}
