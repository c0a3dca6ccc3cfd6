//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`SyncEngineConfig`] and host-provided bridge
//! implementations (remote catalog, filesystem, settings, host library) into a
//! single [`SyncService`]. Desktop hosts typically enable the `desktop-shims`
//! feature and call [`bootstrap_desktop`], which builds the `reqwest`,
//! `tokio::fs` and SQLite bridges from `bridge-desktop` and a Subsonic client
//! from `provider-subsonic`.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    catalog::RemoteCatalogClient,
    host::HostLibrary,
    http::HttpClient,
    storage::{FileSystemAccess, SettingsStore},
    time::{Clock, SystemClock},
};
use chrono::{DateTime, Utc};
use core_library::LibraryStats;
use core_runtime::{
    config::SyncEngineConfig,
    events::{EventBus, EventStream},
};
use core_sync::{
    materializer_for, ClearReport, LibraryClearer, ProgressSink, SyncDependencies,
    SyncOrchestrator, SyncReport,
};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(feature = "desktop-shims")]
use bridge_desktop::{JsonRpcHostLibrary, ReqwestHttpClient, SqliteSettingsStore, TokioFileSystem};
#[cfg(feature = "desktop-shims")]
use bridge_traits::host::NoopHostLibrary;
#[cfg(feature = "desktop-shims")]
use core_library::{create_pool, DatabaseConfig};
#[cfg(feature = "desktop-shims")]
use provider_subsonic::{SubsonicClient, SubsonicConfig};
#[cfg(feature = "desktop-shims")]
use std::path::PathBuf;

const EVENT_BUS_CAPACITY: usize = 256;

/// Aggregated handle to all bridge dependencies the service requires.
pub struct CoreDependencies {
    pub pool: SqlitePool,
    pub client: Arc<dyn RemoteCatalogClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub host: Arc<dyn HostLibrary>,
    /// Used to fetch cover art in filesystem mode; artwork is skipped when absent
    pub http_client: Option<Arc<dyn HttpClient>>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        pool: SqlitePool,
        client: Arc<dyn RemoteCatalogClient>,
        filesystem: Arc<dyn FileSystemAccess>,
        settings_store: Arc<dyn SettingsStore>,
        host: Arc<dyn HostLibrary>,
    ) -> Self {
        Self {
            pool,
            client,
            filesystem,
            settings_store,
            host,
            http_client: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Primary façade exposed to host applications.
///
/// One service instance drives one source namespace. Sync and clear calls
/// from several instances (or processes) are serialized by the lease file
/// named in the configuration.
///
/// # Example
///
/// ```ignore
/// use core_service::SyncService;
/// use core_sync::NoopProgressSink;
/// use tokio_util::sync::CancellationToken;
///
/// let service = SyncService::new(config, deps)?;
/// let report = service.full_sync(&NoopProgressSink, CancellationToken::new()).await?;
/// println!("{} songs added", report.stats.songs_added);
/// ```
pub struct SyncService {
    config: Arc<SyncEngineConfig>,
    pool: SqlitePool,
    event_bus: EventBus,
    orchestrator: SyncOrchestrator,
    clearer: LibraryClearer,
}

impl SyncService {
    /// Validate `config` and wire the orchestrator and clearer over `deps`.
    pub fn new(config: SyncEngineConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let event_bus = EventBus::new(EVENT_BUS_CAPACITY);

        let materializer = materializer_for(
            &config,
            deps.client.clone(),
            deps.filesystem.clone(),
            deps.http_client.clone(),
        );

        let sync_deps = SyncDependencies {
            pool: deps.pool.clone(),
            client: deps.client,
            materializer: materializer.clone(),
            settings: deps.settings_store,
            host: deps.host.clone(),
            event_bus: event_bus.clone(),
            clock: deps.clock,
        };
        let orchestrator = SyncOrchestrator::new(config.clone(), sync_deps);

        let clearer = LibraryClearer::new(
            deps.pool.clone(),
            config.source_namespace.clone(),
            orchestrator.lock_manager().clone(),
            materializer,
            orchestrator.state().clone(),
            deps.host,
            event_bus.clone(),
        );

        info!(
            namespace = %config.source_namespace,
            filesystem = config.is_filesystem(),
            "Sync service ready"
        );

        Ok(Self {
            config,
            pool: deps.pool,
            event_bus,
            orchestrator,
            clearer,
        })
    }

    pub fn config(&self) -> &SyncEngineConfig {
        &self.config
    }

    /// Event bus carrying sync and library events.
    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    /// Receive sync and library events emitted from now on.
    pub fn subscribe(&self) -> EventStream {
        self.event_bus.stream()
    }

    /// Walk the entire remote catalog into the library.
    pub async fn full_sync(
        &self,
        progress: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Result<SyncReport> {
        Ok(self.orchestrator.full_sync(progress, cancel).await?)
    }

    /// Add albums from the newest-albums window that the library lacks.
    pub async fn incremental_sync(
        &self,
        progress: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Result<SyncReport> {
        Ok(self.orchestrator.incremental_sync(progress, cancel).await?)
    }

    /// Remove every row and file this namespace owns.
    pub async fn clear(&self) -> Result<ClearReport> {
        Ok(self.clearer.clear().await?)
    }

    /// Counts of owned rows per table.
    pub async fn library_stats(&self) -> Result<LibraryStats> {
        Ok(LibraryStats::collect(&self.pool, &self.config.source_namespace).await?)
    }

    /// Time of the last completed full sync, `None` if never synced or cleared since.
    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.orchestrator.state().last_sync().await?)
    }
}

/// Host-side settings for [`bootstrap_desktop`].
#[cfg(feature = "desktop-shims")]
#[derive(Debug, Clone, Default)]
pub struct DesktopOptions {
    /// JSON-RPC endpoint of the media host; rescans are skipped when unset
    pub host_rpc_endpoint: Option<String>,
    pub host_rpc_credentials: Option<(String, String)>,
    /// Defaults to `sync-settings.db` beside the library database
    pub settings_path: Option<PathBuf>,
}

#[cfg(feature = "desktop-shims")]
impl DesktopOptions {
    pub fn with_host_rpc(mut self, endpoint: impl Into<String>) -> Self {
        self.host_rpc_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_host_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.host_rpc_credentials = Some((username.into(), password.into()));
        self
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }
}

/// Convenience bootstrapper for desktop hosts talking to a Subsonic server.
///
/// ```ignore
/// use core_service::{bootstrap_desktop, DesktopOptions};
/// use provider_subsonic::SubsonicConfig;
///
/// let config = SyncEngineConfig::builder()
///     .database_path("/home/media/.kodi/userdata/Database/MyMusic82.db")
///     .build()?;
/// let server = SubsonicConfig::new("https://music.example", "admin", "hunter2");
/// let options = DesktopOptions::default().with_host_rpc("http://localhost:8080/jsonrpc");
/// let service = bootstrap_desktop(config, server, options).await?;
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    config: SyncEngineConfig,
    server: SubsonicConfig,
    options: DesktopOptions,
) -> Result<SyncService> {
    config.validate()?;

    let http: Arc<dyn HttpClient> = Arc::new(
        ReqwestHttpClient::with_timeout(config.request_timeout)
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?,
    );
    let client = Arc::new(SubsonicClient::new(http.clone(), server)?);

    let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;

    let settings_path = options.settings_path.clone().unwrap_or_else(|| {
        config
            .database_path
            .parent()
            .map(|dir| dir.join("sync-settings.db"))
            .unwrap_or_else(|| PathBuf::from("sync-settings.db"))
    });
    let settings = Arc::new(SqliteSettingsStore::new(settings_path).await?);

    let host: Arc<dyn HostLibrary> = match options.host_rpc_endpoint {
        Some(endpoint) => {
            let mut host = JsonRpcHostLibrary::new(http.clone(), endpoint);
            if let Some((username, password)) = &options.host_rpc_credentials {
                host = host.with_basic_auth(username, password);
            }
            Arc::new(host)
        }
        None => Arc::new(NoopHostLibrary),
    };

    let deps = CoreDependencies::new(
        pool,
        client,
        Arc::new(TokioFileSystem::new()),
        settings,
        host,
    )
    .with_http_client(http);

    SyncService::new(config, deps)
}
