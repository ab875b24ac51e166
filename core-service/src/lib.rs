//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP and audio
//! output) into the playback session core. Desktop apps typically enable the
//! `desktop-shims` feature, which supplies a reqwest-based HTTP client when
//! the host does not inject one. The audio output always comes from the host.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use bridge_traits::AudioOutput;
//! # async fn example(audio: Arc<dyn AudioOutput>) -> core_service::Result<()> {
//! use core_playback::SessionConfig;
//! use core_runtime::config::CoreConfig;
//! use core_service::{CoreDependencies, CoreService};
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.example.com")
//!     .build()?;
//! let core = CoreService::bootstrap(config, SessionConfig::default(), CoreDependencies::new(audio))?;
//!
//! core.auth().sign_in("header.payload.signature", "Listener", false)?;
//! let recent = core.recently_played().await;
//! if let Some(entry) = recent.into_iter().next() {
//!     core.playback().play_track(entry.track).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{http::HttpClient, AudioOutput};
use core_auth::{AuthSession, CredentialProvider};
use core_playback::{
    HttpPositionStore, RecentEntry, RecentHistory, SessionConfig, SessionCoordinator,
    SessionLifecycleBinder,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::logging::init_logging;
use tracing::{debug, info};

/// Host-provided capabilities the core cannot supply itself.
pub struct CoreDependencies {
    pub audio_output: Arc<dyn AudioOutput>,
}

impl CoreDependencies {
    pub fn new(audio_output: Arc<dyn AudioOutput>) -> Self {
        Self { audio_output }
    }
}

/// Primary façade exposed to host applications.
///
/// Clones share the same session, auth state and event bus.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    event_bus: EventBus,
    auth: AuthSession,
    playback: SessionCoordinator,
    history: Arc<RecentHistory>,
    _lifecycle: Arc<SessionLifecycleBinder>,
}

impl CoreService {
    /// Build every component and start the auth lifecycle listener.
    ///
    /// Installs the global `tracing` subscriber from `config.logging` unless
    /// the host already installed one. Must be called from within a Tokio
    /// runtime.
    pub fn bootstrap(
        config: CoreConfig,
        session_config: SessionConfig,
        deps: CoreDependencies,
    ) -> Result<Self> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CoreError::InitializationFailed(
                "bootstrap must run inside a Tokio runtime".to_string(),
            ));
        }

        match init_logging(config.logging.clone()) {
            Ok(()) => {}
            Err(core_runtime::Error::LoggingAlreadyInitialized) => {
                debug!("Global subscriber already installed, keeping it");
            }
            Err(err) => return Err(err.into()),
        }

        let endpoint = config.endpoint(&session_config.recent_path)?;
        let event_bus = EventBus::new(config.event_buffer_size);
        let auth = AuthSession::new(event_bus.clone());
        let credentials: Arc<dyn CredentialProvider> = Arc::new(auth.clone());
        let http: Arc<dyn HttpClient> = Arc::clone(&config.http_client);

        let store = HttpPositionStore::new(
            Arc::clone(&http),
            Arc::clone(&credentials),
            endpoint.clone(),
        )
        .with_timeout(config.request_timeout)
        .with_event_bus(event_bus.clone());

        let history = RecentHistory::new(http, Arc::clone(&credentials), endpoint)
            .with_timeout(config.request_timeout);

        let playback = SessionCoordinator::new(
            deps.audio_output,
            Arc::new(store),
            event_bus.clone(),
            session_config,
        );

        let lifecycle = SessionLifecycleBinder::spawn(playback.clone(), &event_bus, credentials);

        info!(api = %config.api_base_url, "Playback core ready");

        Ok(Self {
            config: Arc::new(config),
            event_bus,
            auth,
            playback,
            history: Arc::new(history),
            _lifecycle: Arc::new(lifecycle),
        })
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn playback(&self) -> &SessionCoordinator {
        &self.playback
    }

    pub async fn recently_played(&self) -> Vec<RecentEntry> {
        self.history.list().await
    }

    /// New unfiltered stream over the core event bus.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("config", &self.config)
            .field("auth", &self.auth)
            .field("playback", &self.playback)
            .finish()
    }
}
