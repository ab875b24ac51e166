//! # Position Persistence
//!
//! Remote "last position" storage, keyed by subject and (server-side) user.
//!
//! Writes are fire-and-forget: [`PositionStore::save`] returns immediately
//! and the request runs on a spawned task. Reads are best-effort and resolve
//! to `0.0` when anything goes wrong. Neither retries.

use crate::error::{PlaybackError, Result};
use crate::types::{lenient_seconds, SubjectKey, SubjectKind};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use core_auth::CredentialProvider;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, instrument, warn};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote storage for playback positions.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Start saving `position_secs` for `key` and return without waiting.
    /// Failures are logged and dropped.
    fn save(&self, key: &SubjectKey, position_secs: f64);

    /// Last remembered position for `key`, or `0.0` when there is none or
    /// it cannot be read.
    async fn fetch_last_position(&self, key: &SubjectKey) -> f64;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavePositionBody<'a> {
    track_id: Option<&'a str>,
    podcast_id: Option<&'a str>,
    last_position: f64,
}

impl<'a> SavePositionBody<'a> {
    fn new(key: &'a SubjectKey, position_secs: f64) -> Self {
        let (track_id, podcast_id) = match key.kind {
            SubjectKind::Track => (Some(key.id.as_str()), None),
            SubjectKind::Podcast => (None, Some(key.id.as_str())),
        };
        Self {
            track_id,
            podcast_id,
            last_position: position_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LastPositionResponse {
    #[serde(default, deserialize_with = "lenient_seconds")]
    last_position: Option<f64>,
}

/// [`PositionStore`] backed by the `/recent` endpoint.
pub struct HttpPositionStore {
    http: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
    endpoint: Url,
    timeout: Duration,
    event_bus: Option<EventBus>,
}

impl HttpPositionStore {
    /// `endpoint` is the full URL of the recently-played resource.
    pub fn new(
        http: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialProvider>,
        endpoint: Url,
    ) -> Self {
        Self {
            http,
            credentials,
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            event_bus: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Emit `PositionSaved` on the bus whenever the service acknowledges a
    /// save.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    fn lookup_url(&self, key: &SubjectKey) -> Url {
        let param = match key.kind {
            SubjectKind::Track => "trackId",
            SubjectKind::Podcast => "podcastId",
        };
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(param, &key.id);
        url
    }

    async fn try_fetch(&self, key: &SubjectKey) -> Result<Option<f64>> {
        let credential = self
            .credentials
            .bearer_token()
            .ok_or(PlaybackError::NotAuthenticated)?;

        let request = HttpRequest::get(self.lookup_url(key).as_str())
            .bearer_token(credential.expose())
            .timeout(self.timeout);

        let response = self
            .http
            .execute_with_retry(request, RetryPolicy::none())
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(PlaybackError::Persistence(format!(
                "lookup returned status {}",
                response.status
            )));
        }

        let body: LastPositionResponse = serde_json::from_slice(&response.body)
            .map_err(|e| PlaybackError::InvalidResponse(e.to_string()))?;

        Ok(body.last_position.filter(|p| *p > 0.0))
    }
}

#[async_trait]
impl PositionStore for HttpPositionStore {
    fn save(&self, key: &SubjectKey, position_secs: f64) {
        let Some(credential) = self.credentials.bearer_token() else {
            debug!(subject = %key, "No credential, position not saved");
            return;
        };

        let request = match HttpRequest::post(self.endpoint.as_str())
            .bearer_token(credential.expose())
            .timeout(self.timeout)
            .json(&SavePositionBody::new(key, position_secs))
        {
            Ok(request) => request,
            Err(err) => {
                warn!(subject = %key, error = %err, "Could not encode position save");
                return;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            warn!(subject = %key, "No async runtime, position save dropped");
            return;
        };

        let http = Arc::clone(&self.http);
        let event_bus = self.event_bus.clone();
        let key = key.clone();

        runtime.spawn(async move {
            match http.execute_with_retry(request, RetryPolicy::none()).await {
                Ok(response) if response.is_success() => {
                    debug!(subject = %key, position_secs, "Position saved");
                    if let Some(bus) = event_bus {
                        let _ = bus.emit(CoreEvent::Playback(PlaybackEvent::PositionSaved {
                            subject: key.to_string(),
                            position_secs,
                        }));
                    }
                }
                Ok(response) => {
                    warn!(subject = %key, status = response.status, "Position save rejected");
                }
                Err(err) => {
                    warn!(subject = %key, error = %err, "Position save failed");
                }
            }
        });
    }

    #[instrument(skip(self, key), fields(subject = %key))]
    async fn fetch_last_position(&self, key: &SubjectKey) -> f64 {
        match self.try_fetch(key).await {
            Ok(Some(position)) => {
                debug!(position, "Found remembered position");
                position
            }
            Ok(None) => 0.0,
            Err(PlaybackError::NotAuthenticated) => {
                debug!("No credential, starting from the beginning");
                0.0
            }
            Err(err) => {
                warn!(error = %err, "Position lookup failed, starting from the beginning");
                0.0
            }
        }
    }
}
