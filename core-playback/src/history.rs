//! Recently played list.
//!
//! Rows come from the same `/recent` resource the position store writes to.
//! Each row is either a track or a podcast; [`RecentEntry::track`] is a
//! ready-to-play descriptor.

use crate::error::{PlaybackError, Result};
use crate::types::{id_string, lenient_seconds, opt_id_string, SubjectKind, Track};
use bridge_traits::http::{HttpClient, HttpRequest};
use core_auth::CredentialProvider;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct RecentEntry {
    /// Row id of the history record itself.
    pub entry_id: String,
    pub track: Track,
    pub last_position: f64,
}

#[derive(Debug, Deserialize)]
struct RecentRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    track_id: Option<String>,
    #[serde(default)]
    track_title: Option<String>,
    #[serde(default)]
    track_artist: Option<String>,
    #[serde(default)]
    track_audio: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    podcast_id: Option<String>,
    #[serde(default)]
    podcast_title: Option<String>,
    #[serde(default)]
    podcast_description: Option<String>,
    #[serde(default)]
    podcast_audio: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    last_position: Option<f64>,
}

impl RecentRow {
    /// A row is a track when it carries a track id, otherwise a podcast.
    /// Rows with neither are skipped.
    fn into_entry(self) -> Option<RecentEntry> {
        let (id, title, subtitle, audio, kind) = match self.track_id {
            Some(id) => (
                id,
                self.track_title,
                self.track_artist,
                self.track_audio,
                SubjectKind::Track,
            ),
            None => (
                self.podcast_id?,
                self.podcast_title,
                self.podcast_description,
                self.podcast_audio,
                SubjectKind::Podcast,
            ),
        };

        let track = Track::new(id, title.unwrap_or_default(), audio.unwrap_or_default())
            .with_artist(subtitle.unwrap_or_default())
            .with_kind(kind);

        Some(RecentEntry {
            entry_id: self.id,
            track,
            last_position: self.last_position.filter(|p| *p > 0.0).unwrap_or(0.0),
        })
    }
}

/// Client for the signed-in user's listening history.
pub struct RecentHistory {
    http: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
    endpoint: Url,
    timeout: Duration,
}

impl RecentHistory {
    pub fn new(
        http: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialProvider>,
        endpoint: Url,
    ) -> Self {
        Self {
            http,
            credentials,
            endpoint,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Most recent entries, in server order. Empty when signed out or when
    /// the request fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Vec<RecentEntry> {
        match self.try_list().await {
            Ok(entries) => {
                debug!(count = entries.len(), "Loaded recently played");
                entries
            }
            Err(PlaybackError::NotAuthenticated) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "Could not load recently played");
                Vec::new()
            }
        }
    }

    async fn try_list(&self) -> Result<Vec<RecentEntry>> {
        let credential = self
            .credentials
            .bearer_token()
            .ok_or(PlaybackError::NotAuthenticated)?;

        let request = HttpRequest::get(self.endpoint.as_str())
            .bearer_token(credential.expose())
            .timeout(self.timeout);

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(PlaybackError::Persistence(format!(
                "history returned status {}",
                response.status
            )));
        }

        let rows: Vec<RecentRow> = serde_json::from_slice(&response.body)
            .map_err(|e| PlaybackError::InvalidResponse(e.to_string()))?;

        Ok(rows.into_iter().filter_map(RecentRow::into_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use core_auth::StaticCredentials;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn history(mock: MockHttpClient) -> RecentHistory {
        RecentHistory::new(
            Arc::new(mock),
            Arc::new(StaticCredentials::new("tok", "u1")),
            Url::parse("https://api.example.com/recent").unwrap(),
        )
    }

    const ROWS: &str = r#"[
        {"id": 10, "track_id": 1, "track_title": "Song", "track_artist": "Band",
         "track_audio": "https://cdn/1.mp3", "podcast_id": null, "last_position": 42.5},
        {"id": 11, "track_id": null, "podcast_id": 7, "podcast_title": "Show",
         "podcast_description": "Weekly", "podcast_audio": "https://cdn/p7.mp3",
         "last_position": null},
        {"id": 12}
    ]"#;

    #[tokio::test]
    async fn test_list_maps_tracks_and_podcasts() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                req.url == "https://api.example.com/recent"
                    && req.authorization() == Some("Bearer tok")
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, ROWS)));

        let entries = history(mock).list().await;
        assert_eq!(entries.len(), 2);

        let song = &entries[0];
        assert_eq!(song.entry_id, "10");
        assert_eq!(song.track.subject_key().to_string(), "track:1");
        assert_eq!(song.track.artist, "Band");
        assert_eq!(song.track.audio_url, "https://cdn/1.mp3");
        assert_eq!(song.last_position, 42.5);

        let show = &entries[1];
        assert_eq!(show.track.subject_key().to_string(), "podcast:7");
        assert_eq!(show.track.title, "Show");
        assert_eq!(show.track.artist, "Weekly");
        assert_eq!(show.last_position, 0.0);
    }

    #[tokio::test]
    async fn test_list_errors_are_empty() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(401, "unauthorized")));
        assert!(history(mock).list().await.is_empty());

        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"not":"a list"}"#)));
        assert!(history(mock).list().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_signed_out_makes_no_request() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(0);

        let history = RecentHistory::new(
            Arc::new(mock),
            Arc::new(StaticCredentials::anonymous()),
            Url::parse("https://api.example.com/recent").unwrap(),
        );
        assert!(history.list().await.is_empty());
    }
}
