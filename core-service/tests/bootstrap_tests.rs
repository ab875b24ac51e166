//! End-to-end wiring: auth, HTTP persistence and the session coordinator
//! behind the service façade.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::{AudioOutput, DeviceListener, ListenerId};
use core_playback::{PlaybackStatus, SessionConfig, Track};
use core_runtime::config::CoreConfig;
use core_service::{CoreDependencies, CoreError, CoreService};
use mockall::mock;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

/// Minimal output: remembers the source and the clock.
#[derive(Default)]
struct TestOutput {
    clock: Mutex<f64>,
    source: Mutex<Option<String>>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn DeviceListener>)>>,
}

#[async_trait]
impl AudioOutput for TestOutput {
    fn load(&self, url: &str) -> BridgeResult<()> {
        *self.source.lock() = Some(url.to_string());
        *self.clock.lock() = 0.0;
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }

    fn seek(&self, seconds: f64) {
        *self.clock.lock() = seconds;
    }

    fn current_time(&self) -> f64 {
        *self.clock.lock()
    }

    fn duration(&self) -> Option<f64> {
        Some(240.0)
    }

    fn add_listener(&self, listener: Arc<dyn DeviceListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.lock().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().retain(|(existing, _)| *existing != id);
    }
}

type Requests = Arc<Mutex<Vec<HttpRequest>>>;

/// Mock that answers lookups with `last_position` and acknowledges saves,
/// recording every request.
fn recording_http(last_position: &'static str) -> (MockHttpClient, Requests) {
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    let mut mock = MockHttpClient::new();
    mock.expect_execute().returning(move |request| {
        let response = match request.method {
            HttpMethod::Get => HttpResponse::new(
                200,
                format!(r#"{{"last_position":{}}}"#, last_position).into_bytes(),
            ),
            _ => HttpResponse::new(201, Vec::new()),
        };
        recorded.lock().push(request);
        Ok(response)
    });
    (mock, requests)
}

fn bootstrap(http: MockHttpClient, output: Arc<TestOutput>) -> CoreService {
    let config = CoreConfig::builder()
        .api_base_url("https://api.example.com")
        .http_client(Arc::new(http))
        .build()
        .unwrap();
    CoreService::bootstrap(config, SessionConfig::default(), CoreDependencies::new(output))
        .unwrap()
}

fn token(id: u64) -> String {
    let payload = format!(r#"{{"id":{},"email":"u{}@example.com"}}"#, id, id);
    format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload))
}

fn track(id: &str) -> Track {
    Track::new(id, format!("Track {}", id), format!("https://cdn.example.com/{}.mp3", id))
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_resume_uses_bearer_lookup() {
    let (http, requests) = recording_http("42");
    let output = Arc::new(TestOutput::default());
    let core = bootstrap(http, output.clone());
    core.auth().sign_in(&token(5), "Listener", false).unwrap();

    core.playback().play_track(track("1")).await;

    assert_eq!(core.playback().snapshot().status, PlaybackStatus::Playing);
    assert_eq!(output.current_time(), 42.0);

    let requests = requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://api.example.com/recent?trackId=1");
    assert_eq!(requests[0].authorization(), Some(format!("Bearer {}", token(5)).as_str()));
}

#[tokio::test]
async fn test_switch_posts_outgoing_position() {
    let (http, requests) = recording_http("null");
    let output = Arc::new(TestOutput::default());
    let core = bootstrap(http, output.clone());
    core.auth().sign_in(&token(5), "Listener", false).unwrap();

    core.playback().play_track(track("1")).await;
    output.seek(25.0);
    core.playback().play_track(track("2")).await;
    settle().await;

    let requests = requests.lock();
    let posts: Vec<serde_json::Value> = requests
        .iter()
        .filter(|r| r.method == HttpMethod::Post)
        .map(|r| serde_json::from_slice(r.body.as_ref().unwrap()).unwrap())
        .collect();
    assert_eq!(
        posts,
        vec![serde_json::json!({"trackId": "1", "podcastId": null, "lastPosition": 25.0})]
    );
}

#[tokio::test]
async fn test_sign_out_stops_playback_without_authenticated_calls() {
    let (http, requests) = recording_http("null");
    let output = Arc::new(TestOutput::default());
    let core = bootstrap(http, output.clone());
    core.auth().sign_in(&token(5), "Listener", false).unwrap();

    core.playback().play_track(track("1")).await;
    output.seek(30.0);
    let mut state = core.playback().watch();

    core.auth().sign_out();
    tokio::time::timeout(Duration::from_secs(1), state.wait_for(|s| s.is_idle()))
        .await
        .expect("playback stopped")
        .expect("coordinator alive");
    settle().await;

    // Only the resume lookup went out; the reset save had no credential.
    let requests = requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(output.current_time(), 0.0);
}

#[tokio::test]
async fn test_recently_played_through_facade() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .times(1)
        .returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"[{"id":1,"track_id":3,"track_title":"Song","track_audio":"https://cdn/3.mp3","last_position":12}]"#,
            ))
        });
    let core = bootstrap(http, Arc::new(TestOutput::default()));
    core.auth().sign_in(&token(5), "Listener", false).unwrap();

    let recent = core.recently_played().await;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].track.subject_key().to_string(), "track:3");
    assert_eq!(recent[0].last_position, 12.0);
}

#[tokio::test]
async fn test_invalid_recent_path_is_config_error() {
    let config = CoreConfig::builder()
        .api_base_url("https://api.example.com")
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .unwrap();
    let session = SessionConfig {
        recent_path: "http://[::1".to_string(),
        ..Default::default()
    };

    let result = CoreService::bootstrap(
        config,
        session,
        CoreDependencies::new(Arc::new(TestOutput::default())),
    );
    assert!(matches!(result, Err(CoreError::Config(_))));
}

#[test]
fn test_bootstrap_requires_runtime() {
    let config = CoreConfig::builder()
        .api_base_url("https://api.example.com")
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .unwrap();

    let result = CoreService::bootstrap(
        config,
        SessionConfig::default(),
        CoreDependencies::new(Arc::new(TestOutput::default())),
    );
    assert!(matches!(result, Err(CoreError::InitializationFailed(_))));
}
