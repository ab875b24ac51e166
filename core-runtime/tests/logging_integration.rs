//! Integration tests for the logging system

use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_query, LogFormat, LogLevel, LoggingConfig,
};
use core_runtime::Error;

#[test]
fn test_init_logging_only_once() {
    // The global subscriber can be installed a single time per process.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    init_logging(config.clone()).expect("first initialization succeeds");
    tracing::info!(subject = "track:1", "logging initialized");

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::LoggingAlreadyInitialized)));
}

#[test]
fn test_credentials_never_logged_in_clear() {
    for field in ["token", "bearer", "authorization", "refresh_token", "credential"] {
        assert_eq!(redact_if_sensitive(field, "eyJhbGciOi.payload.sig"), "[REDACTED]");
    }
}

#[test]
fn test_normal_values_pass_through() {
    assert_eq!(redact_if_sensitive("subject", "podcast:7"), "podcast:7");
    assert_eq!(redact_if_sensitive("title", "Sample Track"), "Sample Track");
}

#[test]
fn test_signed_audio_urls_are_trimmed() {
    let url = "https://media.example.com/tracks/1.mp3?X-Amz-Signature=deadbeef";
    assert_eq!(strip_query(url), "https://media.example.com/tracks/1.mp3");
}
