use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_query_credentials, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for Recorder {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

// The global subscriber can be installed once per process, so everything that
// depends on it lives in this one test.
#[test]
fn test_global_install_forwards_to_sink() {
    let recorder = Arc::new(Recorder::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Info)
        .with_logger_sink(recorder.clone());
    init_logging(config).unwrap();

    tracing::info!(target: "core_sync", "below the sink threshold");
    tracing::warn!(
        target: "provider_subsonic",
        url = "https://music.example/rest/getAlbum?id=al-1&u=admin&p=enc:6869",
        "Subsonic request failed"
    );

    {
        let entries = recorder.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "provider_subsonic");
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert_eq!(
            entries[0].fields["url"],
            "https://music.example/rest/getAlbum?id=al-1&u=[REDACTED]&p=[REDACTED]"
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::LoggingInit(_))));
}

#[test]
fn test_default_config() {
    let config = LoggingConfig::default();
    assert_eq!(config.level, LogLevel::Info);
    assert!(config.redact);
    assert!(config.logger_sink.is_none());
    if cfg!(debug_assertions) {
        assert_eq!(config.format, LogFormat::Pretty);
    } else {
        assert_eq!(config.format, LogFormat::Json);
    }
}

#[test]
fn test_stream_url_keeps_non_credential_params() {
    let redacted = redact_query_credentials(
        "https://music.example/rest/stream?id=s1&u=admin&p=enc:6869&maxBitRate=192&format=opus",
    );

    assert_eq!(
        redacted,
        "https://music.example/rest/stream?id=s1&u=[REDACTED]&p=[REDACTED]&maxBitRate=192&format=opus"
    );
}
