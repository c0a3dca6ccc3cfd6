//! # Logging
//!
//! `tracing-subscriber` setup for the sync engine: one of three output
//! formats on stdout, an `EnvFilter` that keeps HTTP and SQL internals quiet,
//! and an optional [`LoggerSink`] mirroring events into the host's own log.
//!
//! Subsonic URLs carry the account name and password in the query string.
//! With redaction on (the default) the sink only ever sees
//! `u=[REDACTED]&p=[REDACTED]`. The stdout layer prints what it is given, so
//! pass URLs through [`redact_query_credentials`] before logging them.
//!
//! ```ignore
//! use bridge_traits::time::{ConsoleLogger, LogLevel};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use std::sync::Arc;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_logger_sink(Arc::new(ConsoleLogger::default())),
//! )?;
//! tracing::info!(namespace = "navidrome", "Sync service starting");
//! ```

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::{format::FmtSpan, layer as fmt_layer},
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

const REDACTED: &str = "[REDACTED]";

/// Field names whose values never reach a sink in clear text.
const SENSITIVE_KEYS: &[&str] = &["password", "passwd", "secret", "token", "salt", "authorization"];

/// Subsonic auth parameters: user, password, token, salt.
const CREDENTIAL_PARAMS: &[&str] = &["u", "p", "t", "s"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, coloured
    Pretty,
    /// One JSON object per event
    Json,
    /// Single line per event
    Compact,
}

impl Default for LogFormat {
    /// `Pretty` in debug builds, `Json` in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(Error::Config(format!("unknown log format '{}'", other))),
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Replaces the default directives entirely, e.g. `"core_sync=trace"`.
    pub filter: Option<String>,
    pub redact: bool,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Emit span enter/exit in the pretty and JSON formats
    pub spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            redact: true,
            logger_sink: None,
            spans: true,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("redact", &self.redact)
            .field("logger_sink", &self.logger_sink.is_some())
            .field("spans", &self.spans)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, spans: bool) -> Self {
        self.spans = spans;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let directives = match &self.filter {
            Some(custom) => custom.clone(),
            None => default_directives(self.level),
        };
        EnvFilter::try_new(&directives)
            .map_err(|e| Error::Config(format!("invalid log filter '{}': {}", directives, e)))
    }
}

/// Workspace crates at `level`, transport and SQL crates at `warn`.
fn default_directives(level: LogLevel) -> String {
    const OURS: &[&str] = &[
        "library_sync_workspace",
        "bridge_desktop",
        "core_runtime",
        "core_library",
        "core_sync",
        "core_service",
        "provider_subsonic",
    ];
    const NOISY: &[&str] = &["h2", "hyper", "reqwest", "sqlx"];

    let level = level.as_str().to_ascii_lowercase();
    let mut directives: Vec<String> = OURS.iter().map(|c| format!("{}={}", c, level)).collect();
    directives.extend(NOISY.iter().map(|c| format!("{}=warn", c)));
    directives.join(",")
}

/// Install the global subscriber.
///
/// # Errors
///
/// `Error::Config` for a filter that does not parse, `Error::LoggingInit`
/// when a global subscriber already exists.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(config.logger_sink.clone().map(|sink| SinkLayer {
            sink,
            redact: config.redact,
        }));
    let span_events = if config.spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt_layer()
                    .pretty()
                    .with_span_events(span_events)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt_layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(config.spans)
                    .with_span_list(false)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt_layer().compact().with_writer(io::stdout))
            .try_init(),
    };

    installed.map_err(|e| Error::LoggingInit(e.to_string()))
}

/// Forwards events to a [`LoggerSink`], redacting first when asked to.
struct SinkLayer {
    sink: Arc<dyn LoggerSink>,
    redact: bool,
}

impl SinkLayer {
    fn build_entry<S>(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> Option<LogEntry>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let metadata = event.metadata();
        let level = log_level(*metadata.level());
        if level < self.sink.min_level() {
            return None;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields.message.unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(level, metadata.target(), self.scrub("message", message));
        for (key, value) in fields.values {
            let value = self.scrub(&key, value);
            entry.fields.insert(key, value);
        }
        entry.span_id = ctx.lookup_current().map(|span| span.name().to_string());
        Some(entry)
    }

    fn scrub(&self, key: &str, value: String) -> String {
        if self.redact {
            redact_query_credentials(&redact_if_sensitive(key, &value))
        } else {
            value
        }
    }
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(entry) = self.build_entry(event, &ctx) else {
            return;
        };
        let sink = Arc::clone(&self.sink);

        // Inside a runtime the write must not block the emitting task.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sink.log(entry).await {
                        eprintln!("log sink rejected entry: {}", e);
                    }
                });
            }
            Err(_) => {
                if let Err(e) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("log sink rejected entry: {}", e);
                }
            }
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: BTreeMap<String, String>,
}

impl FieldCollector {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{:?}", value));
    }
}

fn log_level(level: Level) -> LogLevel {
    match level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// `[REDACTED]` when `key` names a credential, `value` otherwise.
///
/// ```ignore
/// info!(password = %redact_if_sensitive("password", &config.password), "Configured server");
/// ```
pub fn redact_if_sensitive(key: &str, value: &str) -> String {
    let key = key.to_ascii_lowercase();
    if SENSITIVE_KEYS.iter().any(|s| key.contains(s)) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// Blank out Subsonic credential parameters (`u`, `p`, `t`, `s`) in every
/// query string found in `text`.
///
/// ```ignore
/// assert_eq!(
///     redact_query_credentials("https://music.example/rest/ping?u=admin&p=enc:7365&v=1.16.1"),
///     "https://music.example/rest/ping?u=[REDACTED]&p=[REDACTED]&v=1.16.1"
/// );
/// ```
pub fn redact_query_credentials(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['?', '&']) {
        out.push_str(&rest[..=pos]);
        rest = &rest[pos + 1..];

        let end = rest
            .find(|c: char| c == '&' || c == '#' || c.is_whitespace())
            .unwrap_or(rest.len());
        let (pair, tail) = rest.split_at(end);
        match pair.split_once('=') {
            Some((key, _)) if CREDENTIAL_PARAMS.contains(&key) => {
                out.push_str(key);
                out.push('=');
                out.push_str(REDACTED);
            }
            _ => out.push_str(pair),
        }
        rest = tail;
    }

    out.push_str(rest);
    out
}
