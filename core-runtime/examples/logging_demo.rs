//! Prints what a sync run looks like in each log format.
//!
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_runtime=trace"
//! ```
//!
//! Entries at `WARN` and above are also mirrored to stderr through a
//! [`ConsoleLogger`] sink, with credentials redacted.

use bridge_traits::time::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, redact_query_credentials, LogFormat, LoggingConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let format = match args.next() {
        Some(name) => name.parse::<LogFormat>()?,
        None => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug)
        .with_logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }));
    if let Some(filter) = args.next() {
        config = config.with_filter(filter);
    }
    init_logging(config)?;

    let url = "https://music.example/rest/getArtists?u=admin&p=enc:68756e74657232&v=1.16.1&f=json";
    info!(url = %redact_query_credentials(url), ?format, "Catalog reachable");

    full_sync(&[("ar-1", "Joni Mitchell", 2), ("ar-2", "", 1)])
        .instrument(info_span!("full_sync", namespace = "navidrome"))
        .await;

    // Shows up on stdout and, redacted, on stderr through the sink.
    warn!(url, "Request failed, retrying");
    Ok(())
}

async fn full_sync(artists: &[(&str, &str, u32)]) {
    info!(artists = artists.len(), "Starting full sync");
    let mut songs_added = 0;
    for (id, name, albums) in artists {
        songs_added += walk_artist(id, name, *albums).await;
    }
    info!(songs_added, warnings = 1, "Sync completed");
}

#[instrument(skip(name))]
async fn walk_artist(artist_id: &str, name: &str, albums: u32) -> u32 {
    if name.is_empty() {
        warn!(artist_id, "Artist has no name, storing as Unknown Artist");
    }
    let mut songs = 0;
    for n in 1..=albums {
        tokio::time::sleep(Duration::from_millis(5)).await;
        debug!(album_id = %format!("{}-al-{}", artist_id, n), songs = 10, "Album upserted");
        songs += 10;
    }
    songs
}
