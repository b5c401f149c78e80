// Standalone runner: wires the engine to logging-backed host stand-ins so it
// can be observed outside an embedding host.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use clap::Parser;

use scrobble_presence::art::CoverArtClient;
use scrobble_presence::config::{Config, Service};
use scrobble_presence::host::{
    ActivityQuery, ActivityRef, ActivitySink, AssetResolver, VisibilityOverride,
};
use scrobble_presence::presence::ActivityUpdate;
use scrobble_presence::provider::{LastFm, ListenBrainz};
use scrobble_presence::scheduler::{Engine, Scheduler};

#[derive(Parser)]
#[command(name = "scrobble-presence", version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured user handle
    #[arg(long)]
    user: Option<String>,

    /// Override the configured service (lastfm or listenbrainz)
    #[arg(long)]
    service: Option<String>,

    /// Override the poll interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
}

/// Logs every dispatched update instead of forwarding it to a host.
struct LogSink;

impl ActivitySink for LogSink {
    fn dispatch(&self, update: ActivityUpdate) {
        match serde_json::to_string(&update) {
            Ok(json) => log::info!("Activity update: {json}"),
            Err(e) => log::warn!("Failed to serialize activity update: {e}"),
        }
    }
}

/// Passes the image URL through unchanged; a real host would upload it and
/// return an asset handle.
struct PassthroughAssets;

impl AssetResolver for PassthroughAssets {
    fn resolve<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move { Some(url.to_owned()) })
    }
}

/// No host, no other activities to inspect.
struct NoActivities;

impl ActivityQuery for NoActivities {
    fn current_activities(&self) -> Vec<ActivityRef> {
        Vec::new()
    }
}

struct NoVisibilityHook;

impl VisibilityOverride for NoVisibilityHook {
    fn install(&self) {
        log::debug!("Visibility override requested, nothing to patch outside a host");
    }

    fn remove(&self) {}
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(user) = args.user {
        config.user = user;
    }
    if let Some(service) = args.service {
        config.service = service.parse::<Service>()?;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = interval_ms;
    }
    config.validate()?;

    log::info!(
        "Mirroring {} for user {:?} every {:?}",
        match config.service {
            Service::LastFm => "Last.fm",
            Service::ListenBrainz => "ListenBrainz",
        },
        config.user,
        config.interval()
    );

    let engine = Engine::new(
        Arc::new(RwLock::new(config)),
        LastFm::new(),
        ListenBrainz::new(),
        CoverArtClient::new()?,
        Arc::new(LogSink),
        Arc::new(PassthroughAssets),
        Arc::new(NoActivities),
    );
    let scheduler = Scheduler::start(engine, Arc::new(NoVisibilityHook));

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");
    scheduler.shutdown().await;

    Ok(())
}
