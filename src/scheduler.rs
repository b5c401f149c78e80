// Poll scheduler
// Drives one full update cycle per timer fire and owns the session state

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::art::{resolve_album_art, CoverArt};
use crate::config::{Config, Service};
use crate::host::{ActivityQuery, ActivitySink, AssetResolver, VisibilityOverride, ACTIVITY_KIND_LISTENING};
use crate::presence::{PresenceEmitter, APPLICATION_ID, DEFAULT_DISPLAY_NAME};
use crate::provider::TrackSource;
use crate::session::SessionState;
use crate::template;

/// The presence-synchronization engine: everything one update cycle needs.
/// Generic over the provider clients and the art chain's HTTP surface so the
/// cycle can be exercised without a network.
pub struct Engine<L, B, C> {
    config: Arc<RwLock<Config>>,
    lastfm: L,
    listenbrainz: B,
    cover_art: C,
    emitter: PresenceEmitter,
    activities: Arc<dyn ActivityQuery>,
    active: Arc<AtomicBool>,
}

impl<L, B, C> Engine<L, B, C>
where
    L: TrackSource,
    B: TrackSource,
    C: CoverArt,
{
    pub fn new(
        config: Arc<RwLock<Config>>,
        lastfm: L,
        listenbrainz: B,
        cover_art: C,
        sink: Arc<dyn ActivitySink>,
        assets: Arc<dyn AssetResolver>,
        activities: Arc<dyn ActivityQuery>,
    ) -> Self {
        let active = Arc::new(AtomicBool::new(true));
        Self {
            config,
            lastfm,
            listenbrainz,
            cover_art,
            emitter: PresenceEmitter::new(sink, assets, active.clone()),
            activities,
            active,
        }
    }

    /// One full update cycle. `session` is the only state a tick mutates.
    pub async fn tick(&self, session: &mut SessionState) {
        let cfg = self.config.read().unwrap().clone();

        if cfg.user.is_empty() {
            self.emitter.clear();
            return;
        }

        if cfg.ignore_other_players && self.foreign_player_active() {
            log::debug!("Another player is reporting a listening activity, standing down");
            self.emitter.clear();
            return;
        }

        let fetched = match cfg.service {
            Service::LastFm => self.lastfm.fetch_current_track(&cfg.user).await,
            Service::ListenBrainz => self.listenbrainz.fetch_current_track(&cfg.user).await,
        };

        let mut track = match fetched {
            Some(track) if track.now_playing => track,
            _ => {
                session.clear();
                self.emitter.clear();
                return;
            }
        };

        // Last.fm responses already carry an art URL; only ListenBrainz
        // tracks go through the resolution chain.
        if cfg.service == Service::ListenBrainz {
            resolve_album_art(&self.cover_art, &mut track, cfg.mbid_lookup).await;
        }

        let start = session.observe(&track, Utc::now());

        let display_name = if cfg.template.is_empty() {
            DEFAULT_DISPLAY_NAME.to_owned()
        } else {
            template::render(&cfg.template, &track)
        };

        self.emitter
            .emit(&display_name, &track, cfg.stamp.then_some(start))
            .await;
    }

    fn foreign_player_active(&self) -> bool {
        self.activities
            .current_activities()
            .iter()
            .any(|a| a.kind == ACTIVITY_KIND_LISTENING && a.application_id != APPLICATION_ID)
    }
}

/// Handle to the running poll loop.
///
/// The loop awaits each tick to completion before arming the next sleep, so
/// cycles never overlap even when one outlasts the interval; a slow cycle
/// simply delays the next one.
pub struct Scheduler {
    interval_tx: watch::Sender<Duration>,
    shutdown_tx: watch::Sender<bool>,
    active: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Arm the poll loop. Installs the visibility override up front when
    /// always-share is configured.
    pub fn start<L, B, C>(
        engine: Engine<L, B, C>,
        visibility: Arc<dyn VisibilityOverride>,
    ) -> Self
    where
        L: TrackSource + 'static,
        B: TrackSource + 'static,
        C: CoverArt + 'static,
    {
        let (interval, always_share) = {
            let cfg = engine.config.read().unwrap();
            (cfg.interval(), cfg.always_share)
        };

        if always_share {
            visibility.install();
        }

        let (interval_tx, mut interval_rx) = watch::channel(interval);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let active = engine.active.clone();

        let handle = tokio::spawn(async move {
            let mut session = SessionState::new();
            loop {
                let interval = *interval_rx.borrow_and_update();
                let sleep = tokio::time::sleep(interval);
                tokio::pin!(sleep);

                tokio::select! {
                    _ = &mut sleep => {}
                    changed = interval_rx.changed() => {
                        // Re-arm the sleep with the new interval.
                        if changed.is_ok() {
                            continue;
                        }
                        break;
                    }
                    _ = shutdown_rx.changed() => break,
                }

                engine.tick(&mut session).await;

                if *shutdown_rx.borrow() {
                    break;
                }
            }

            if always_share {
                visibility.remove();
            }
            engine.emitter.force_clear();
            log::info!("Poll loop stopped");
        });

        Self {
            interval_tx,
            shutdown_tx,
            active,
            handle,
        }
    }

    /// Re-arm the timer with a new interval.
    pub fn set_interval(&self, interval: Duration) {
        log::debug!("Poll interval changed to {:?}", interval);
        let _ = self.interval_tx.send(interval);
    }

    /// Stop ticking, suppress any in-flight emission, and send exactly one
    /// final clear.
    pub async fn shutdown(self) {
        self.active.store(false, Ordering::Relaxed);
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            log::warn!("Poll task ended abnormally: {e}");
        }
    }
}
