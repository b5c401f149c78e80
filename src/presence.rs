// Presence emission
// Builds the host activity payload and dispatches it through the sink

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::host::{ActivitySink, AssetResolver, ACTIVITY_KIND_LISTENING};
use crate::provider::Track;

/// Application identity reported with every activity; also what the
/// foreign-player guard uses to recognize its own activity.
pub const APPLICATION_ID: &str = "1054951789318909972";

/// Identifies this engine's updates on the host event bus.
pub const SOCKET_ID: &str = "scrobble-presence";

/// Display name used when no template is configured.
pub const DEFAULT_DISPLAY_NAME: &str = "Music";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub details: String,
    pub state: String,
    pub application_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    pub assets: Assets,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timestamps {
    pub start: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Assets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
}

/// One dispatch to the host: a fresh activity, or a clear.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityUpdate {
    pub socket_id: String,
    pub activity: Option<Activity>,
}

impl ActivityUpdate {
    pub fn clear() -> Self {
        Self {
            socket_id: SOCKET_ID.to_owned(),
            activity: None,
        }
    }

    pub fn set(activity: Activity) -> Self {
        Self {
            socket_id: SOCKET_ID.to_owned(),
            activity: Some(activity),
        }
    }
}

/// The sole mutation point for the host's externally visible state.
pub struct PresenceEmitter {
    sink: Arc<dyn ActivitySink>,
    assets: Arc<dyn AssetResolver>,
    active: Arc<AtomicBool>,
}

impl PresenceEmitter {
    pub fn new(
        sink: Arc<dyn ActivitySink>,
        assets: Arc<dyn AssetResolver>,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sink,
            assets,
            active,
        }
    }

    /// Dispatch a clear payload, hiding the activity.
    pub fn clear(&self) {
        self.dispatch(ActivityUpdate::clear());
    }

    /// Dispatch the activity for a playing track. `start` is the session
    /// start to report, already gated on the elapsed-time stamp setting.
    pub async fn emit(&self, display_name: &str, track: &Track, start: Option<DateTime<Utc>>) {
        let large_image = match &track.album_art {
            Some(url) => self.assets.resolve(url).await,
            None => None,
        };

        let activity = Activity {
            name: display_name.to_owned(),
            kind: ACTIVITY_KIND_LISTENING,
            details: track.name.clone(),
            state: track.artist.clone(),
            application_id: APPLICATION_ID.to_owned(),
            timestamps: start.map(|s| Timestamps {
                start: s.timestamp_millis(),
            }),
            assets: Assets {
                large_image,
                large_text: (!track.album.is_empty()).then(|| track.album.clone()),
            },
        };

        self.dispatch(ActivityUpdate::set(activity));
    }

    fn dispatch(&self, update: ActivityUpdate) {
        // An update racing deactivation must not reach the host.
        if !self.active.load(Ordering::Relaxed) {
            log::debug!("Engine deactivated, dropping a late activity update");
            return;
        }
        self.sink.dispatch(update);
    }

    /// Final clear on deactivation; bypasses the active gate.
    pub(crate) fn force_clear(&self) {
        self.sink.dispatch(ActivityUpdate::clear());
    }
}
