// Capability interfaces supplied by the embedding host
// The engine never depends on their concrete implementations

use std::future::Future;
use std::pin::Pin;

use crate::presence::ActivityUpdate;

/// Activity kind for "listening to" activities; the only kind this engine
/// emits, and the kind the foreign-player guard looks for.
pub const ACTIVITY_KIND_LISTENING: u8 = 2;

/// Minimal view of an activity already visible on the host, as consumed by
/// the foreign-player guard.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRef {
    pub kind: u8,
    pub application_id: String,
}

/// Event sink accepting activity updates for the current user.
pub trait ActivitySink: Send + Sync {
    fn dispatch(&self, update: ActivityUpdate);
}

/// Turns an image URL into a host-displayable asset handle.
pub trait AssetResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
}

/// Read access to the activities currently shown for the user.
pub trait ActivityQuery: Send + Sync {
    fn current_activities(&self) -> Vec<ActivityRef>;
}

/// Hook that forces this engine's activity past the host's visibility
/// filter. Installed at startup when always-share is configured and removed
/// at shutdown.
pub trait VisibilityOverride: Send + Sync {
    fn install(&self);
    fn remove(&self);
}
