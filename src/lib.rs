//! Presence-synchronization engine that mirrors the currently playing track
//! from Last.fm or ListenBrainz into a host application's rich-presence
//! activity slot.
//!
//! The host-specific pieces (event sink, asset upload, activity-list access,
//! visibility patching) are capability traits in [`host`]; everything else is
//! self-contained: provider clients, the album-art fallback chain, session
//! boundary tracking, display-name templating, and the poll scheduler.

pub mod art;
pub mod config;
pub mod host;
pub mod presence;
pub mod provider;
pub mod scheduler;
pub mod session;
pub mod template;
