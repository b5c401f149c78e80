// Listening-session boundary tracking

use chrono::{DateTime, Utc};

use crate::provider::Track;

/// Poll-to-poll session state. Owned by the scheduler task and passed into
/// each tick explicitly so the boundary rules stay unit-testable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    last_identity: Option<String>,
    session_start: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the track seen this tick and return the session start to
    /// report. A new session begins when the track identity changed or no
    /// session is open (the very first tick, or the tick after a
    /// "nothing playing" gap); otherwise the prior start carries forward.
    pub fn observe(&mut self, track: &Track, now: DateTime<Utc>) -> DateTime<Utc> {
        let changed = self.last_identity.as_deref() != Some(track.identity.as_str());
        let start = match self.session_start {
            Some(start) if !changed => start,
            _ => now,
        };
        self.session_start = Some(start);
        self.last_identity = Some(track.identity.clone());
        start
    }

    /// Forget the open session. Called when nothing is playing.
    pub fn clear(&mut self) {
        self.last_identity = None;
        self.session_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Map;

    fn track(identity: &str) -> Track {
        Track {
            name: "Hysteria".into(),
            artist: "Muse".into(),
            album: "Absolution".into(),
            album_art: None,
            identity: identity.into(),
            now_playing: true,
            extra: Map::new(),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn same_identity_keeps_the_session_start() {
        let mut state = SessionState::new();
        let first = state.observe(&track("a"), at(100));
        let second = state.observe(&track("a"), at(130));
        assert_eq!(first, at(100));
        assert_eq!(second, at(100));
    }

    #[test]
    fn changed_identity_starts_a_new_session() {
        let mut state = SessionState::new();
        let first = state.observe(&track("a"), at(100));
        let second = state.observe(&track("b"), at(160));
        assert_eq!(first, at(100));
        assert_eq!(second, at(160));
        assert_ne!(first, second);
    }

    #[test]
    fn a_playback_gap_restarts_the_session_for_the_same_track() {
        let mut state = SessionState::new();
        state.observe(&track("a"), at(100));
        state.clear();
        let restarted = state.observe(&track("a"), at(300));
        assert_eq!(restarted, at(300));
    }

    #[test]
    fn clear_empties_both_fields() {
        let mut state = SessionState::new();
        state.observe(&track("a"), at(100));
        state.clear();
        assert_eq!(state, SessionState::new());
    }
}
