// Album-art resolution for ListenBrainz tracks
// Release art first, then release-group art, then nothing

use std::future::Future;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::provider::{relayed, Track, MUSICBRAINZ_URL, RELAY_UA_HEADER, RELAY_UA_VALUE};

const COVERART_URL: &str = "https://coverartarchive.org";
const ART_CDN_URL: &str = "https://aart.yellows.ink";
const LISTENBRAINZ_API_URL: &str = "https://api.listenbrainz.org";

pub fn release_art_url(release_mbid: &str) -> String {
    format!("{ART_CDN_URL}/release/{release_mbid}.webp")
}

pub fn release_group_art_url(group_id: &str) -> String {
    format!("{ART_CDN_URL}/release-group/{group_id}.webp")
}

/// HTTP surface of the art chain. Split out so the fallback policy can be
/// exercised without a network.
pub trait CoverArt: Send + Sync {
    /// Metadata-lookup enrichment by track and artist name. `None` on any
    /// failure.
    fn lookup_metadata(
        &self,
        recording: &str,
        artist: &str,
    ) -> impl Future<Output = Option<Map<String, Value>>> + Send;

    /// Probe the cover-art archive for release-level art. `Some(true)` when
    /// art exists, `Some(false)` on a definitive "not found", `None` on a
    /// transport failure.
    fn probe_release_art(&self, release_mbid: &str) -> impl Future<Output = Option<bool>> + Send;

    /// Resolve a release's parent release-group id.
    fn lookup_release_group(
        &self,
        release_mbid: &str,
    ) -> impl Future<Output = Option<String>> + Send;

    /// Final check that a chosen art URL actually serves an image.
    fn verify_art(&self, url: &str) -> impl Future<Output = bool> + Send;
}

/// Best-effort album-art resolution. Enriches the track's metadata when it
/// lacks a release id, probes release art, falls back to release-group art,
/// and verifies the winner. Every failure leaves the art absent; nothing here
/// can fail the surrounding update cycle.
pub async fn resolve_album_art<C: CoverArt>(cover: &C, track: &mut Track, mbid_lookup: bool) {
    if mbid_lookup && track.release_mbid().is_none() {
        match cover.lookup_metadata(&track.name, &track.artist).await {
            Some(meta) => merge_missing(&mut track.extra, meta),
            None => log::debug!(
                "Metadata lookup for {} - {} found nothing",
                track.artist,
                track.name
            ),
        }
    }

    let Some(release_mbid) = track.release_mbid().map(str::to_owned) else {
        return;
    };

    let url = match cover.probe_release_art(&release_mbid).await {
        Some(true) => release_art_url(&release_mbid),
        Some(false) => match cover.lookup_release_group(&release_mbid).await {
            Some(group_id) => release_group_art_url(&group_id),
            None => return,
        },
        None => return,
    };

    if cover.verify_art(&url).await {
        track.album_art = Some(url);
    } else {
        log::debug!("Art URL {url} failed verification, discarding it");
    }
}

/// Merge fetched metadata into the track's extra fields. Fields already
/// present win over newly fetched ones.
fn merge_missing(extra: &mut Map<String, Value>, fetched: Map<String, Value>) {
    for (key, value) in fetched {
        extra.entry(key).or_insert(value);
    }
}

/// Production [`CoverArt`] implementation backed by reqwest.
pub struct CoverArtClient {
    client: reqwest::Client,
    // The release probe must see the archive's own status, not a redirect
    // target's, so it uses a client that never follows redirects.
    no_redirect: reqwest::Client,
}

impl CoverArtClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            no_redirect: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .context("Failed to build cover-art HTTP client")?,
        })
    }
}

impl CoverArt for CoverArtClient {
    async fn lookup_metadata(&self, recording: &str, artist: &str) -> Option<Map<String, Value>> {
        let url = relayed(&format!("{LISTENBRAINZ_API_URL}/1/metadata/lookup/"));
        let res = match self
            .client
            .get(&url)
            .query(&[
                ("recording_name", recording),
                ("artist_name", artist),
                ("metadata", "true"),
                ("inc", "artist tag release"),
            ])
            .header(RELAY_UA_HEADER, RELAY_UA_VALUE)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                log::warn!("Metadata lookup for {artist} - {recording} failed: {e}");
                return None;
            }
        };

        if !res.status().is_success() {
            log::warn!("Metadata lookup returned status {}", res.status());
            return None;
        }

        match res.json::<Map<String, Value>>().await {
            Ok(meta) => Some(meta),
            Err(e) => {
                log::warn!("Metadata lookup returned a malformed payload: {e}");
                None
            }
        }
    }

    async fn probe_release_art(&self, release_mbid: &str) -> Option<bool> {
        let url = format!("{COVERART_URL}/release/{release_mbid}/front");
        match self.no_redirect.head(&url).send().await {
            // Anything but a definitive 404 counts as present; the archive
            // answers with a redirect when art exists.
            Ok(res) => Some(res.status() != reqwest::StatusCode::NOT_FOUND),
            Err(e) => {
                log::debug!("Cover-art probe failed: {e}");
                None
            }
        }
    }

    async fn lookup_release_group(&self, release_mbid: &str) -> Option<String> {
        let url = relayed(&format!(
            "{MUSICBRAINZ_URL}/ws/2/release/{release_mbid}?fmt=json&inc=release-groups"
        ));
        let res = match self
            .client
            .get(&url)
            .header(RELAY_UA_HEADER, RELAY_UA_VALUE)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                log::debug!("Release-group lookup failed: {e}");
                return None;
            }
        };

        if !res.status().is_success() {
            log::debug!("Release-group lookup returned status {}", res.status());
            return None;
        }

        let body: Value = res.json().await.ok()?;
        body.get("release-group")?
            .get("id")?
            .as_str()
            .map(str::to_owned)
    }

    async fn verify_art(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                log::debug!("Art verification failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedCoverArt {
        metadata: Option<Map<String, Value>>,
        probe: Option<bool>,
        group: Option<String>,
        verify: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedCoverArt {
        fn new() -> Self {
            Self {
                metadata: None,
                probe: None,
                group: None,
                verify: true,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CoverArt for ScriptedCoverArt {
        async fn lookup_metadata(&self, _: &str, _: &str) -> Option<Map<String, Value>> {
            self.calls.lock().unwrap().push("lookup_metadata");
            self.metadata.clone()
        }

        async fn probe_release_art(&self, _: &str) -> Option<bool> {
            self.calls.lock().unwrap().push("probe_release_art");
            self.probe
        }

        async fn lookup_release_group(&self, _: &str) -> Option<String> {
            self.calls.lock().unwrap().push("lookup_release_group");
            self.group.clone()
        }

        async fn verify_art(&self, _: &str) -> bool {
            self.calls.lock().unwrap().push("verify_art");
            self.verify
        }
    }

    fn track_with(extra: Map<String, Value>) -> Track {
        Track {
            name: "Hysteria".into(),
            artist: "Muse".into(),
            album: "Absolution".into(),
            album_art: None,
            identity: "https://musicbrainz.org/recording/x".into(),
            now_playing: true,
            extra,
        }
    }

    fn extra_with_release(mbid: &str) -> Map<String, Value> {
        let mut extra = Map::new();
        extra.insert("release_mbid".into(), json!(mbid));
        extra
    }

    #[tokio::test]
    async fn release_art_wins_without_a_group_lookup() {
        let mut cover = ScriptedCoverArt::new();
        cover.probe = Some(true);
        let mut track = track_with(extra_with_release("rel-1"));

        resolve_album_art(&cover, &mut track, true).await;

        assert_eq!(track.album_art.as_deref(), Some(release_art_url("rel-1").as_str()));
        assert!(!cover.calls().contains(&"lookup_release_group"));
    }

    #[tokio::test]
    async fn not_found_release_falls_back_to_release_group() {
        let mut cover = ScriptedCoverArt::new();
        cover.probe = Some(false);
        cover.group = Some("grp-9".into());
        let mut track = track_with(extra_with_release("rel-1"));

        resolve_album_art(&cover, &mut track, true).await;

        assert_eq!(
            track.album_art.as_deref(),
            Some(release_group_art_url("grp-9").as_str())
        );
    }

    #[tokio::test]
    async fn failed_group_lookup_leaves_art_absent() {
        let mut cover = ScriptedCoverArt::new();
        cover.probe = Some(false);
        let mut track = track_with(extra_with_release("rel-1"));

        resolve_album_art(&cover, &mut track, true).await;

        assert!(track.album_art.is_none());
        assert!(!cover.calls().contains(&"verify_art"));
    }

    #[tokio::test]
    async fn failed_verification_discards_the_chosen_url() {
        let mut cover = ScriptedCoverArt::new();
        cover.probe = Some(true);
        cover.verify = false;
        let mut track = track_with(extra_with_release("rel-1"));

        resolve_album_art(&cover, &mut track, true).await;

        assert!(track.album_art.is_none());
    }

    #[tokio::test]
    async fn probe_transport_failure_terminates_the_chain() {
        let cover = ScriptedCoverArt::new();
        let mut track = track_with(extra_with_release("rel-1"));

        resolve_album_art(&cover, &mut track, true).await;

        assert!(track.album_art.is_none());
        assert_eq!(cover.calls(), vec!["probe_release_art"]);
    }

    #[tokio::test]
    async fn enrichment_supplies_the_missing_release_id() {
        let mut cover = ScriptedCoverArt::new();
        let mut meta = Map::new();
        meta.insert("release_mbid".into(), json!("rel-7"));
        meta.insert("recording_mbid".into(), json!("rec-7"));
        cover.metadata = Some(meta);
        cover.probe = Some(true);
        let mut track = track_with(Map::new());

        resolve_album_art(&cover, &mut track, true).await;

        assert_eq!(track.release_mbid(), Some("rel-7"));
        assert_eq!(track.recording_mbid(), Some("rec-7"));
        assert_eq!(track.album_art.as_deref(), Some(release_art_url("rel-7").as_str()));
    }

    #[tokio::test]
    async fn existing_metadata_wins_over_fetched_metadata() {
        let mut cover = ScriptedCoverArt::new();
        let mut meta = Map::new();
        meta.insert("recording_mbid".into(), json!("fetched"));
        meta.insert("release_mbid".into(), json!("rel-7"));
        cover.metadata = Some(meta);
        cover.probe = Some(true);

        let mut extra = Map::new();
        extra.insert("recording_mbid".into(), json!("original"));
        let mut track = track_with(extra);

        resolve_album_art(&cover, &mut track, true).await;

        assert_eq!(track.recording_mbid(), Some("original"));
        assert_eq!(track.release_mbid(), Some("rel-7"));
    }

    #[tokio::test]
    async fn lookup_disabled_and_no_release_id_makes_no_calls() {
        let cover = ScriptedCoverArt::new();
        let mut track = track_with(Map::new());

        resolve_album_art(&cover, &mut track, false).await;

        assert!(track.album_art.is_none());
        assert!(cover.calls().is_empty());
    }

    #[tokio::test]
    async fn known_release_id_skips_enrichment() {
        let mut cover = ScriptedCoverArt::new();
        cover.probe = Some(true);
        let mut track = track_with(extra_with_release("rel-1"));

        resolve_album_art(&cover, &mut track, true).await;

        assert!(!cover.calls().contains(&"lookup_metadata"));
    }
}
