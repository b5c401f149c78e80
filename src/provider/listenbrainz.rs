// ListenBrainz provider client
// API Documentation: https://listenbrainz.readthedocs.io/

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{relayed, Track, TrackSource, MUSICBRAINZ_URL, RELAY_UA_HEADER, RELAY_UA_VALUE};

const API_URL: &str = "https://api.listenbrainz.org";

pub struct ListenBrainz {
    client: reqwest::Client,
}

impl ListenBrainz {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ListenBrainz {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackSource for ListenBrainz {
    async fn fetch_current_track(&self, user: &str) -> Option<Track> {
        let url = relayed(&format!("{API_URL}/1/user/{user}/playing-now"));
        let res = match self
            .client
            .get(&url)
            .header(RELAY_UA_HEADER, RELAY_UA_VALUE)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                log::debug!("ListenBrainz request failed: {e}");
                return None;
            }
        };

        if !res.status().is_success() {
            log::debug!("ListenBrainz returned status {}", res.status());
            return None;
        }

        let body = match res.text().await {
            Ok(body) => body,
            Err(e) => {
                log::debug!("Failed to read ListenBrainz response: {e}");
                return None;
            }
        };

        parse_playing_now(&body)
    }
}

#[derive(Deserialize)]
struct PlayingNowResponse {
    payload: PlayingNowPayload,
}

#[derive(Deserialize)]
struct PlayingNowPayload {
    count: u32,
    #[serde(default)]
    listens: Vec<Listen>,
}

#[derive(Deserialize)]
struct Listen {
    track_metadata: TrackMetadata,
    #[serde(default)]
    playing_now: bool,
}

#[derive(Deserialize)]
struct TrackMetadata {
    track_name: String,
    artist_name: String,
    #[serde(default)]
    release_name: String,
    #[serde(default)]
    additional_info: Map<String, Value>,
}

fn parse_playing_now(body: &str) -> Option<Track> {
    let body: PlayingNowResponse = match serde_json::from_str(body) {
        Ok(body) => body,
        Err(e) => {
            log::debug!("Malformed ListenBrainz payload: {e}");
            return None;
        }
    };

    if body.payload.count == 0 {
        return None;
    }

    let listen = body.payload.listens.into_iter().next()?;
    let md = listen.track_metadata;

    let identity = match md.additional_info.get("recording_mbid").and_then(Value::as_str) {
        Some(mbid) => format!("{MUSICBRAINZ_URL}/recording/{mbid}"),
        None => Track::synthetic_identity(&md.track_name, &md.artist_name, &md.release_name),
    };

    Some(Track {
        name: md.track_name,
        artist: md.artist_name,
        album: md.release_name,
        album_art: None,
        identity,
        now_playing: listen.playing_now,
        extra: md.additional_info,
    })
}
