// Last.fm provider client
// Fetches the most recent track via user.getrecenttracks

use serde::Deserialize;
use serde_json::Map;

use super::{Track, TrackSource};

const API_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const API_KEY: &str = "2f1bcb4e3eaba77dbd62b3e48af316d9";

pub struct LastFm {
    client: reqwest::Client,
}

impl LastFm {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for LastFm {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackSource for LastFm {
    async fn fetch_current_track(&self, user: &str) -> Option<Track> {
        let res = match self
            .client
            .get(API_URL)
            .query(&[
                ("method", "user.getrecenttracks"),
                ("user", user),
                ("api_key", API_KEY),
                ("format", "json"),
                ("limit", "1"),
                ("extended", "1"),
            ])
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                log::debug!("Last.fm request failed: {e}");
                return None;
            }
        };

        if !res.status().is_success() {
            log::debug!("Last.fm returned status {}", res.status());
            return None;
        }

        let body = match res.text().await {
            Ok(body) => body,
            Err(e) => {
                log::debug!("Failed to read Last.fm response: {e}");
                return None;
            }
        };

        parse_recent_tracks(&body)
    }
}

#[derive(Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracks,
}

#[derive(Deserialize)]
struct RecentTracks {
    #[serde(default)]
    track: Vec<RecentTrack>,
}

#[derive(Deserialize)]
struct RecentTrack {
    name: String,
    artist: Artist,
    album: TextValue,
    #[serde(default)]
    image: Vec<TextValue>,
    url: String,
    #[serde(rename = "@attr")]
    attr: Option<TrackAttr>,
}

#[derive(Deserialize)]
struct Artist {
    name: String,
}

#[derive(Deserialize)]
struct TextValue {
    #[serde(rename = "#text", default)]
    text: String,
}

#[derive(Deserialize)]
struct TrackAttr {
    nowplaying: Option<String>,
}

fn parse_recent_tracks(body: &str) -> Option<Track> {
    let body: RecentTracksResponse = match serde_json::from_str(body) {
        Ok(body) => body,
        Err(e) => {
            log::debug!("Malformed Last.fm payload: {e}");
            return None;
        }
    };

    let track = body.recenttracks.track.into_iter().next()?;

    // image[3] is the largest size Last.fm returns; an empty value means the
    // service has no art for this track.
    let album_art = track
        .image
        .get(3)
        .map(|i| i.text.clone())
        .filter(|url| !url.is_empty());

    Some(Track {
        name: track.name,
        artist: track.artist.name,
        album: track.album.text,
        album_art,
        identity: track.url,
        now_playing: track.attr.map_or(false, |a| a.nowplaying.is_some()),
        extra: Map::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_PLAYING: &str = r##"{
        "recenttracks": {
            "track": [{
                "name": "Hysteria",
                "artist": {"name": "Muse", "url": "https://www.last.fm/music/Muse"},
                "album": {"#text": "Absolution", "mbid": ""},
                "image": [
                    {"size": "small", "#text": "https://img.example/s.png"},
                    {"size": "medium", "#text": "https://img.example/m.png"},
                    {"size": "large", "#text": "https://img.example/l.png"},
                    {"size": "extralarge", "#text": "https://img.example/xl.png"}
                ],
                "url": "https://www.last.fm/music/Muse/_/Hysteria","@attr": {"nowplaying": "true"}
            }]
        }
    }"##;

    #[test]
    fn parses_a_now_playing_track() {
        let track = parse_recent_tracks(NOW_PLAYING).unwrap();
        assert_eq!(track.name, "Hysteria");
        assert_eq!(track.artist, "Muse");
        assert_eq!(track.album, "Absolution");
        assert_eq!(track.album_art.as_deref(), Some("https://img.example/xl.png"));
        assert_eq!(track.identity, "https://www.last.fm/music/Muse/_/Hysteria");
        assert!(track.now_playing);
    }

    #[test]
    fn missing_nowplaying_attr_means_historic_listen() {
        let body = NOW_PLAYING.replace(r#","@attr": {"nowplaying": "true"}"#, "");
        let track = parse_recent_tracks(&body).unwrap();
        assert!(!track.now_playing);
    }

    #[test]
    fn empty_track_list_yields_none() {
        assert!(parse_recent_tracks(r#"{"recenttracks": {"track": []}}"#).is_none());
    }

    #[test]
    fn empty_art_slot_yields_no_art() {
        let body = NOW_PLAYING.replace("https://img.example/xl.png", "");
        let track = parse_recent_tracks(&body).unwrap();
        assert!(track.album_art.is_none());
    }

    #[test]
    fn garbage_payload_yields_none() {
        assert!(parse_recent_tracks("not json").is_none());
        assert!(parse_recent_tracks(r#"{"error": 6, "message": "User not found"}"#).is_none());
    }
}
