use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::UserId;
use std::time::Duration;
use url::Url;

use super::ytdlp::{self, RawEntry};
use super::{MusicSource, Platform, TrackRecord};

/// Cliente de YouTube sobre yt-dlp. Es la plataforma por defecto y la de
/// último recurso del adaptador de resolución.
pub struct YouTubeClient;

impl YouTubeClient {
    pub fn new() -> Self {
        Self
    }

    pub fn is_youtube_url(url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };

        matches!(
            parsed.host_str(),
            Some("www.youtube.com")
                | Some("youtube.com")
                | Some("m.youtube.com")
                | Some("music.youtube.com")
                | Some("youtu.be")
        )
    }

    fn to_record(entry: RawEntry, requested_by: UserId) -> Option<TrackRecord> {
        let RawEntry {
            id,
            title,
            url,
            webpage_url,
            duration,
            uploader,
            channel,
            thumbnail,
            ..
        } = entry;

        // Sin título o sin página no hay pista presentable
        let title = title?;
        let page_url = webpage_url
            .or(url)
            .or_else(|| id.map(|id| format!("https://www.youtube.com/watch?v={id}")))?;

        let mut track = TrackRecord::new(title, page_url, Platform::YouTube, requested_by);

        if let Some(artist) = uploader.or(channel) {
            track = track.with_artist(artist);
        }
        if let Some(secs) = duration.filter(|d| d.is_finite() && *d > 0.0) {
            track = track.with_duration(Duration::from_secs_f64(secs));
        }
        if let Some(thumb) = thumbnail {
            track = track.with_thumbnail(thumb);
        }

        Some(track)
    }
}

#[async_trait]
impl MusicSource for YouTubeClient {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Vec<TrackRecord>> {
        let target = if query.starts_with("http://") || query.starts_with("https://") {
            query.to_string()
        } else {
            format!("ytsearch1:{query}")
        };

        let entries = ytdlp::extract(&target).await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| Self::to_record(entry, requested_by))
            .collect())
    }

    fn is_valid_url(&self, url: &str) -> bool {
        Self::is_youtube_url(url)
    }

    fn source_name(&self) -> &'static str {
        "YouTube"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_youtube_url_detection() {
        assert!(YouTubeClient::is_youtube_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(YouTubeClient::is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(YouTubeClient::is_youtube_url(
            "https://music.youtube.com/watch?v=test"
        ));
        assert!(!YouTubeClient::is_youtube_url("https://example.com/video"));
        assert!(!YouTubeClient::is_youtube_url("texto con youtube.com dentro"));
    }

    #[test]
    fn entries_without_title_are_filtered_out() {
        let entry: RawEntry =
            serde_json::from_str(r#"{"id": "abc", "url": "https://youtu.be/abc"}"#).expect("json");
        assert!(YouTubeClient::to_record(entry, UserId::new(1)).is_none());
    }

    #[test]
    fn flat_search_entries_map_to_records() {
        let entry: RawEntry = serde_json::from_str(
            r#"{
                "id": "dQw4w9WgXcQ",
                "title": "Never Gonna Give You Up",
                "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "duration": 212.0,
                "channel": "Rick Astley",
                "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq720.jpg"
            }"#,
        )
        .expect("json");

        let track = YouTubeClient::to_record(entry, UserId::new(1)).expect("record");
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.artist.as_deref(), Some("Rick Astley"));
        assert_eq!(track.duration, Some(Duration::from_secs(212)));
        assert_eq!(track.platform, Platform::YouTube);
        assert_eq!(track.playable_uri(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn page_url_is_reconstructed_from_the_id() {
        let entry: RawEntry =
            serde_json::from_str(r#"{"id": "abc", "title": "Pista"}"#).expect("json");

        let track = YouTubeClient::to_record(entry, UserId::new(1)).expect("record");
        assert_eq!(track.page_url, "https://www.youtube.com/watch?v=abc");
    }
}
