use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::UserId;
use std::time::Duration;

use super::ytdlp::{self, RawEntry};
use super::{MusicSource, Platform, TrackRecord};

/// Cliente de SoundCloud sobre yt-dlp (`scsearch:`)
pub struct SoundCloudClient;

impl SoundCloudClient {
    pub fn new() -> Self {
        Self
    }

    fn to_record(entry: RawEntry, requested_by: UserId) -> Option<TrackRecord> {
        let RawEntry {
            title,
            url,
            webpage_url,
            duration,
            uploader,
            channel,
            thumbnail,
            ..
        } = entry;

        let title = title?;
        let page_url = webpage_url.or(url)?;

        let mut track = TrackRecord::new(title, page_url, Platform::SoundCloud, requested_by);

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
impl MusicSource for SoundCloudClient {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Vec<TrackRecord>> {
        let target = if query.starts_with("http://") || query.starts_with("https://") {
            query.to_string()
        } else {
            format!("scsearch1:{query}")
        };

        let entries = ytdlp::extract(&target).await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| Self::to_record(entry, requested_by))
            .collect())
    }

    fn is_valid_url(&self, url: &str) -> bool {
        url.contains("soundcloud.com")
    }

    fn source_name(&self) -> &'static str {
        "SoundCloud"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn records_are_tagged_with_their_platform() {
        let entry: RawEntry = serde_json::from_str(
            r#"{
                "title": "Deep House Mix",
                "webpage_url": "https://soundcloud.com/dj/deep-house-mix",
                "uploader": "dj",
                "duration": 3600.0
            }"#,
        )
        .expect("json");

        let track = SoundCloudClient::to_record(entry, UserId::new(2)).expect("record");
        assert_eq!(track.platform, Platform::SoundCloud);
        assert_eq!(track.artist.as_deref(), Some("dj"));
        assert_eq!(track.requested_by, UserId::new(2));
    }
}
