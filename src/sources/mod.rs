pub mod soundcloud;
pub mod spotify;
pub mod youtube;
pub mod ytdlp;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::time::Duration;
use tracing::{debug, error, warn};

pub use soundcloud::SoundCloudClient;
pub use spotify::SpotifyClient;
pub use youtube::YouTubeClient;

/// Plataformas de origen soportadas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    SoundCloud,
    Spotify,
}

impl Platform {
    /// Plataforma por defecto y de último recurso
    pub const FALLBACK: Platform = Platform::YouTube;

    /// Normaliza los alias de prefijo explícito ("yt:", "sc:", "sp:")
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.to_ascii_lowercase().as_str() {
            "yt" | "youtube" => Some(Self::YouTube),
            "sc" | "soundcloud" => Some(Self::SoundCloud),
            "sp" | "spotify" => Some(Self::Spotify),
            _ => None,
        }
    }

    /// Detecta la plataforma por dominio dentro de la consulta
    pub fn from_url(query: &str) -> Option<Self> {
        const DOMAINS: &[(&str, Platform)] = &[
            ("youtube.com", Platform::YouTube),
            ("youtu.be", Platform::YouTube),
            ("soundcloud.com", Platform::SoundCloud),
            ("open.spotify.com", Platform::Spotify),
        ];

        DOMAINS
            .iter()
            .find(|(domain, _)| query.contains(domain))
            .map(|(_, platform)| *platform)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::SoundCloud => "SoundCloud",
            Platform::Spotify => "Spotify",
        }
    }
}

/// Pista normalizada. Inmutable una vez resuelta; los campos opcionales
/// quedan en `None` cuando la plataforma no los proporciona.
#[derive(Debug, Clone)]
pub struct TrackRecord {
    pub title: String,
    pub stream_url: Option<String>,
    pub duration: Option<Duration>,
    pub artist: Option<String>,
    pub thumbnail: Option<String>,
    pub platform: Platform,
    pub page_url: String,
    pub requested_by: UserId,
    #[allow(dead_code)]
    pub enqueued_at: DateTime<Utc>,
}

impl TrackRecord {
    pub fn new(title: String, page_url: String, platform: Platform, requested_by: UserId) -> Self {
        Self {
            title,
            stream_url: None,
            duration: None,
            artist: None,
            thumbnail: None,
            platform,
            page_url,
            requested_by,
            enqueued_at: Utc::now(),
        }
    }

    pub fn with_artist(mut self, artist: String) -> Self {
        self.artist = Some(artist);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: String) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    #[allow(dead_code)]
    pub fn with_stream_url(mut self, stream_url: String) -> Self {
        self.stream_url = Some(stream_url);
        self
    }

    /// URI reproducible: el stream directo si se conoce, la URL de la
    /// página en su defecto. Nunca está vacía.
    pub fn playable_uri(&self) -> &str {
        self.stream_url.as_deref().unwrap_or(&self.page_url)
    }
}

/// Trait común para todas las fuentes de música
#[async_trait]
pub trait MusicSource: Send + Sync {
    /// Resuelve una consulta (URL o texto libre) a una lista ordenada de pistas
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Vec<TrackRecord>>;

    /// Verifica si la URL pertenece a esta fuente
    #[allow(dead_code)]
    fn is_valid_url(&self, url: &str) -> bool;

    /// Nombre de la fuente
    #[allow(dead_code)]
    fn source_name(&self) -> &'static str;
}

/// Separa un prefijo explícito de plataforma de la consulta. Sin prefijo,
/// decide por dominio; sin dominio conocido, plataforma por defecto.
fn detect_platform(query: &str) -> (Platform, &str) {
    if let Some((prefix, rest)) = query.split_once(':') {
        if let Some(platform) = Platform::from_alias(prefix.trim()) {
            return (platform, rest.trim());
        }
    }

    (Platform::from_url(query).unwrap_or(Platform::FALLBACK), query)
}

/// Adaptador de resolución: consulta libre → lista ordenada de pistas.
pub struct TrackResolver {
    youtube: YouTubeClient,
    soundcloud: SoundCloudClient,
    spotify: SpotifyClient,
}

impl TrackResolver {
    pub fn new() -> Self {
        Self {
            youtube: YouTubeClient::new(),
            soundcloud: SoundCloudClient::new(),
            spotify: SpotifyClient::new(),
        }
    }

    /// Nunca deja escapar un error: ante cualquier fallo degrada a una
    /// búsqueda en la plataforma de último recurso y devuelve una lista
    /// vacía solo si esa también falla.
    pub async fn resolve(&self, query: &str, requested_by: UserId) -> Vec<TrackRecord> {
        let query = query.trim();
        let (platform, stripped) = detect_platform(query);

        match self.resolve_on(platform, stripped, requested_by).await {
            Ok(tracks) if !tracks.is_empty() => tracks,
            Ok(_) => {
                debug!("🔍 Sin resultados en {}, reintentando", platform.as_str());
                self.last_resort(stripped, requested_by).await
            }
            Err(e) => {
                warn!("⚠️ Resolución falló en {}: {e:?}", platform.as_str());
                self.last_resort(stripped, requested_by).await
            }
        }
    }

    async fn resolve_on(
        &self,
        platform: Platform,
        query: &str,
        requested_by: UserId,
    ) -> Result<Vec<TrackRecord>> {
        match platform {
            Platform::YouTube => self.youtube.resolve(query, requested_by).await,
            Platform::SoundCloud => self.soundcloud.resolve(query, requested_by).await,
            Platform::Spotify => {
                // Catálogo no reproducible: extraer metadatos mínimos y
                // re-emitir como búsqueda textual en la plataforma por defecto
                let text = if self.spotify.is_valid_url(query) {
                    self.spotify.search_text(query).await?
                } else {
                    query.to_string()
                };
                self.youtube.resolve(&text, requested_by).await
            }
        }
    }

    async fn last_resort(&self, query: &str, requested_by: UserId) -> Vec<TrackRecord> {
        match self.youtube.resolve(query, requested_by).await {
            Ok(tracks) => tracks,
            Err(e) => {
                error!("❌ Búsqueda de último recurso falló: {e:?}");
                Vec::new()
            }
        }
    }
}

impl Default for TrackResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn explicit_prefix_wins_over_domain() {
        let (platform, rest) = detect_platform("sc: lofi beats");
        assert_eq!(platform, Platform::SoundCloud);
        assert_eq!(rest, "lofi beats");

        let (platform, rest) = detect_platform("yt:https://soundcloud.com/x/y");
        assert_eq!(platform, Platform::YouTube);
        assert_eq!(rest, "https://soundcloud.com/x/y");
    }

    #[test]
    fn url_scheme_is_not_a_platform_prefix() {
        let (platform, rest) = detect_platform("https://soundcloud.com/artist/track");
        assert_eq!(platform, Platform::SoundCloud);
        assert_eq!(rest, "https://soundcloud.com/artist/track");
    }

    #[test]
    fn plain_text_falls_back_to_default_platform() {
        let (platform, rest) = detect_platform("never gonna give you up");
        assert_eq!(platform, Platform::FALLBACK);
        assert_eq!(rest, "never gonna give you up");
    }

    #[test]
    fn aliases_are_case_insensitive() {
        assert_eq!(Platform::from_alias("YT"), Some(Platform::YouTube));
        assert_eq!(Platform::from_alias("SoundCloud"), Some(Platform::SoundCloud));
        assert_eq!(Platform::from_alias("https"), None);
    }

    #[test]
    fn spotify_domain_is_detected() {
        let (platform, _) = detect_platform("https://open.spotify.com/track/abc123");
        assert_eq!(platform, Platform::Spotify);
    }

    #[test]
    fn playable_uri_prefers_the_direct_stream() {
        let track = TrackRecord::new(
            "test".into(),
            "https://example.com/page".into(),
            Platform::YouTube,
            UserId::new(1),
        );
        assert_eq!(track.playable_uri(), "https://example.com/page");

        let track = track.with_stream_url("https://cdn.example.com/audio.m4a".into());
        assert_eq!(track.playable_uri(), "https://cdn.example.com/audio.m4a");
    }
}
