use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

/// Cliente de Spotify: solo metadatos. Su catálogo no es reproducible
/// directamente, así que el adaptador re-emite lo extraído como búsqueda
/// textual en la plataforma por defecto.
pub struct SpotifyClient {
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    author_name: Option<String>,
}

impl SpotifyClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub fn is_valid_url(&self, url: &str) -> bool {
        Self::resource_ref(url).is_some()
    }

    /// Tipo e identificador del recurso dentro de la URL
    fn resource_ref(url: &str) -> Option<(String, String)> {
        let re = Regex::new(
            r"open\.spotify\.com/(?:intl-[a-z]+/)?(track|album|playlist)/([A-Za-z0-9]+)",
        )
        .ok()?;

        let caps = re.captures(url)?;
        Some((caps[1].to_string(), caps[2].to_string()))
    }

    /// Metadatos mínimos (título, autor) vía el endpoint público de oEmbed,
    /// concatenados como texto de búsqueda.
    pub async fn search_text(&self, url: &str) -> Result<String> {
        let (kind, id) = Self::resource_ref(url)
            .ok_or_else(|| anyhow::anyhow!("URL de Spotify no reconocida: {url}"))?;
        debug!("🎧 Spotify {kind}/{id}: extrayendo metadatos");

        let endpoint = format!(
            "https://open.spotify.com/oembed?url={}",
            urlencoding::encode(url)
        );

        let response: OEmbedResponse = self
            .http
            .get(&endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let title = response
            .title
            .ok_or_else(|| anyhow::anyhow!("oEmbed sin título para {url}"))?;

        Ok(match response.author_name {
            Some(author) => format!("{title} {author}"),
            None => title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn track_urls_are_recognized() {
        let (kind, id) =
            SpotifyClient::resource_ref("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC")
                .expect("ref");
        assert_eq!(kind, "track");
        assert_eq!(id, "4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn regional_urls_are_recognized() {
        let (kind, _) =
            SpotifyClient::resource_ref("https://open.spotify.com/intl-es/album/2up3OPMp9Tb4dAKM2erWXQ")
                .expect("ref");
        assert_eq!(kind, "album");
    }

    #[test]
    fn foreign_urls_are_rejected() {
        assert!(SpotifyClient::resource_ref("https://example.com/track/abc").is_none());
        assert!(SpotifyClient::resource_ref("https://open.spotify.com/artist/xyz").is_none());
    }
}
