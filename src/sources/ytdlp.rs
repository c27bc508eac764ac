use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, error, info};

/// Entrada cruda del JSON de yt-dlp: un vídeo suelto o un contenedor
/// (playlist, resultados de búsqueda) con sub-entradas aplanables.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub webpage_url: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<Option<RawEntry>>>,
}

/// Ejecuta yt-dlp en modo JSON contra una URL o un término `*search:`.
pub async fn extract(target: &str) -> Result<Vec<RawEntry>> {
    debug!("🔧 yt-dlp -J {}", target);

    let output = tokio::process::Command::new("yt-dlp")
        .args([
            "-J",
            "--flat-playlist",
            "--no-warnings",
            "--socket-timeout",
            "30",
            "--retries",
            "3",
        ])
        .arg(target)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("yt-dlp falló: {}", stderr.trim());
    }

    let root: RawEntry = serde_json::from_slice(&output.stdout)?;
    Ok(flatten(root))
}

/// Aplana playlists y conjuntos de resultados a una lista ordenada,
/// descartando las entradas nulas que yt-dlp emite para vídeos borrados.
pub fn flatten(root: RawEntry) -> Vec<RawEntry> {
    match root.entries {
        Some(entries) => entries.into_iter().flatten().collect(),
        None => vec![root],
    }
}

/// Comprueba que yt-dlp esté disponible; usado por el health check.
pub async fn verify() -> Result<()> {
    let output = async_process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await?;

    if output.status.success() {
        let version = String::from_utf8_lossy(&output.stdout);
        info!("✅ yt-dlp versión: {}", version.trim());
        Ok(())
    } else {
        error!("❌ yt-dlp no está instalado o no está en PATH");
        anyhow::bail!("yt-dlp no disponible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn a_single_video_flattens_to_itself() {
        let root: RawEntry = serde_json::from_str(
            r#"{"id": "abc", "title": "Canción", "webpage_url": "https://youtu.be/abc", "duration": 213.0}"#,
        )
        .expect("json");

        let flat = flatten(root);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].title.as_deref(), Some("Canción"));
    }

    #[test]
    fn playlists_flatten_in_order_and_drop_null_entries() {
        let root: RawEntry = serde_json::from_str(
            r#"{
                "_type": "playlist",
                "title": "Mix",
                "entries": [
                    {"id": "a", "title": "Primera", "url": "https://youtu.be/a"},
                    null,
                    {"id": "b", "title": "Segunda", "url": "https://youtu.be/b"}
                ]
            }"#,
        )
        .expect("json");

        let flat = flatten(root);
        let titles: Vec<_> = flat.iter().filter_map(|e| e.title.as_deref()).collect();
        assert_eq!(titles, vec!["Primera", "Segunda"]);
    }
}
