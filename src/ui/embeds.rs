use serenity::all::Timestamp;
use serenity::builder::{CreateEmbed, CreateEmbedFooter};
use std::time::Duration;

use crate::player::session::{PlaybackState, QueueView};
use crate::sources::TrackRecord;

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎶 Cadence";

/// Crea un embed para anunciar la pista que empieza a sonar
pub fn now_playing_embed(track: &TrackRecord) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**{}**", track.title))
        .color(colors::SUCCESS_GREEN)
        .field(
            "🎤 Artista",
            track.artist.clone().unwrap_or_else(|| "Desconocido".to_string()),
            true,
        );

    embed = match track.duration {
        Some(duration) => embed.field("⏱️ Duración", format_duration(duration), true),
        None => embed.field("⏱️ Duración", "🔴 En vivo", true),
    };

    embed = embed
        .field("👤 Solicitado por", format!("<@{}>", track.requested_by), true)
        .field("🔗 Fuente", track.platform.as_str(), true);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .url(&track.page_url)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Variante bajo demanda del anuncio, con el estado de pausa visible
pub fn now_playing_status_embed(track: &TrackRecord, state: PlaybackState) -> CreateEmbed {
    let title = match state {
        PlaybackState::Paused => "⏸️ En Pausa",
        _ => "🎵 Reproduciendo Ahora",
    };

    now_playing_embed(track).title(title)
}

/// Embed de la vista paginada de la cola
pub fn queue_embed(view: &QueueView) -> CreateEmbed {
    let mut description = String::new();

    match &view.now_playing {
        Some(track) => {
            let marker = match view.state {
                PlaybackState::Paused => "⏸️",
                _ => "▶️",
            };
            description.push_str(&format!("{marker} **{}**\n\n", track.title));
        }
        None => description.push_str("Nada reproduciéndose.\n\n"),
    }

    if view.page.items.is_empty() {
        description.push_str("La cola está vacía.");
    } else {
        for (offset, track) in view.page.items.iter().enumerate() {
            let duration = track
                .duration
                .map(format_duration)
                .unwrap_or_else(|| "en vivo".to_string());
            description.push_str(&format!(
                "`{}`. **{}** ({duration})\n",
                view.page.first_index + offset,
                track.title,
            ));
        }
    }

    let mut footer = format!(
        "Página {}/{} • {} canciones • {}",
        view.page.current_page,
        view.page.total_pages,
        view.page.total_items,
        format_duration(view.total_duration),
    );
    if view.loop_enabled {
        footer.push_str(" • 🔁 loop");
    }

    CreateEmbed::default()
        .title("📜 Cola de Reproducción")
        .description(description)
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(footer))
}

/// Formato compacto mm:ss, con horas solo cuando hacen falta
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
