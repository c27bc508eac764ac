use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serenity::builder::CreateMessage;
use serenity::model::id::{ChannelId, GuildId};
use songbird::input::{HttpRequest, Input, YoutubeDl};
use songbird::tracks::TrackHandle;
use songbird::{Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::player::session::{SessionMessage, SessionSender};
use crate::player::SessionKey;
use crate::sources::TrackRecord;
use crate::ui::embeds;

/// Frontera con el reproductor externo.
///
/// Por cada `start` llega exactamente una señal de fin de pista al buzón de
/// la sesión, tanto si la pista termina de forma natural como si `stop` la
/// fuerza. Toda mutación posterior ocurre dentro de la secuencia de la
/// sesión, nunca desde el contexto del reproductor.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// La conexión de voz debe existir antes de cualquier `start`
    async fn connect(&self, key: SessionKey, guild: GuildId, channel: ChannelId) -> Result<()>;

    /// Inicia la reproducción de la pista; el fin se comunica por `events`
    async fn start(&self, key: SessionKey, track: &TrackRecord, events: SessionSender)
        -> Result<()>;

    /// Fuerza el fin de la pista actual (dispara la señal de fin)
    async fn stop(&self, key: SessionKey);

    async fn pause(&self, key: SessionKey);

    async fn resume(&self, key: SessionKey);

    async fn disconnect(&self, key: SessionKey);
}

/// Notificaciones de la sesión hacia su canal de texto
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn now_playing(&self, track: &TrackRecord);
    async fn playback_failed(&self, track: &TrackRecord);
}

/// Reproductor real sobre songbird
pub struct SongbirdBackend {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    calls: DashMap<SessionKey, (GuildId, Arc<Mutex<Call>>)>,
    handles: DashMap<SessionKey, TrackHandle>,
    default_volume: f32,
}

impl SongbirdBackend {
    pub fn new(manager: Arc<Songbird>, default_volume: f32) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            calls: DashMap::new(),
            handles: DashMap::new(),
            default_volume,
        }
    }
}

#[async_trait]
impl AudioBackend for SongbirdBackend {
    async fn connect(&self, key: SessionKey, guild: GuildId, channel: ChannelId) -> Result<()> {
        let call = self
            .manager
            .join(guild, channel)
            .await
            .map_err(|e| anyhow::anyhow!("Error al conectar al canal de voz: {e:?}"))?;

        self.calls.insert(key, (guild, call));
        info!("🔊 Conectado al canal de voz {} (sesión {})", channel, key);
        Ok(())
    }

    async fn start(&self, key: SessionKey, track: &TrackRecord, events: SessionSender)
        -> Result<()> {
        let call = self
            .calls
            .get(&key)
            .map(|entry| entry.value().1.clone())
            .ok_or_else(|| anyhow::anyhow!("No hay conexión de voz para la sesión {key}"))?;

        // Stream directo si la resolución lo conoce; si no, yt-dlp resuelve
        // la URL de página en el momento de reproducir
        let input: Input = match &track.stream_url {
            Some(direct) => Input::from(HttpRequest::new(self.http.clone(), direct.clone())),
            None => Input::from(YoutubeDl::new(self.http.clone(), track.page_url.clone())),
        };

        let handle = {
            let mut call_lock = call.lock().await;
            call_lock.play_input(input)
        };

        let _ = handle.set_volume(self.default_volume);

        handle
            .add_event(Event::Track(TrackEvent::End), TrackEndNotifier { events })
            .map_err(|e| anyhow::anyhow!("Error al registrar el evento de fin: {e}"))?;

        self.handles.insert(key, handle);
        Ok(())
    }

    async fn stop(&self, key: SessionKey) {
        if let Some(handle) = self.handles.get(&key) {
            let _ = handle.stop();
        }
    }

    async fn pause(&self, key: SessionKey) {
        if let Some(handle) = self.handles.get(&key) {
            let _ = handle.pause();
        }
    }

    async fn resume(&self, key: SessionKey) {
        if let Some(handle) = self.handles.get(&key) {
            let _ = handle.play();
        }
    }

    async fn disconnect(&self, key: SessionKey) {
        self.handles.remove(&key);

        if let Some((_, (guild, _))) = self.calls.remove(&key) {
            if let Err(e) = self.manager.remove(guild).await {
                warn!("Error al desconectar de la guild {guild}: {e:?}");
            } else {
                info!("👋 Desconectado del canal de voz (sesión {key})");
            }
        }
    }
}

/// Traduce el evento de fin de songbird al buzón de la sesión
struct TrackEndNotifier {
    events: SessionSender,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let _ = self.events.send(SessionMessage::TrackEnded);
        None
    }
}

/// Publica los anuncios de la sesión en el canal de texto que la creó
pub struct ChannelNotifier {
    http: Arc<serenity::http::Http>,
    channel: ChannelId,
}

impl ChannelNotifier {
    pub fn new(http: Arc<serenity::http::Http>, channel: ChannelId) -> Self {
        Self { http, channel }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn now_playing(&self, track: &TrackRecord) {
        let message = CreateMessage::new().embed(embeds::now_playing_embed(track));

        if let Err(e) = self.channel.send_message(&self.http, message).await {
            warn!("Error enviando anuncio de reproducción: {e:?}");
        }
    }

    async fn playback_failed(&self, track: &TrackRecord) {
        let text = format!("⚠️ No se pudo reproducir **{}**, saltando...", track.title);

        if let Err(e) = self.channel.say(&self.http, text).await {
            warn!("Error enviando aviso de fallo: {e:?}");
        }
    }
}
