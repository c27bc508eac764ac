pub mod backend;
pub mod queue;
pub mod session;

use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::config::Config;
use crate::error::PlayerError;
use crate::sources::TrackRecord;
use crate::storage::OwnershipStore;
use backend::{AudioBackend, Notifier};
use session::{
    Session, SessionCommand, SessionContext, SessionDeps, SessionMessage, SessionReply,
    SessionSender, SessionSettings,
};

/// Clave que delimita todo el estado de una sesión: el canal de voz o, sin
/// contexto de canal, la guild. Una clave ↔ a lo sumo una conexión de voz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey(u64);

impl SessionKey {
    pub fn from_channel(channel: ChannelId) -> Self {
        Self(channel.get())
    }

    pub fn from_guild(guild: GuildId) -> Self {
        Self(guild.get())
    }

    #[allow(dead_code)]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asidero de una sesión: envía cada comando al buzón de su tarea y espera
/// la respuesta. Clonar el asidero no duplica la sesión.
#[derive(Clone)]
pub struct SessionHandle {
    tx: SessionSender,
    pub key: SessionKey,
    pub guild: GuildId,
    pub voice_channel: ChannelId,
}

impl SessionHandle {
    pub(crate) fn new(tx: SessionSender, ctx: SessionContext) -> Self {
        Self {
            tx,
            key: ctx.key,
            guild: ctx.guild,
            voice_channel: ctx.channel,
        }
    }

    async fn request(&self, command: SessionCommand) -> Result<SessionReply, PlayerError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(SessionMessage::Command {
                command,
                reply: reply_tx,
            })
            .map_err(|_| PlayerError::SessionClosed)?;

        reply_rx.await.map_err(|_| PlayerError::SessionClosed)?
    }

    pub async fn enqueue(
        &self,
        tracks: Vec<TrackRecord>,
        user: UserId,
    ) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::Enqueue { tracks, user }).await
    }

    pub async fn skip(&self) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::Skip).await
    }

    pub async fn pause(&self) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::Resume).await
    }

    pub async fn previous(&self) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::Previous).await
    }

    pub async fn stop(&self) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::Stop).await
    }

    pub async fn toggle_loop(&self) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::ToggleLoop).await
    }

    pub async fn clear(&self) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::Clear).await
    }

    pub async fn shuffle(&self) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::Shuffle).await
    }

    pub async fn remove(&self, index: i64) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::Remove { index }).await
    }

    pub async fn queue_view(&self, page: usize) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::QueueView { page }).await
    }

    pub async fn now_playing(&self) -> Result<SessionReply, PlayerError> {
        self.request(SessionCommand::NowPlaying).await
    }
}

/// Registro global clave → sesión. Es la única tabla compartida: la
/// creación perezosa usa la inserción atómica del mapa y cada sesión se
/// retira sola al destruirse.
pub struct PlayerRegistry {
    sessions: Arc<DashMap<SessionKey, SessionHandle>>,
    backend: Arc<dyn AudioBackend>,
    owners: Arc<OwnershipStore>,
    settings: SessionSettings,
}

impl PlayerRegistry {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        owners: Arc<OwnershipStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            backend,
            owners,
            settings,
        }
    }

    pub fn get(&self, key: SessionKey) -> Option<SessionHandle> {
        self.sessions.get(&key).map(|entry| entry.clone())
    }

    /// Creación perezosa: conecta la voz y registra la sesión si no existía.
    /// La conexión debe existir antes del primer `start`.
    pub async fn get_or_create(
        &self,
        ctx: SessionContext,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<SessionHandle> {
        if let Some(handle) = self.get(ctx.key) {
            return Ok(handle);
        }

        self.backend.connect(ctx.key, ctx.guild, ctx.channel).await?;

        let handle = self
            .sessions
            .entry(ctx.key)
            .or_insert_with(|| {
                Session::spawn(
                    ctx,
                    self.settings.clone(),
                    SessionDeps {
                        backend: self.backend.clone(),
                        notifier,
                        owners: self.owners.clone(),
                        sessions: self.sessions.clone(),
                    },
                )
            })
            .clone();

        Ok(handle)
    }

    /// Asideros vivos; usado por el barrido de ocupación
    pub fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            idle_timeout: config.idle_timeout,
            voice_timeout: config.voice_timeout,
            max_queue_size: config.max_queue_size,
            history_capacity: config.history_capacity,
            queue_page_size: config.queue_page_size,
        }
    }
}
