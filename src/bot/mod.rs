//! # Bot Module
//!
//! Discord-facing surface of Cadence.
//!
//! [`CadenceBot`] implements Serenity's [`EventHandler`] and translates
//! prefix commands into operations on the per-channel playback sessions.
//! Each cluster process answers only for the session keys its shard owns;
//! everything else is ignored silently so a sibling process can respond.
//!
//! Besides command routing this module hosts the occupancy sweep (immediate
//! eviction of sessions whose voice channel emptied down to the bot) and the
//! cleanup path for the bot being kicked from a channel.

pub mod handlers;

use serenity::all::{Context, EventHandler, Message, Ready, VoiceState};
use serenity::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::player::{PlayerRegistry, SessionKey};
use crate::shard::ShardInfo;
use crate::sources::TrackResolver;

pub struct CadenceBot {
    pub config: Arc<Config>,
    pub registry: Arc<PlayerRegistry>,
    pub resolver: Arc<TrackResolver>,
    pub shard: ShardInfo,
}

impl CadenceBot {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<PlayerRegistry>,
        resolver: Arc<TrackResolver>,
        shard: ShardInfo,
    ) -> Self {
        Self {
            config,
            registry,
            resolver,
            shard,
        }
    }
}

#[async_trait]
impl EventHandler for CadenceBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "🤖 {} está en línea (clúster {}/{})",
            ready.user.name,
            self.shard.cluster_id(),
            self.shard.cluster_count()
        );
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        // barrido de ocupación en segundo plano
        let registry = self.registry.clone();
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            occupancy_sweep(ctx, registry, interval).await;
        });
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(content) = msg.content.strip_prefix(self.config.command_prefix.as_str()) else {
            return;
        };
        let content = content.trim();
        if content.is_empty() {
            return;
        }

        if let Err(e) = handlers::dispatch(&ctx, &msg, content, self).await {
            error!("Error manejando comando: {e:?}");
        }
    }

    /// Limpieza cuando el bot es expulsado o movido fuera de un canal de voz
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let bot_id = ctx.cache.current_user().id;
        if new.user_id != bot_id || new.channel_id.is_some() {
            return;
        }

        let Some(old_channel) = old.and_then(|state| state.channel_id) else {
            return;
        };

        let key = SessionKey::from_channel(old_channel);
        if let Some(handle) = self.registry.get(key) {
            info!("🔌 Bot desconectado del canal {}, limpiando sesión", old_channel);
            let _ = handle.stop().await;
        }
    }
}

/// Barrido periódico: desconexión inmediata de toda sesión cuyo canal de voz
/// quedó solo con el bot, independientemente de los temporizadores.
async fn occupancy_sweep(ctx: Context, registry: Arc<PlayerRegistry>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // el primer tick es inmediato

    loop {
        ticker.tick().await;
        debug!("🧹 Barrido de ocupación: {} sesiones activas", registry.len());

        let mut abandoned = Vec::new();
        for handle in registry.handles() {
            let alone = {
                let Some(guild) = ctx.cache.guild(handle.guild) else {
                    continue;
                };
                let occupants = guild
                    .voice_states
                    .values()
                    .filter(|state| state.channel_id == Some(handle.voice_channel))
                    .count();
                occupants <= 1
            };

            if alone {
                info!(
                    "🚪 Canal {} vacío, desconectando sesión {}",
                    handle.voice_channel, handle.key
                );
                abandoned.push(handle);
            }
        }

        futures::future::join_all(abandoned.iter().map(|handle| handle.stop())).await;
    }
}
