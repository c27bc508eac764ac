use anyhow::Result;
use serenity::all::{ChannelId, Context, GuildId, Message, UserId};
use serenity::builder::{CreateMessage, EditMessage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::error::PlayerError;
use crate::player::backend::ChannelNotifier;
use crate::player::session::{SessionContext, SessionReply};
use crate::player::{SessionHandle, SessionKey};
use crate::ui::embeds;

use super::CadenceBot;

/// Enruta un comando con el prefijo ya recortado
pub async fn dispatch(ctx: &Context, msg: &Message, content: &str, bot: &CadenceBot) -> Result<()> {
    // los comandos solo tienen sentido dentro de un servidor
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let (command, args) = match content.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (content, ""),
    };
    let command = command.to_lowercase();

    // clave de sesión: el canal de voz del autor o, sin contexto, la guild
    let voice_channel = author_voice_channel(ctx, guild_id, msg.author.id);
    let key = voice_channel
        .map(SessionKey::from_channel)
        .unwrap_or_else(|| SessionKey::from_guild(guild_id));

    // clave ajena: otro proceso del clúster responde, aquí silencio
    if !bot.shard.owns(key) {
        return Ok(());
    }

    info!(
        "📝 Comando {} de {} en guild {}",
        command, msg.author.name, guild_id
    );

    match command.as_str() {
        "play" | "p" => play(ctx, msg, args, bot, guild_id, voice_channel, key).await,
        "skip" | "s" => skip(ctx, msg, bot, key).await,
        "pause" => pause(ctx, msg, bot, key).await,
        "resume" => resume(ctx, msg, bot, key).await,
        "previous" | "prev" => previous(ctx, msg, bot, key).await,
        "leave" | "stop" => leave(ctx, msg, bot, key).await,
        "loop" => toggle_loop(ctx, msg, bot, key).await,
        "queue" | "q" => queue(ctx, msg, args, bot, key).await,
        "nowplaying" | "np" => now_playing(ctx, msg, bot, key).await,
        "clear" => clear(ctx, msg, bot, key).await,
        "shuffle" => shuffle(ctx, msg, bot, key).await,
        "remove" | "rm" => remove(ctx, msg, args, bot, key).await,
        "ping" => ping(ctx, msg).await,
        "help" => help(ctx, msg, bot).await,
        _ => reply(ctx, msg, "❌ Comando no reconocido").await,
    }
}

fn author_voice_channel(ctx: &Context, guild_id: GuildId, user: UserId) -> Option<ChannelId> {
    let guild = ctx.cache.guild(guild_id)?;
    guild.voice_states.get(&user).and_then(|state| state.channel_id)
}

async fn reply(ctx: &Context, msg: &Message, text: impl Into<String>) -> Result<()> {
    msg.channel_id.say(&ctx.http, text.into()).await?;
    Ok(())
}

fn session(bot: &CadenceBot, key: SessionKey) -> Result<SessionHandle, PlayerError> {
    bot.registry.get(key).ok_or(PlayerError::SessionClosed)
}

async fn play(
    ctx: &Context,
    msg: &Message,
    args: &str,
    bot: &CadenceBot,
    guild_id: GuildId,
    voice_channel: Option<ChannelId>,
    key: SessionKey,
) -> Result<()> {
    if args.is_empty() {
        return reply(ctx, msg, format!("Uso: {}play <búsqueda o URL>", bot.config.command_prefix)).await;
    }

    let Some(channel) = voice_channel else {
        return reply(ctx, msg, format!("❌ {}", PlayerError::NoVoiceChannel)).await;
    };

    // la resolución corre fuera de la secuencia de la sesión: una búsqueda
    // lenta no bloquea a las demás sesiones
    let tracks = bot.resolver.resolve(args, msg.author.id).await;
    if tracks.is_empty() {
        return reply(ctx, msg, format!("🔍 {}", PlayerError::NoResults)).await;
    }

    let first_title = tracks[0].title.clone();
    let session_ctx = SessionContext {
        key,
        guild: guild_id,
        channel,
    };
    let notifier = Arc::new(ChannelNotifier::new(ctx.http.clone(), msg.channel_id));

    let handle = match bot.registry.get_or_create(session_ctx, notifier).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Error al conectar al canal de voz: {e:?}");
            return reply(ctx, msg, "❌ No pude conectar al canal de voz").await;
        }
    };

    match handle.enqueue(tracks, msg.author.id).await {
        Ok(SessionReply::Enqueued { added, started }) => {
            // si este encolado arrancó la reproducción, el anuncio ya lo
            // publica el notifier de la sesión
            if started.is_some() && added == 1 {
                Ok(())
            } else if added == 1 {
                reply(ctx, msg, format!("➕ Agregado a la cola: **{first_title}**")).await
            } else {
                reply(ctx, msg, format!("➕ {added} canciones agregadas a la cola")).await
            }
        }
        Ok(_) => Ok(()),
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn skip(ctx: &Context, msg: &Message, bot: &CadenceBot, key: SessionKey) -> Result<()> {
    let result = match session(bot, key) {
        Ok(handle) => handle.skip().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(SessionReply::Skipped(track)) => {
            reply(ctx, msg, format!("⏭️ Saltando **{}**", track.title)).await
        }
        Ok(_) => Ok(()),
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn pause(ctx: &Context, msg: &Message, bot: &CadenceBot, key: SessionKey) -> Result<()> {
    let result = match session(bot, key) {
        Ok(handle) => handle.pause().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => reply(ctx, msg, "⏸️ Pausado").await,
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn resume(ctx: &Context, msg: &Message, bot: &CadenceBot, key: SessionKey) -> Result<()> {
    let result = match session(bot, key) {
        Ok(handle) => handle.resume().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => reply(ctx, msg, "▶️ Reanudado").await,
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn previous(ctx: &Context, msg: &Message, bot: &CadenceBot, key: SessionKey) -> Result<()> {
    let result = match session(bot, key) {
        Ok(handle) => handle.previous().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(SessionReply::Previous(track)) => {
            reply(ctx, msg, format!("⏮️ Volviendo a **{}**", track.title)).await
        }
        Ok(_) => Ok(()),
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn leave(ctx: &Context, msg: &Message, bot: &CadenceBot, key: SessionKey) -> Result<()> {
    let result = match session(bot, key) {
        Ok(handle) => handle.stop().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => reply(ctx, msg, "👋 Hasta luego").await,
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn toggle_loop(ctx: &Context, msg: &Message, bot: &CadenceBot, key: SessionKey) -> Result<()> {
    let result = match session(bot, key) {
        Ok(handle) => handle.toggle_loop().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(SessionReply::LoopMode(true)) => reply(ctx, msg, "🔁 Loop activado").await,
        Ok(SessionReply::LoopMode(false)) => reply(ctx, msg, "➡️ Loop desactivado").await,
        Ok(_) => Ok(()),
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn queue(
    ctx: &Context,
    msg: &Message,
    args: &str,
    bot: &CadenceBot,
    key: SessionKey,
) -> Result<()> {
    let page = args.parse::<usize>().unwrap_or(1);

    let result = match session(bot, key) {
        Ok(handle) => handle.queue_view(page).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(SessionReply::Queue(view)) => {
            let message = CreateMessage::new().embed(embeds::queue_embed(&view));
            msg.channel_id.send_message(&ctx.http, message).await?;
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn now_playing(ctx: &Context, msg: &Message, bot: &CadenceBot, key: SessionKey) -> Result<()> {
    let result = match session(bot, key) {
        Ok(handle) => handle.now_playing().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(SessionReply::NowPlaying {
            track: Some(track),
            state,
        }) => {
            let message =
                CreateMessage::new().embed(embeds::now_playing_status_embed(&track, state));
            msg.channel_id.send_message(&ctx.http, message).await?;
            Ok(())
        }
        Ok(_) => reply(ctx, msg, format!("📭 {}", PlayerError::NothingPlaying)).await,
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn clear(ctx: &Context, msg: &Message, bot: &CadenceBot, key: SessionKey) -> Result<()> {
    let result = match session(bot, key) {
        Ok(handle) => handle.clear().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(SessionReply::Cleared(count)) => {
            reply(ctx, msg, format!("🗑️ Cola limpiada ({count} canciones)")).await
        }
        Ok(_) => Ok(()),
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn shuffle(ctx: &Context, msg: &Message, bot: &CadenceBot, key: SessionKey) -> Result<()> {
    let result = match session(bot, key) {
        Ok(handle) => handle.shuffle().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => reply(ctx, msg, "🔀 Cola mezclada").await,
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn remove(
    ctx: &Context,
    msg: &Message,
    args: &str,
    bot: &CadenceBot,
    key: SessionKey,
) -> Result<()> {
    let Ok(index) = args.parse::<i64>() else {
        return reply(ctx, msg, format!("Uso: {}remove <índice>", bot.config.command_prefix)).await;
    };

    let result = match session(bot, key) {
        Ok(handle) => handle.remove(index).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(SessionReply::Removed(track)) => {
            reply(ctx, msg, format!("❌ Eliminada **{}**", track.title)).await
        }
        Ok(_) => Ok(()),
        Err(e) => reply(ctx, msg, format!("❌ {e}")).await,
    }
}

async fn ping(ctx: &Context, msg: &Message) -> Result<()> {
    let started = Instant::now();
    let mut message = msg.channel_id.say(&ctx.http, "🏓 Pong!").await?;
    let latency = started.elapsed();

    message
        .edit(
            &ctx.http,
            EditMessage::new().content(format!("🏓 Pong! `{} ms`", latency.as_millis())),
        )
        .await?;

    Ok(())
}

async fn help(ctx: &Context, msg: &Message, bot: &CadenceBot) -> Result<()> {
    let p = &bot.config.command_prefix;
    let text = format!(
        "**Comandos disponibles**\n\
        `{p}play <búsqueda o URL>` — reproduce o encola una pista\n\
        `{p}skip` — salta la pista actual\n\
        `{p}pause` / `{p}resume` — pausa o reanuda\n\
        `{p}previous` — vuelve a la pista anterior\n\
        `{p}queue [página]` — muestra la cola\n\
        `{p}nowplaying` — muestra la pista actual\n\
        `{p}loop` — repite las pistas terminadas\n\
        `{p}shuffle` — mezcla la cola\n\
        `{p}remove <índice>` — elimina una pista\n\
        `{p}clear` — vacía la cola\n\
        `{p}leave` — desconecta el bot\n\
        `{p}ping` — latencia del bot\n\n\
        Prefijos de plataforma: `yt:`, `sc:`, `sp:`"
    );

    reply(ctx, msg, text).await
}
