use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod bot;
mod config;
mod error;
mod player;
mod shard;
mod sources;
mod storage;
mod ui;

use crate::bot::CadenceBot;
use crate::config::Config;
use crate::player::backend::SongbirdBackend;
use crate::player::PlayerRegistry;
use crate::shard::ShardInfo;
use crate::sources::TrackResolver;
use crate::storage::OwnershipStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cadence=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎶 Iniciando Cadence v{}", env!("CARGO_PKG_VERSION"));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    // Almacenamiento de propietarios
    let owners = Arc::new(OwnershipStore::new(config.data_dir.clone()).await?);

    // Reparto del clúster
    let shard = ShardInfo::new(config.cluster_id, config.cluster_count());

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // Registro de sesiones sobre el backend de songbird
    let songbird = Songbird::serenity();
    let backend = Arc::new(SongbirdBackend::new(songbird.clone(), config.default_volume));
    let registry = Arc::new(PlayerRegistry::new(
        backend,
        owners,
        (&config).into(),
    ));
    let resolver = Arc::new(TrackResolver::new());

    let config = Arc::new(config);
    let handler = CadenceBot::new(config.clone(), registry, resolver, shard);

    // Construir cliente
    let mut client = Client::builder(config.token(), intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Error al registrar Ctrl+C");
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        std::process::exit(0);
    });

    // Iniciar bot
    info!("🚀 Clúster {} iniciado", shard.cluster_id());
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    sources::ytdlp::verify().await?;
    println!("OK");
    Ok(())
}
