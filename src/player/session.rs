use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::error::PlayerError;
use crate::player::backend::{AudioBackend, Notifier};
use crate::player::queue::{QueuePage, TrackQueue};
use crate::player::{SessionHandle, SessionKey};
use crate::sources::TrackRecord;
use crate::storage::OwnershipStore;

pub type SessionSender = mpsc::UnboundedSender<SessionMessage>;

/// Estado de reproducción de una sesión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Clases de temporizador; a lo sumo uno vivo por clase y sesión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerClass {
    /// Corto: se arma cuando la sesión deja de progresar (cola vacía o pausa)
    PlaybackIdle,
    /// Largo: vigila sesiones abandonadas sin actividad de encolado
    VoiceActivity,
}

/// Mensajes del buzón de la sesión. Toda mutación del estado pasa por aquí:
/// los comandos entrantes, la señal asíncrona de fin de pista y los disparos
/// de temporizador comparten una única secuencia lógica.
pub enum SessionMessage {
    Command {
        command: SessionCommand,
        reply: oneshot::Sender<Result<SessionReply, PlayerError>>,
    },
    /// Fin de pista (natural, forzado o sintetizado tras un fallo de arranque)
    TrackEnded,
    TimerFired {
        class: TimerClass,
        generation: u64,
    },
}

#[derive(Debug)]
pub enum SessionCommand {
    Enqueue { tracks: Vec<TrackRecord>, user: UserId },
    Skip,
    Pause,
    Resume,
    Previous,
    Stop,
    ToggleLoop,
    Clear,
    Shuffle,
    Remove { index: i64 },
    QueueView { page: usize },
    NowPlaying,
}

#[derive(Debug)]
pub enum SessionReply {
    Enqueued {
        added: usize,
        /// Pista que este encolado puso a sonar, si la sesión estaba parada
        started: Option<TrackRecord>,
    },
    Skipped(TrackRecord),
    Paused,
    Resumed,
    Previous(TrackRecord),
    Stopped,
    LoopMode(bool),
    Cleared(usize),
    Shuffled,
    Removed(TrackRecord),
    Queue(QueueView),
    NowPlaying {
        track: Option<TrackRecord>,
        state: PlaybackState,
    },
}

/// Instantánea de la cola para la vista paginada
#[derive(Debug)]
pub struct QueueView {
    pub now_playing: Option<TrackRecord>,
    pub state: PlaybackState,
    pub page: QueuePage,
    pub history: Vec<TrackRecord>,
    pub loop_enabled: bool,
    pub owner: Option<UserId>,
    pub total_duration: Duration,
}

/// Identidad de la sesión: clave, guild y canal de voz conectado
#[derive(Debug, Clone, Copy)]
pub struct SessionContext {
    pub key: SessionKey,
    pub guild: GuildId,
    pub channel: ChannelId,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub voice_timeout: Duration,
    pub max_queue_size: usize,
    pub history_capacity: usize,
    pub queue_page_size: usize,
}

/// Colaboradores externos de la sesión
pub(crate) struct SessionDeps {
    pub backend: Arc<dyn AudioBackend>,
    pub notifier: Arc<dyn Notifier>,
    pub owners: Arc<OwnershipStore>,
    pub sessions: Arc<DashMap<SessionKey, SessionHandle>>,
}

/// Máquina de estados de reproducción de una sesión de voz.
///
/// Vive en su propia tarea y es dueña única de su estado: cola, historial,
/// pista actual, propietario y temporizadores. El avance por la cola lo
/// dirige exclusivamente la señal de fin de pista.
pub(crate) struct Session {
    ctx: SessionContext,
    settings: SessionSettings,
    queue: TrackQueue,
    now_playing: Option<TrackRecord>,
    state: PlaybackState,
    loop_enabled: bool,
    owner: Option<UserId>,
    last_activity: Instant,
    idle_generation: u64,
    voice_generation: u64,
    backend: Arc<dyn AudioBackend>,
    notifier: Arc<dyn Notifier>,
    owners: Arc<OwnershipStore>,
    sessions: Arc<DashMap<SessionKey, SessionHandle>>,
    tx: SessionSender,
}

impl Session {
    /// Crea la sesión y arranca su tarea; devuelve el asidero de comandos
    pub(crate) fn spawn(
        ctx: SessionContext,
        settings: SessionSettings,
        deps: SessionDeps,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(tx.clone(), ctx);

        let session = Session {
            queue: TrackQueue::new(settings.max_queue_size, settings.history_capacity),
            now_playing: None,
            state: PlaybackState::Idle,
            loop_enabled: false,
            owner: None,
            last_activity: Instant::now(),
            idle_generation: 0,
            voice_generation: 0,
            backend: deps.backend,
            notifier: deps.notifier,
            owners: deps.owners,
            sessions: deps.sessions,
            ctx,
            settings,
            tx,
        };

        tokio::spawn(session.run(rx));
        handle
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionMessage>) {
        info!("🎧 Sesión creada para {}", self.ctx.key);

        while let Some(message) = rx.recv().await {
            if self.handle(message).await {
                break;
            }
        }

        debug!("Tarea de sesión {} finalizada", self.ctx.key);
    }

    /// Procesa un mensaje; `true` significa que la sesión fue destruida
    async fn handle(&mut self, message: SessionMessage) -> bool {
        match message {
            SessionMessage::Command { command, reply } => match command {
                SessionCommand::Stop => {
                    let _ = reply.send(Ok(SessionReply::Stopped));
                    self.teardown("comando stop/leave").await;
                    true
                }
                other => {
                    let result = self.apply(other).await;
                    let _ = reply.send(result);
                    false
                }
            },
            SessionMessage::TrackEnded => {
                self.advance().await;
                false
            }
            SessionMessage::TimerFired { class, generation } => {
                self.on_timer(class, generation).await
            }
        }
    }

    async fn apply(&mut self, command: SessionCommand) -> Result<SessionReply, PlayerError> {
        match command {
            SessionCommand::Enqueue { tracks, user } => self.enqueue(tracks, user).await,

            SessionCommand::Skip => {
                let skipped = self.now_playing.clone().ok_or(PlayerError::NothingPlaying)?;
                // el stop forzado dispara la señal de fin, que avanza la cola
                self.backend.stop(self.ctx.key).await;
                Ok(SessionReply::Skipped(skipped))
            }

            SessionCommand::Pause => match self.state {
                PlaybackState::Playing => {
                    self.backend.pause(self.ctx.key).await;
                    self.state = PlaybackState::Paused;
                    // una pista pausada no progresa: cuenta como inactividad
                    self.arm_idle_timer();
                    info!("⏸️ Reproducción pausada en {}", self.ctx.key);
                    Ok(SessionReply::Paused)
                }
                PlaybackState::Paused => Err(PlayerError::AlreadyPaused),
                PlaybackState::Idle => Err(PlayerError::NothingPlaying),
            },

            SessionCommand::Resume => match self.state {
                PlaybackState::Paused => {
                    self.cancel_idle_timer();
                    self.backend.resume(self.ctx.key).await;
                    self.state = PlaybackState::Playing;
                    info!("▶️ Reproducción reanudada en {}", self.ctx.key);
                    Ok(SessionReply::Resumed)
                }
                _ => Err(PlayerError::NotPaused),
            },

            SessionCommand::Previous => {
                let track = self.queue.history_pop_last()?;
                self.queue.push_front(track.clone());

                if self.now_playing.is_some() {
                    // el fin forzado de la pista actual la recoge de la cabeza
                    self.backend.stop(self.ctx.key).await;
                } else {
                    self.advance().await;
                }

                Ok(SessionReply::Previous(track))
            }

            SessionCommand::ToggleLoop => {
                self.loop_enabled = !self.loop_enabled;
                info!(
                    "🔁 Loop {} en {}",
                    if self.loop_enabled { "activado" } else { "desactivado" },
                    self.ctx.key
                );
                Ok(SessionReply::LoopMode(self.loop_enabled))
            }

            SessionCommand::Clear => Ok(SessionReply::Cleared(self.queue.clear())),

            SessionCommand::Shuffle => {
                self.queue.shuffle()?;
                Ok(SessionReply::Shuffled)
            }

            SessionCommand::Remove { index } => {
                Ok(SessionReply::Removed(self.queue.remove_at(index)?))
            }

            SessionCommand::QueueView { page } => Ok(SessionReply::Queue(QueueView {
                now_playing: self.now_playing.clone(),
                state: self.state,
                page: self.queue.page(page, self.settings.queue_page_size),
                history: self.queue.history_snapshot(),
                loop_enabled: self.loop_enabled,
                owner: self.owner,
                total_duration: self.queue.total_duration(),
            })),

            SessionCommand::NowPlaying => Ok(SessionReply::NowPlaying {
                track: self.now_playing.clone(),
                state: self.state,
            }),

            SessionCommand::Stop => Ok(SessionReply::Stopped),
        }
    }

    async fn enqueue(
        &mut self,
        tracks: Vec<TrackRecord>,
        user: UserId,
    ) -> Result<SessionReply, PlayerError> {
        if tracks.is_empty() {
            return Err(PlayerError::NoResults);
        }

        let added = self.queue.enqueue(tracks);
        if added == 0 {
            return Err(PlayerError::QueueFull {
                max: self.settings.max_queue_size,
            });
        }

        // propietario: el último que dispara reproducción gana
        self.owner = Some(user);
        if let Err(e) = self.owners.set(self.ctx.key, user).await {
            warn!("Error registrando propietario de {}: {e:?}", self.ctx.key);
        }

        self.touch_activity();

        let started = if self.state == PlaybackState::Idle && self.now_playing.is_none() {
            self.advance().await;
            self.now_playing.clone()
        } else {
            None
        };

        Ok(SessionReply::Enqueued { added, started })
    }

    /// Avanza al siguiente elemento de la cola. Es el único punto que decide
    /// la próxima pista; lo invocan la señal de fin de pista y el primer
    /// encolado sobre una sesión parada.
    async fn advance(&mut self) {
        // con loop activo, la pista que acaba vuelve al final de la cola
        if self.loop_enabled {
            if let Some(finished) = self.now_playing.clone() {
                self.queue.push_back(finished);
            }
        }

        if let Some(finished) = self.now_playing.take() {
            self.queue.history_push(finished);
        }

        let Some(next) = self.queue.pop_next() else {
            // cola agotada: la sesión descansa y el temporizador de
            // inactividad decide su destino; sin rearme del de actividad
            self.state = PlaybackState::Idle;
            self.arm_idle_timer();
            return;
        };

        self.cancel_idle_timer();
        self.touch_activity();
        self.now_playing = Some(next.clone());
        self.state = PlaybackState::Playing;

        match self
            .backend
            .start(self.ctx.key, &next, self.tx.clone())
            .await
        {
            Ok(()) => {
                info!("🎵 Reproduciendo en {}: {}", self.ctx.key, next.title);
                self.notifier.now_playing(&next).await;
            }
            Err(e) => {
                error!("❌ Error al iniciar {} en {}: {e:?}", next.title, self.ctx.key);
                self.notifier.playback_failed(&next).await;

                // fin sintetizado para que la cola no se atasque; la pista
                // rota se archiva sin re-encolar aunque el loop esté activo
                if let Some(failed) = self.now_playing.take() {
                    self.queue.history_push(failed);
                }
                let _ = self.tx.send(SessionMessage::TrackEnded);
            }
        }
    }

    /// `true` si el disparo destruyó la sesión
    async fn on_timer(&mut self, class: TimerClass, generation: u64) -> bool {
        match class {
            TimerClass::PlaybackIdle => {
                if generation != self.idle_generation {
                    return false; // temporizador reemplazado o cancelado
                }
                // revalidación en el momento del disparo, no del armado
                if self.state == PlaybackState::Playing {
                    return false;
                }

                info!("⏲️ Sesión {} inactiva, desconectando", self.ctx.key);
                self.teardown("timeout de inactividad").await;
                true
            }
            TimerClass::VoiceActivity => {
                if generation != self.voice_generation {
                    return false;
                }
                // guarda contra carreras con el rearme
                if self.last_activity.elapsed() < self.settings.voice_timeout {
                    return false;
                }

                info!("⏲️ Sesión {} sin actividad de voz, desconectando", self.ctx.key);
                self.teardown("timeout de actividad de voz").await;
                true
            }
        }
    }

    fn touch_activity(&mut self) {
        self.last_activity = Instant::now();
        self.arm_voice_timer();
    }

    /// Armar cancela y reemplaza: solo la generación vigente actúa al dispararse
    fn arm_idle_timer(&mut self) {
        self.idle_generation += 1;
        spawn_timer(
            self.tx.clone(),
            TimerClass::PlaybackIdle,
            self.idle_generation,
            self.settings.idle_timeout,
        );
    }

    fn cancel_idle_timer(&mut self) {
        // sin tarea que abortar: el disparo obsoleto se descarta por generación
        self.idle_generation += 1;
    }

    fn arm_voice_timer(&mut self) {
        self.voice_generation += 1;
        spawn_timer(
            self.tx.clone(),
            TimerClass::VoiceActivity,
            self.voice_generation,
            self.settings.voice_timeout,
        );
    }

    fn cancel_voice_timer(&mut self) {
        self.voice_generation += 1;
    }

    /// Desmonta la sesión por completo: estado, propietario, conexión de voz
    /// y entrada del registro. Tras esto la tarea termina.
    async fn teardown(&mut self, reason: &str) {
        info!("🚪 Destruyendo sesión {}: {}", self.ctx.key, reason);

        self.cancel_idle_timer();
        self.cancel_voice_timer();
        self.queue.reset();
        self.now_playing = None;
        self.state = PlaybackState::Idle;
        self.loop_enabled = false;
        self.owner = None;

        self.backend.stop(self.ctx.key).await;
        self.backend.disconnect(self.ctx.key).await;

        if let Err(e) = self.owners.clear(self.ctx.key).await {
            warn!("Error limpiando propietario de {}: {e:?}", self.ctx.key);
        }

        self.sessions.remove(&self.ctx.key);
    }
}

fn spawn_timer(tx: SessionSender, class: TimerClass, generation: u64, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(SessionMessage::TimerFired { class, generation });
    });
}
