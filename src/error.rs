use thiserror::Error;

/// Errores reportables al usuario. Ninguno es fatal para el proceso: la
/// operación se aborta y el estado de la sesión queda intacto.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("Debes estar en un canal de voz para usar este comando")]
    NoVoiceChannel,

    #[error("Índice inválido: {index} (la cola tiene {len} canciones)")]
    InvalidIndex { index: i64, len: usize },

    #[error("El historial está vacío")]
    EmptyHistory,

    #[error("Se necesitan al menos 2 canciones en la cola para mezclar")]
    InsufficientTracks,

    #[error("No hay nada reproduciéndose")]
    NothingPlaying,

    #[error("La reproducción ya está pausada")]
    AlreadyPaused,

    #[error("La reproducción no está pausada")]
    NotPaused,

    #[error("La cola está llena (máximo {max} canciones)")]
    QueueFull { max: usize },

    #[error("No se encontraron resultados")]
    NoResults,

    #[error("No hay una sesión activa en este canal")]
    SessionClosed,
}
