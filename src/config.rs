use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord / clúster
    pub bot_tokens: Vec<String>,
    pub cluster_id: u64,
    pub command_prefix: String,

    // Cola
    pub max_queue_size: usize,
    pub history_capacity: usize,
    pub queue_page_size: usize,

    // Audio
    pub default_volume: f32,

    // Timeouts
    pub idle_timeout: Duration,
    pub voice_timeout: Duration,
    pub sweep_interval: Duration,

    // Paths
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Un token por proceso del clúster, separados por comas
            bot_tokens: std::env::var("BOT_TOKENS")?
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            cluster_id: std::env::var("CLUSTER_ID")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "h.".to_string()),

            // Cola
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            history_capacity: std::env::var("HISTORY_CAPACITY")
                .unwrap_or_else(|_| "25".to_string())
                .parse()?,
            queue_page_size: std::env::var("QUEUE_PAGE_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,

            // Timeouts (segundos)
            idle_timeout: Duration::from_secs(
                std::env::var("IDLE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()?,
            ),
            voice_timeout: Duration::from_secs(
                std::env::var("VOICE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "900".to_string())
                    .parse()?,
            ),
            sweep_interval: Duration::from_secs(
                std::env::var("SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()?,
            ),

            // Paths
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "/app/data".to_string())
                .into(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Token del proceso actual dentro del clúster.
    pub fn token(&self) -> &str {
        &self.bot_tokens[self.cluster_id as usize]
    }

    /// Número de procesos cooperantes (uno por token configurado).
    pub fn cluster_count(&self) -> u64 {
        self.bot_tokens.len() as u64
    }

    /// Validates configuration values for correctness.
    ///
    /// Catches the common deployment mistakes before the gateway connection
    /// is attempted: an out-of-range cluster index would otherwise panic on
    /// token selection, and zero-valued limits disable whole subsystems.
    pub fn validate(&self) -> Result<()> {
        if self.bot_tokens.is_empty() {
            anyhow::bail!("BOT_TOKENS no configurado");
        }

        if self.cluster_id as usize >= self.bot_tokens.len() {
            anyhow::bail!(
                "CLUSTER_ID fuera de rango: {} (hay {} tokens)",
                self.cluster_id,
                self.bot_tokens.len()
            );
        }

        if self.command_prefix.is_empty() {
            anyhow::bail!("COMMAND_PREFIX no puede estar vacío");
        }

        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!(
                "DEFAULT_VOLUME debe estar entre 0.0 y 2.0, recibido: {}",
                self.default_volume
            );
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("MAX_QUEUE_SIZE debe ser mayor que 0");
        }

        if self.history_capacity == 0 {
            anyhow::bail!("HISTORY_CAPACITY debe ser mayor que 0");
        }

        if self.queue_page_size == 0 {
            anyhow::bail!("QUEUE_PAGE_SIZE debe ser mayor que 0");
        }

        if self.idle_timeout.is_zero() || self.voice_timeout.is_zero() {
            anyhow::bail!("Los timeouts deben ser mayores que 0");
        }

        Ok(())
    }

    /// Resumen apto para logs: nunca incluye los tokens.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Clúster: {}/{} (prefijo '{}')\n  \
            Cola: {} máx, {} historial, {} por página\n  \
            Timeouts: idle {}, voz {}, barrido {}\n  \
            Datos: {}",
            self.cluster_id,
            self.cluster_count(),
            self.command_prefix,
            self.max_queue_size,
            self.history_capacity,
            self.queue_page_size,
            humantime::format_duration(self.idle_timeout),
            humantime::format_duration(self.voice_timeout),
            humantime::format_duration(self.sweep_interval),
            self.data_dir.display(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_tokens: Vec::new(),
            cluster_id: 0,
            command_prefix: "h.".to_string(),
            max_queue_size: 1000,
            history_capacity: 25,
            queue_page_size: 10,
            default_volume: 0.5,
            idle_timeout: Duration::from_secs(60),
            voice_timeout: Duration::from_secs(900),
            sweep_interval: Duration::from_secs(60),
            data_dir: "/app/data".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_config() -> Config {
        Config {
            bot_tokens: vec!["token-a".into(), "token-b".into()],
            cluster_id: 1,
            ..Config::default()
        }
    }

    #[test]
    fn validate_accepts_a_sane_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_tokens() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn validate_rejects_cluster_id_out_of_range() {
        let mut config = valid_config();
        config.cluster_id = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn token_selects_by_cluster_id() {
        let config = valid_config();
        assert_eq!(config.token(), "token-b");
        assert_eq!(config.cluster_count(), 2);
    }
}
