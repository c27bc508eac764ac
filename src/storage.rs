use anyhow::Result;
use parking_lot::RwLock;
use serenity::model::id::UserId;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

use crate::player::SessionKey;

/// Almacenamiento persistente de propietarios de sesión.
///
/// Mapea clave de sesión → usuario que inició la reproducción por última
/// vez. El mapa vive en memoria y se respalda en `owners.json` dentro del
/// directorio de datos; se escribe en cada mutación y se recarga al
/// arrancar el proceso.
pub struct OwnershipStore {
    path: PathBuf,
    owners: RwLock<HashMap<u64, u64>>,
}

impl OwnershipStore {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir).await?;

        let path = data_dir.join("owners.json");
        let owners = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(_) => HashMap::new(),
        };

        info!("📁 Propietarios cargados: {} ({})", owners.len(), path.display());

        Ok(Self {
            path,
            owners: RwLock::new(owners),
        })
    }

    /// Propietario registrado, si existe; reservado para autorización futura
    #[allow(dead_code)]
    pub fn get(&self, key: SessionKey) -> Option<UserId> {
        self.owners.read().get(&key.get()).map(|id| UserId::new(*id))
    }

    /// Registra al propietario (el último escritor gana).
    pub async fn set(&self, key: SessionKey, user: UserId) -> Result<()> {
        self.owners.write().insert(key.get(), user.get());
        self.persist().await
    }

    /// Borra al propietario; llamado siempre que la sesión se destruye.
    pub async fn clear(&self, key: SessionKey) -> Result<()> {
        let removed = self.owners.write().remove(&key.get()).is_some();
        if removed {
            self.persist().await?;
        }
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        let snapshot = self.owners.read().clone();
        let content = serde_json::to_string_pretty(&snapshot)?;

        if let Err(e) = fs::write(&self.path, content).await {
            warn!("Error guardando propietarios en {}: {}", self.path.display(), e);
            return Err(e.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn set_get_clear_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = OwnershipStore::new(dir.path().to_path_buf()).await.expect("store");

        let key = SessionKey::from_raw(42);
        assert_eq!(store.get(key), None);

        store.set(key, UserId::new(7)).await.expect("set");
        assert_eq!(store.get(key), Some(UserId::new(7)));

        // último escritor gana
        store.set(key, UserId::new(9)).await.expect("set");
        assert_eq!(store.get(key), Some(UserId::new(9)));

        store.clear(key).await.expect("clear");
        assert_eq!(store.get(key), None);
    }

    #[tokio::test]
    async fn owners_survive_a_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = SessionKey::from_raw(100);

        {
            let store = OwnershipStore::new(dir.path().to_path_buf()).await.expect("store");
            store.set(key, UserId::new(55)).await.expect("set");
        }

        let reloaded = OwnershipStore::new(dir.path().to_path_buf()).await.expect("store");
        assert_eq!(reloaded.get(key), Some(UserId::new(55)));
    }

    #[tokio::test]
    async fn clearing_an_absent_key_is_a_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = OwnershipStore::new(dir.path().to_path_buf()).await.expect("store");

        store.clear(SessionKey::from_raw(1)).await.expect("clear");
        assert_eq!(store.get(SessionKey::from_raw(1)), None);
    }
}
