use crate::player::SessionKey;

/// Reparto de claves de sesión entre los procesos del clúster.
///
/// Cada proceso recibe un índice contiguo `[0, N)` y atiende únicamente las
/// claves con `key mod N == índice`. Los comandos dirigidos a claves ajenas
/// se ignoran en silencio: otro proceso del clúster los responde.
#[derive(Debug, Clone, Copy)]
pub struct ShardInfo {
    cluster_id: u64,
    cluster_count: u64,
}

impl ShardInfo {
    pub fn new(cluster_id: u64, cluster_count: u64) -> Self {
        Self {
            cluster_id,
            cluster_count: cluster_count.max(1),
        }
    }

    pub fn owns(&self, key: SessionKey) -> bool {
        key.get() % self.cluster_count == self.cluster_id
    }

    pub fn cluster_id(&self) -> u64 {
        self.cluster_id
    }

    pub fn cluster_count(&self) -> u64 {
        self.cluster_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keys_are_partitioned_across_the_cluster() {
        let shards: Vec<ShardInfo> = (0..3).map(|i| ShardInfo::new(i, 3)).collect();

        for raw in 0..30u64 {
            let key = SessionKey::from_raw(raw);
            let owners = shards.iter().filter(|s| s.owns(key)).count();
            assert_eq!(owners, 1, "cada clave debe tener exactamente un dueño");
            assert!(shards[(raw % 3) as usize].owns(key));
        }
    }

    #[test]
    fn single_process_cluster_owns_everything() {
        let shard = ShardInfo::new(0, 1);
        assert!(shard.owns(SessionKey::from_raw(0)));
        assert!(shard.owns(SessionKey::from_raw(981273198273)));
    }
}
