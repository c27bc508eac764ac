use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::PlayerError;
use crate::sources::TrackRecord;

/// Cola de reproducción de una sesión: pendientes en orden FIFO más un
/// historial acotado de pistas ya reproducidas.
#[derive(Debug)]
pub struct TrackQueue {
    pending: VecDeque<TrackRecord>,
    history: VecDeque<TrackRecord>,
    max_size: usize,
    history_capacity: usize,
}

impl TrackQueue {
    pub fn new(max_size: usize, history_capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            history: VecDeque::new(),
            max_size,
            history_capacity,
        }
    }

    /// Añade pistas al final; devuelve cuántas entraron (respeta el máximo)
    pub fn enqueue(&mut self, tracks: Vec<TrackRecord>) -> usize {
        let available = self.max_size.saturating_sub(self.pending.len());
        let added = tracks.len().min(available);

        for track in tracks.into_iter().take(added) {
            info!("➕ Agregado a la cola: {}", track.title);
            self.pending.push_back(track);
        }

        added
    }

    /// Extrae la cabeza de la cola (estricto FIFO)
    pub fn pop_next(&mut self) -> Option<TrackRecord> {
        let next = self.pending.pop_front();
        if let Some(ref track) = next {
            debug!("➡️ Siguiente en cola: {}", track.title);
        }
        next
    }

    /// Inserta en la cabeza (usado por "previous")
    pub fn push_front(&mut self, track: TrackRecord) {
        self.pending.push_front(track);
    }

    /// Re-inserta al final (usado por el modo loop)
    pub fn push_back(&mut self, track: TrackRecord) {
        info!("🔁 Pista re-encolada por loop: {}", track.title);
        self.pending.push_back(track);
    }

    /// Vacía las pendientes sin tocar nada más; devuelve cuántas había
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        info!("🗑️ Cola limpiada ({} canciones)", dropped);
        dropped
    }

    /// Vacía pendientes e historial; usado al destruir la sesión
    pub fn reset(&mut self) {
        self.pending.clear();
        self.history.clear();
    }

    /// Elimina la pista en la posición dada (índice 1-based).
    /// La cola queda intacta si el índice está fuera de `[1, len]`.
    pub fn remove_at(&mut self, index: i64) -> Result<TrackRecord, PlayerError> {
        let len = self.pending.len();

        if index <= 0 || index as usize > len {
            return Err(PlayerError::InvalidIndex { index, len });
        }

        // el índice validado siempre existe
        let removed = self
            .pending
            .remove(index as usize - 1)
            .ok_or(PlayerError::InvalidIndex { index, len })?;

        debug!("❌ Pista eliminada en posición {}: {}", index, removed.title);
        Ok(removed)
    }

    /// Mezcla las pendientes en el sitio; requiere al menos 2
    pub fn shuffle(&mut self) -> Result<(), PlayerError> {
        if self.pending.len() < 2 {
            return Err(PlayerError::InsufficientTracks);
        }

        let mut items: Vec<_> = self.pending.drain(..).collect();
        items.shuffle(&mut rand::thread_rng());
        self.pending.extend(items);

        info!("🔀 Cola mezclada");
        Ok(())
    }

    /// Archiva una pista terminada; el historial expulsa la más antigua
    /// al superar su capacidad fija
    pub fn history_push(&mut self, track: TrackRecord) {
        self.history.push_back(track);

        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }

    /// Extrae la entrada más reciente del historial
    pub fn history_pop_last(&mut self) -> Result<TrackRecord, PlayerError> {
        self.history.pop_back().ok_or(PlayerError::EmptyHistory)
    }

    pub fn history_snapshot(&self) -> Vec<TrackRecord> {
        self.history.iter().cloned().collect()
    }

    /// Duración total de las pendientes (las pistas en vivo no suman)
    pub fn total_duration(&self) -> Duration {
        self.pending.iter().filter_map(|t| t.duration).sum()
    }

    /// Página de la cola para la vista paginada
    pub fn page(&self, page: usize, per_page: usize) -> QueuePage {
        let safe_page = page.max(1);
        let start = (safe_page - 1) * per_page;
        let end = (start + per_page).min(self.pending.len());
        let total_pages = if self.pending.is_empty() {
            1
        } else {
            self.pending.len().div_ceil(per_page)
        };

        QueuePage {
            items: if start < self.pending.len() {
                self.pending.range(start..end).cloned().collect()
            } else {
                Vec::new()
            },
            first_index: start + 1,
            current_page: safe_page,
            total_pages,
            total_items: self.pending.len(),
        }
    }
}

/// Una página de la vista de cola; los índices mostrados son 1-based
#[derive(Debug, Clone)]
pub struct QueuePage {
    pub items: Vec<TrackRecord>,
    pub first_index: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Platform;
    use pretty_assertions::assert_eq;
    use serenity::model::id::UserId;
    use std::collections::HashSet;

    fn track(title: &str) -> TrackRecord {
        TrackRecord::new(
            title.to_string(),
            format!("https://example.com/{title}"),
            Platform::YouTube,
            UserId::new(1),
        )
    }

    fn titles(queue: &TrackQueue) -> Vec<String> {
        queue.page(1, 100).items.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn dequeue_order_is_strictly_fifo() {
        let mut queue = TrackQueue::new(100, 10);
        queue.enqueue(vec![track("a"), track("b"), track("c")]);

        assert_eq!(queue.pop_next().map(|t| t.title), Some("a".to_string()));
        assert_eq!(queue.pop_next().map(|t| t.title), Some("b".to_string()));
        assert_eq!(queue.pop_next().map(|t| t.title), Some("c".to_string()));
        assert_eq!(queue.pop_next().map(|t| t.title), None);
    }

    #[test]
    fn enqueue_respects_the_maximum_size() {
        let mut queue = TrackQueue::new(2, 10);
        let added = queue.enqueue(vec![track("a"), track("b"), track("c")]);

        assert_eq!(added, 2);
        assert_eq!(titles(&queue), vec!["a", "b"]);
    }

    #[test]
    fn remove_at_is_one_based_and_bounds_checked() {
        let mut queue = TrackQueue::new(100, 10);
        queue.enqueue(vec![track("a"), track("b"), track("c")]);

        assert_eq!(
            queue.remove_at(0).map(|t| t.title),
            Err(PlayerError::InvalidIndex { index: 0, len: 3 })
        );
        assert_eq!(
            queue.remove_at(-3).map(|t| t.title),
            Err(PlayerError::InvalidIndex { index: -3, len: 3 })
        );
        assert_eq!(
            queue.remove_at(4).map(|t| t.title),
            Err(PlayerError::InvalidIndex { index: 4, len: 3 })
        );
        // los fallos no tocan la cola
        assert_eq!(titles(&queue), vec!["a", "b", "c"]);

        let removed = queue.remove_at(2).expect("remove");
        assert_eq!(removed.title, "b");
        assert_eq!(titles(&queue), vec!["a", "c"]);
    }

    #[test]
    fn shuffle_requires_at_least_two_tracks() {
        let mut queue = TrackQueue::new(100, 10);
        assert_eq!(queue.shuffle(), Err(PlayerError::InsufficientTracks));

        queue.enqueue(vec![track("a")]);
        assert_eq!(queue.shuffle(), Err(PlayerError::InsufficientTracks));
        assert_eq!(titles(&queue), vec!["a"]);
    }

    #[test]
    fn shuffle_preserves_the_multiset() {
        let mut queue = TrackQueue::new(100, 10);
        let originals: Vec<String> = (0..20).map(|i| format!("pista-{i}")).collect();
        queue.enqueue(originals.iter().map(|t| track(t)).collect());

        queue.shuffle().expect("shuffle");

        let shuffled = titles(&queue);
        assert_eq!(shuffled.len(), originals.len());
        assert_eq!(
            shuffled.iter().collect::<HashSet<_>>(),
            originals.iter().collect::<HashSet<_>>()
        );
    }

    #[test]
    fn history_is_bounded_and_evicts_the_oldest_first() {
        let capacity = 5;
        let mut queue = TrackQueue::new(100, capacity);

        for i in 0..capacity + 5 {
            queue.history_push(track(&format!("pista-{i}")));
        }

        let history: Vec<String> = queue.history_snapshot().iter().map(|t| t.title.clone()).collect();
        let expected: Vec<String> = (5..10).map(|i| format!("pista-{i}")).collect();
        assert_eq!(history, expected);
    }

    #[test]
    fn history_pop_last_returns_the_most_recent_entry() {
        let mut queue = TrackQueue::new(100, 10);
        assert_eq!(
            queue.history_pop_last().map(|t| t.title),
            Err(PlayerError::EmptyHistory)
        );

        queue.history_push(track("vieja"));
        queue.history_push(track("reciente"));

        assert_eq!(
            queue.history_pop_last().map(|t| t.title),
            Ok("reciente".to_string())
        );
        assert_eq!(
            queue.history_pop_last().map(|t| t.title),
            Ok("vieja".to_string())
        );
        assert_eq!(
            queue.history_pop_last().map(|t| t.title),
            Err(PlayerError::EmptyHistory)
        );
    }

    #[test]
    fn paging_splits_the_queue_in_fixed_pages() {
        let mut queue = TrackQueue::new(100, 10);
        queue.enqueue((0..23).map(|i| track(&format!("pista-{i}"))).collect());

        let first = queue.page(1, 10);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_items, 23);

        let last = queue.page(3, 10);
        assert_eq!(last.items.len(), 3);
        assert_eq!(last.items[0].title, "pista-20");
        assert_eq!(last.first_index, 21);

        let beyond = queue.page(9, 10);
        assert!(beyond.items.is_empty());
    }
}
