use std::collections::VecDeque;
use tracing::{debug, info};

use super::outcome::QueueListing;
use crate::sources::TrackRef;

/// Cola FIFO de una guild más la pista actual.
#[derive(Debug)]
pub struct MusicQueue {
    items: VecDeque<TrackRef>,
    current: Option<TrackRef>,
    max_size: usize,
}

impl MusicQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            current: None,
            max_size,
        }
    }

    /// Agrega varias pistas en orden; devuelve cuántas entraron.
    pub fn add_tracks(&mut self, tracks: Vec<TrackRef>) -> usize {
        let available = self.max_size.saturating_sub(self.items.len());
        let to_add = tracks.len().min(available);

        self.items.extend(tracks.into_iter().take(to_add));

        info!("➕ Agregadas {} canciones a la cola", to_add);
        to_add
    }

    /// Saca el siguiente track (FIFO) y lo marca como actual
    pub fn next_track(&mut self) -> Option<TrackRef> {
        let next = self.items.pop_front();

        match &next {
            Some(track) => debug!("➡️ Siguiente en cola (FIFO): {}", track.title()),
            None => debug!("📭 Cola vacía, no hay siguiente track"),
        }

        self.current = next.clone();
        next
    }

    /// La pista actual terminó (o fue detenida)
    pub fn finish_current(&mut self) -> Option<TrackRef> {
        self.current.take()
    }

    /// Limpia la cola sin tocar la pista actual
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        info!("🗑️ Cola limpiada ({} canciones)", removed);
        removed
    }

    pub fn current(&self) -> Option<&TrackRef> {
        self.current.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pista actual + las primeras `limit` pendientes + cuántas quedan fuera
    pub fn listing(&self, limit: usize) -> QueueListing {
        QueueListing {
            current: self.current.clone(),
            upcoming: self.items.iter().take(limit).cloned().collect(),
            remaining: self.items.len().saturating_sub(limit),
        }
    }
}
