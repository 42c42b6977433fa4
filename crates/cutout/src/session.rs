//! Per-session state for front ends that keep a user's last upload and
//! last cut-out between requests.
//!
//! The engine never touches this store. Each session sits behind its own
//! mutex, so requests for different sessions do not contend beyond the
//! brief map lookup.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use tracing::debug;

use crate::types::{ExtractionResult, RasterImage};

#[derive(Debug, Default)]
struct Session {
    image: Option<RasterImage>,
    result: Option<ExtractionResult>,
}

/// Thread-safe map from session id to that session's state
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self, key: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(session);
        }
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(key.to_string()).or_default())
    }

    fn existing(&self, key: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Remember the latest upload for `key`.
    pub fn put_image(&self, key: &str, image: RasterImage) {
        debug!(session = key, width = image.width(), height = image.height(), "Stored image");
        let session = self.session(key);
        session.lock().unwrap_or_else(PoisonError::into_inner).image = Some(image);
    }

    /// The latest upload for `key`, if any.
    pub fn image(&self, key: &str) -> Option<RasterImage> {
        let session = self.existing(key)?;
        let guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        guard.image.clone()
    }

    pub fn store_result(&self, key: &str, result: ExtractionResult) {
        let session = self.session(key);
        session.lock().unwrap_or_else(PoisonError::into_inner).result = Some(result);
    }

    /// Remove and return the last result for `key`.
    pub fn take_result(&self, key: &str) -> Option<ExtractionResult> {
        let session = self.existing(key)?;
        let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        guard.result.take()
    }

    /// Forget a session entirely. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtractionMode, Region};
    use image::Rgba;
    use std::thread;

    fn result_of(size: u32) -> ExtractionResult {
        ExtractionResult {
            image: RasterImage::from_pixel(size, size, Rgba([0, 0, 0, 255])),
            region: Region::full(size, size),
            mode: ExtractionMode::Generic,
        }
    }

    #[test]
    fn test_image_and_result_lifecycle() {
        let store = SessionStore::new();
        assert!(store.image("alice").is_none());
        assert!(store.is_empty());

        store.put_image("alice", RasterImage::new(4, 3));
        store.store_result("alice", result_of(2));
        assert_eq!(store.image("alice").map(|i| i.dimensions()), Some((4, 3)));
        assert_eq!(store.take_result("alice").map(|r| r.width()), Some(2));
        assert!(store.take_result("alice").is_none());
        assert_eq!(store.len(), 1);

        assert!(store.remove("alice"));
        assert!(!store.remove("alice"));
        assert!(store.image("alice").is_none());
    }

    #[test]
    fn test_sessions_are_isolated_across_threads() {
        let store = SessionStore::new();
        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    let key = format!("user-{i}");
                    store.put_image(&key, RasterImage::new(i + 1, 1));
                    store.store_result(&key, result_of(i + 1));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8);
        for i in 0..8u32 {
            let key = format!("user-{i}");
            assert_eq!(store.image(&key).map(|img| img.width()), Some(i + 1));
            assert_eq!(store.take_result(&key).map(|r| r.width()), Some(i + 1));
        }
    }
}
