//! Server-side session store
//!
//! Sessions are held in-process, keyed by an opaque UUID token handed to the
//! client at creation. No ambient globals: handlers reach sessions only
//! through the store in [`AppState`](crate::AppState).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use gearpoll_common::pairing::SurveySession;

/// Sessions older than this are dropped regardless of state.
const MAX_SESSION_AGE: Duration = Duration::from_secs(24 * 60 * 60);

struct StoredSession {
    session: Arc<Mutex<SurveySession>>,
    created: Instant,
}

/// Shared map of live survey sessions.
///
/// Each session carries its own mutex. The outer lock only guards map
/// membership, so a slow answer write serializes requests for that one
/// session without stalling the others.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, StoredSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new session under a fresh token.
    ///
    /// Insertion doubles as the eviction point: completed sessions and
    /// sessions past [`MAX_SESSION_AGE`] are swept out here, so the map
    /// stays bounded by the number of surveys in flight.
    pub async fn insert(&self, session: SurveySession) -> Uuid {
        let token = Uuid::new_v4();
        let mut map = self.inner.write().await;
        map.retain(|_, stored| {
            if stored.created.elapsed() >= MAX_SESSION_AGE {
                return false;
            }
            // A session locked by an in-flight request is live; keep it.
            match stored.session.try_lock() {
                Ok(session) => !session.is_completed(),
                Err(_) => true,
            }
        });
        map.insert(
            token,
            StoredSession {
                session: Arc::new(Mutex::new(session)),
                created: Instant::now(),
            },
        );
        token
    }

    /// Fetch the per-session lock for a token.
    ///
    /// The store lock is released before the caller locks the session, so
    /// record-then-advance stays atomic per session only.
    pub async fn get(&self, token: Uuid) -> Option<Arc<Mutex<SurveySession>>> {
        self.inner
            .read()
            .await
            .get(&token)
            .map(|stored| Arc::clone(&stored.session))
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
