use crate::backend::{AccountBackend, Backend, GuestBackend, GuestData, RecordStore};
use crate::config::Config;
use crate::errors::QuestError;
use crate::mirror::{GitHubMirror, MirrorSink};
use crate::session::SessionKey;
use crate::storage::{persist_json, remove_json};
use crate::tracker::Tracker;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

struct OpenSession {
    tracker: Arc<Tracker>,
    guest: Option<Arc<GuestBackend>>,
    last_used: Instant,
}

impl OpenSession {
    /// Idle past `timeout` and not held by an in-flight request.
    fn expired(&self, now: Instant, timeout: Duration) -> bool {
        now.duration_since(self.last_used) >= timeout && Arc::strong_count(&self.tracker) == 1
    }
}

#[derive(Clone)]
pub struct AppState {
    pub guests_dir: PathBuf,
    pub records: Arc<RecordStore>,
    pub mirror: Arc<dyn MirrorSink>,
    session_idle: Duration,
    sessions: Arc<Mutex<HashMap<SessionKey, OpenSession>>>,
}

impl AppState {
    pub fn new(
        guests_dir: PathBuf,
        records: RecordStore,
        mirror: Arc<dyn MirrorSink>,
        session_idle: Duration,
    ) -> Self {
        Self {
            guests_dir,
            records: Arc::new(records),
            mirror,
            session_idle,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn from_config(config: &Config) -> Self {
        let records = RecordStore::open(config.records_path()).await;
        let mirror = Arc::new(GitHubMirror::new(config.github_api_url.clone()));
        Self::new(config.guests_dir(), records, mirror, config.session_idle)
    }

    fn guest_path(&self, id: Uuid) -> PathBuf {
        self.guests_dir.join(format!("{id}.json"))
    }

    /// Creates an empty guest save and returns its id.
    pub async fn start_guest(&self) -> Result<Uuid, QuestError> {
        let id = Uuid::new_v4();
        let path = self.guest_path(id);
        persist_json(&path, &GuestData::default()).await?;
        info!(guest = %id, "guest session started");
        Ok(id)
    }

    /// Returns the session's tracker, loading it from its backend on first use.
    ///
    /// Opening a session also drops every other cached session that has gone idle; the
    /// backend keeps their data and they reload on their next request.
    pub async fn tracker(&self, key: &SessionKey) -> Result<Arc<Tracker>, QuestError> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        if let Some(open) = sessions.get_mut(key) {
            open.last_used = now;
            return Ok(Arc::clone(&open.tracker));
        }

        let before = sessions.len();
        sessions.retain(|_, open| !open.expired(now, self.session_idle));
        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), "idle sessions dropped");
        }

        let (backend, guest): (Arc<dyn Backend>, Option<Arc<GuestBackend>>) = match key {
            SessionKey::Guest(id) => {
                let path = self.guest_path(*id);
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(QuestError::UnknownSession);
                }
                let guest = Arc::new(GuestBackend::open(path).await);
                let backend: Arc<dyn Backend> = guest.clone();
                (backend, Some(guest))
            }
            SessionKey::Account(user_id) => {
                let backend: Arc<dyn Backend> = Arc::new(AccountBackend::new(
                    user_id.clone(),
                    Arc::clone(&self.records),
                ));
                (backend, None)
            }
        };

        let tracker = Arc::new(Tracker::open(backend, Arc::clone(&self.mirror)).await?);
        info!(guest = key.is_guest(), "session opened");
        sessions.insert(
            key.clone(),
            OpenSession {
                tracker: Arc::clone(&tracker),
                guest,
                last_used: now,
            },
        );
        Ok(tracker)
    }

    /// Signs an account out, or throws a guest save away.
    pub async fn end_session(&self, key: &SessionKey) -> Result<(), QuestError> {
        let open = self.sessions.lock().await.remove(key);
        match (key, open.and_then(|open| open.guest)) {
            (SessionKey::Guest(_), Some(guest)) => guest.discard().await?,
            (SessionKey::Guest(id), None) => {
                remove_json(&self.guest_path(*id)).await?
            }
            (SessionKey::Account(_), _) => {}
        }
        info!(guest = key.is_guest(), "session closed");
        Ok(())
    }
}
