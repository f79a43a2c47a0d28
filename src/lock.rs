use crate::api::NoteService;
use crate::errors::{ClientError, ClientResult};
use crate::models::EditLock;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Server-side lifetime of an edit lock.
pub const LOCK_TTL_SECONDS: u64 = 120;
/// Renewal cadence. Strictly below the TTL so one missed tick still
/// leaves the lock alive.
pub const LOCK_RENEWAL_SECONDS: u64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Idle,
    Acquiring,
    Held,
    Renewing,
    Released,
    Failed,
}

/// Point-in-time view of the controller. `lock` is present while the
/// claim is held; `lapsed` marks an involuntary loss (failed renewal),
/// after which a save may be rejected by the server.
#[derive(Debug, Clone)]
pub struct LockSnapshot {
    pub state: LockState,
    pub lock: Option<EditLock>,
    pub lapsed: bool,
}

#[derive(Debug)]
struct LockInner {
    state: LockState,
    lock: Option<EditLock>,
    lapsed: bool,
}

/// Owns the lifecycle of one edit-session lock: acquisition, periodic
/// renewal on a background task, and best-effort release. The server is
/// the source of truth for who holds the lock; this controller is a cache
/// of that truth and always yields to a server conflict.
///
/// Each acquisition bumps a generation counter; responses arriving after
/// a release or teardown carry a stale generation and are discarded, so a
/// late renewal can never resurrect a released claim.
pub struct EditLockController {
    service: Arc<dyn NoteService>,
    note_id: u64,
    holder: String,
    inner: Arc<Mutex<LockInner>>,
    generation: Arc<AtomicU64>,
    renewal_task: Mutex<Option<JoinHandle<()>>>,
}

impl EditLockController {
    pub fn new(service: Arc<dyn NoteService>, note_id: u64, holder: impl Into<String>) -> Self {
        Self {
            service,
            note_id,
            holder: holder.into(),
            inner: Arc::new(Mutex::new(LockInner {
                state: LockState::Idle,
                lock: None,
                lapsed: false,
            })),
            generation: Arc::new(AtomicU64::new(0)),
            renewal_task: Mutex::new(None),
        }
    }

    pub fn note_id(&self) -> u64 {
        self.note_id
    }

    pub fn snapshot(&self) -> LockSnapshot {
        let inner = self.inner.lock().expect("lock state mutex");
        LockSnapshot {
            state: inner.state,
            lock: inner.lock.clone(),
            lapsed: inner.lapsed,
        }
    }

    pub fn is_held(&self) -> bool {
        matches!(
            self.snapshot().state,
            LockState::Held | LockState::Renewing
        )
    }

    /// Requests the exclusive edit claim. On success the renewal task is
    /// scheduled; on refusal the controller lands in `Failed` and the
    /// caller must abort the edit attempt. Only a fresh controller (one
    /// new user-initiated open) may acquire again after that.
    pub async fn acquire(&self) -> ClientResult<LockSnapshot> {
        let generation = {
            let mut inner = self.inner.lock().expect("lock state mutex");
            if inner.state != LockState::Idle {
                return Err(ClientError::Internal(format!(
                    "edit lock cannot be acquired from state {:?}",
                    inner.state
                )));
            }
            inner.state = LockState::Acquiring;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let result = self.service.acquire_lock(self.note_id).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            // The session was torn down while the request was in flight.
            // If the server granted the claim anyway, hand it back.
            if result.is_ok() {
                self.spawn_release();
            }
            return Err(ClientError::Internal(
                "edit session closed during lock acquisition".to_string(),
            ));
        }

        match result {
            Ok(response) => {
                let now = Utc::now();
                let expires_at = response.lock_expires_at.unwrap_or_else(|| fallback_expiry(now));
                {
                    let mut inner = self.inner.lock().expect("lock state mutex");
                    inner.state = LockState::Held;
                    inner.lapsed = false;
                    inner.lock = Some(EditLock {
                        note_id: self.note_id,
                        holder: response
                            .locked_by_user
                            .unwrap_or_else(|| self.holder.clone()),
                        acquired_at: now,
                        expires_at,
                        renewed: 0,
                    });
                }
                self.start_renewal(generation);
                Ok(self.snapshot())
            }
            Err(err) => {
                let mut inner = self.inner.lock().expect("lock state mutex");
                inner.state = LockState::Failed;
                inner.lock = None;
                Err(err)
            }
        }
    }

    fn start_renewal(&self, generation: u64) {
        let service = Arc::clone(&self.service);
        let inner = Arc::clone(&self.inner);
        let active_generation = Arc::clone(&self.generation);
        let note_id = self.note_id;

        let task = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(LOCK_RENEWAL_SECONDS));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if active_generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                {
                    let mut guard = inner.lock().expect("lock state mutex");
                    if guard.state != LockState::Held {
                        break;
                    }
                    guard.state = LockState::Renewing;
                }

                let result = service.refresh_lock(note_id).await;

                let mut guard = inner.lock().expect("lock state mutex");
                if active_generation.load(Ordering::SeqCst) != generation {
                    // An explicit release raced this tick; release wins.
                    break;
                }

                match result {
                    Ok(response) => {
                        guard.state = LockState::Held;
                        if let Some(lock) = guard.lock.as_mut() {
                            lock.renewed += 1;
                            lock.expires_at = response
                                .lock_expires_at
                                .unwrap_or_else(|| fallback_expiry(Utc::now()));
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            note_id,
                            error = %err,
                            "edit lock renewal failed; the next save may be rejected"
                        );
                        guard.state = LockState::Released;
                        guard.lapsed = true;
                        guard.lock = None;
                        break;
                    }
                }
            }
        });

        let mut slot = self.renewal_task.lock().expect("renewal task slot");
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    /// Releases the claim: cancels the renewal timer, voids in-flight
    /// responses, and fires the release request without blocking the
    /// caller. A failed release is logged and otherwise ignored.
    pub fn release(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.renewal_task.lock().expect("renewal task slot").take() {
            task.abort();
        }

        let was_held = {
            let mut inner = self.inner.lock().expect("lock state mutex");
            let was_held = matches!(inner.state, LockState::Held | LockState::Renewing);
            if !matches!(inner.state, LockState::Failed) {
                inner.state = LockState::Released;
            }
            inner.lock = None;
            was_held
        };

        if was_held {
            self.spawn_release();
        }
    }

    fn spawn_release(&self) {
        let service = Arc::clone(&self.service);
        let note_id = self.note_id;
        let release = async move {
            if let Err(err) = service.release_lock(note_id).await {
                tracing::debug!(note_id, error = %err, "best-effort lock release failed");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(release);
            }
            Err(_) => {
                tracing::debug!(note_id, "no runtime available for best-effort lock release");
            }
        }
    }
}

impl Drop for EditLockController {
    fn drop(&mut self) {
        self.release();
    }
}

fn fallback_expiry(from: DateTime<Utc>) -> DateTime<Utc> {
    from + chrono::Duration::seconds(LOCK_TTL_SECONDS as i64)
}
