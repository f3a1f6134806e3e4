// Storage medium manager: mount lifecycle, session orchestration,
// playlist queries, capacity accounting

pub mod evict;
pub mod medium;
pub mod playlist;
pub mod session;

pub use medium::{Capacity, Medium, MediumError, MountState};
pub use playlist::{RecordDescriptor, SortKey};
pub use session::{Session, StreamSelector};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::config::Config;
use crate::fsutil;
use crate::recorder::{RecordKind, RecorderError};

/// Error type for storage operations surfaced to drivers
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    Medium(#[from] MediumError),

    #[error("storage failure: {0}")]
    Storage(#[from] RecorderError),

    #[error("no open session")]
    NoSession,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Owns the medium's mount state machine, the single open session, and the
/// query/eviction primitives over the on-disk tree.
///
/// Not internally synchronized: every driver reaches it through
/// [`SharedStorage::with_lock`], which serializes all access so session,
/// mount, and capacity state are always observed as one snapshot.
pub struct StorageManager {
    medium: Medium,
    clock: Box<dyn Clock>,
    record_kind: RecordKind,
    rotate_secs: u32,
    session: Option<Session>,
}

impl StorageManager {
    pub fn new(config: &Config, clock: Box<dyn Clock>) -> Self {
        Self {
            medium: Medium::new(&config.device_path, &config.mount_path),
            clock,
            record_kind: config.record_kind,
            rotate_secs: config.rotate_secs,
            session: None,
        }
    }

    pub fn state(&self) -> MountState {
        self.medium.state()
    }

    pub fn capacity(&self) -> Capacity {
        self.medium.capacity()
    }

    pub fn session_key(&self) -> Option<&str> {
        self.session.as_ref().map(Session::key)
    }

    /// Advance the mount state machine one step. Returns whether the medium
    /// is mounted now. Called periodically by the poller driver; mount
    /// failures are not retried here, the next poll tick tries again.
    pub fn poll_medium(&mut self) -> bool {
        if !self.medium.is_inserted() {
            if self.medium.state() != MountState::Removed {
                log::info!("medium removed, stopping session recording");
                if let Err(e) = self.medium.unmount() {
                    log::warn!("{}", e);
                }
                self.close_session();
            }
            self.medium.set_state(MountState::Removed);
            return false;
        }

        self.medium.set_state(MountState::Inserted);

        if self.medium.has_mount_point() {
            self.medium.set_state(MountState::Mounted);
        } else {
            match self.medium.mount() {
                Ok(()) => self.medium.set_state(MountState::Mounted),
                Err(e) => log::warn!("{}", e),
            }
        }

        if self.medium.state() == MountState::Mounted {
            self.medium.update_capacity();
            true
        } else {
            false
        }
    }

    /// Open today's session. No-op when one is already open. The recorders
    /// start idle; artifacts are created lazily on first sample delivery.
    pub fn open_session(&mut self) -> anyhow::Result<()> {
        if self.session.is_some() {
            return Ok(());
        }
        if self.medium.state() != MountState::Mounted {
            anyhow::bail!("cannot open a session while the medium is not mounted");
        }

        let key = self.clock.today();
        let video_dir = self.medium.mount_point().join("video").join(&key);
        let audio_dir = self.medium.mount_point().join("audio").join(&key);
        fsutil::ensure_dir(&video_dir)?;
        fsutil::ensure_dir(&audio_dir)?;

        log::info!("session {} opened ({:?})", key, self.record_kind);
        self.session = Some(Session::new(
            key,
            &video_dir,
            &audio_dir,
            self.record_kind,
            self.rotate_secs,
        ));
        Ok(())
    }

    /// Close the open session, if any. Both recorders are stopped
    /// best-effort; the session is gone afterwards either way.
    pub fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            log::info!("session {} closed", session.key());
            session.close();
        }
    }

    /// Feed one opaque sample buffer to a stream of the open session.
    ///
    /// An idle recorder is started first. A completed artifact is finalized
    /// after the write, so rotation to a fresh artifact happens on the next
    /// delivered sample; the session itself stays open.
    pub fn deliver_sample(&mut self, sel: StreamSelector, bytes: &[u8]) -> Result<()> {
        let now = self.clock.epoch();
        let session = self.session.as_mut().ok_or(StorageError::NoSession)?;
        let (recorder, window) = session.recorder_mut(sel);

        if recorder.is_idle() {
            recorder.start(now, window)?;
        }

        recorder.write(bytes, now, window)?;

        if recorder.is_complete() {
            if let Err(e) = recorder.stop(window) {
                // artifact stays ".tmp" on disk; playlist recovery picks it up
                log::warn!("rotation finalize failed: {}", e);
            }
        }

        Ok(())
    }

    /// Remove the oldest day (no date key) or the oldest record pair of one
    /// day (date key set). Exposed as a primitive; when to call it is the
    /// capacity-policy driver's decision.
    pub fn evict_oldest(&mut self, date_key: Option<&str>) -> anyhow::Result<Option<String>> {
        evict::evict_oldest(self.medium.mount_point(), date_key)
    }

    /// Reconstruct the playlist for one day and record kind from directory
    /// contents alone. Empty while the medium is not mounted.
    pub fn get_playlist(&mut self, date_key: &str, record: RecordKind) -> Vec<RecordDescriptor> {
        if self.medium.state() != MountState::Mounted {
            return Vec::new();
        }
        let live_start = self.session.as_ref().and_then(Session::live_start_epoch);
        playlist::reconstruct(self.medium.mount_point(), date_key, record, live_start)
    }

    /// Format the medium. Any open session is closed first; the medium
    /// comes back through the normal poll/mount path afterwards.
    pub fn format_medium(&mut self) -> Result<()> {
        self.close_session();
        self.medium.format()?;
        Ok(())
    }

    /// Today according to the injected clock.
    pub fn today(&self) -> String {
        self.clock.today()
    }
}

/// The single mutual-exclusion guard in front of the manager.
///
/// Every public manager operation must run through [`with_lock`]; the lock
/// is held for the operation's full duration, so all driver operations are
/// linearizable. Blocking happens only inside filesystem syscalls, while
/// the guard is held — one slow mount stalls the other drivers, by intent.
///
/// [`with_lock`]: SharedStorage::with_lock
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<Mutex<StorageManager>>,
}

impl SharedStorage {
    pub fn new(manager: StorageManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    pub fn with_lock<R>(&self, f: impl FnOnce(&mut StorageManager) -> R) -> R {
        let mut manager = self.inner.lock();
        f(&mut manager)
    }
}
