// Stream recorder: one output artifact's lifecycle per stream

pub mod artifact;

pub use artifact::ArtifactName;

use serde::{Deserialize, Serialize};
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Which media stream a recorder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

/// Recording policy, distinguished on disk by the motion marker.
/// Content-trigger logic for Motion lives outside this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Full,
    Motion,
}

/// Error type for recorder operations
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("failed to create artifact: {0}")]
    Start(#[source] std::io::Error),

    #[error("failed to append to artifact: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to rename artifact: {0}")]
    Rename(#[source] std::io::Error),

    #[error("recorder has no open artifact")]
    Idle,
}

pub type Result<T> = std::result::Result<T, RecorderError>;

/// Start/stop timestamp pair shared by the two recorders of a session.
///
/// Paired video and audio artifacts must embed identical timestamps or
/// playlist reconstruction cannot match them up. The first stream to open an
/// artifact stamps the window; the second reuses it, so both names agree
/// even when the streams start a tick apart.
#[derive(Debug)]
pub struct TimeWindow {
    start: u32,
    stop: u32,
    open_streams: u8,
}

impl TimeWindow {
    pub fn new() -> Self {
        Self {
            start: 0,
            stop: 0,
            open_streams: 0,
        }
    }

    /// Bind one stream to the window, restamping it when no stream holds it
    /// or when it has aged past `max_age` (a stale window would name a fresh
    /// artifact as already complete).
    fn bind(&mut self, now: u32, max_age: u32) -> (u32, u32) {
        if self.open_streams == 0 || now.saturating_sub(self.start) >= max_age {
            self.start = now;
            self.stop = now;
        }
        self.open_streams += 1;
        (self.start, self.stop)
    }

    fn touch(&mut self, now: u32) {
        if now > self.stop {
            self.stop = now;
        }
    }

    fn release(&mut self) {
        self.open_streams = self.open_streams.saturating_sub(1);
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns one output file's lifecycle for one stream.
///
/// State is a two-valued tag: idle (`artifact == None`) or open. While open,
/// the on-disk file always carries the ".tmp" suffix; `stop()` strips it and
/// returns the recorder to idle.
pub struct Recorder {
    dir: PathBuf,
    stream: StreamKind,
    record: RecordKind,
    rotate_secs: u32,
    artifact: Option<ArtifactName>,
}

impl Recorder {
    pub fn new(dir: &Path, stream: StreamKind, record: RecordKind, rotate_secs: u32) -> Self {
        Self {
            dir: dir.to_path_buf(),
            stream,
            record,
            rotate_secs,
            artifact: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.artifact.is_none()
    }

    /// Path of the open artifact, if any.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.artifact.as_ref().map(|a| self.dir.join(a.file_name()))
    }

    /// Start epoch embedded in the open artifact's name, if any.
    pub fn start_epoch(&self) -> Option<u32> {
        self.artifact.as_ref().map(|a| a.start)
    }

    /// Open a fresh artifact. Requires the recorder to be idle; on creation
    /// failure the recorder stays idle.
    pub fn start(&mut self, now: u32, window: &mut TimeWindow) -> Result<()> {
        debug_assert!(self.is_idle(), "start on a non-idle recorder");

        let (start, stop) = window.bind(now, self.rotate_secs);
        let name = ArtifactName::open(self.stream, self.record, start, stop);
        let path = self.dir.join(name.file_name());

        if let Err(e) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            window.release();
            return Err(RecorderError::Start(e));
        }

        log::debug!("[start] {}", path.display());
        self.artifact = Some(name);
        Ok(())
    }

    /// Append bytes to the open artifact and push them to durable storage,
    /// then rename the file so its embedded stop timestamp reflects the
    /// shared window's latest stop. Both streams of a session rename toward
    /// the same value, so paired names keep matching even when their writes
    /// land on different seconds, and a backwards clock step never rewinds
    /// an embedded stop.
    ///
    /// A failed rename is non-fatal: the bytes are already on disk, the name
    /// just lags. The in-memory name tracks whatever rename actually
    /// succeeded, so the next successful rename heals the discrepancy.
    pub fn write(&mut self, bytes: &[u8], now: u32, window: &mut TimeWindow) -> Result<()> {
        let name = self.artifact.as_ref().ok_or(RecorderError::Idle)?;
        let path = self.dir.join(name.file_name());

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(RecorderError::Write)?;
        file.write_all(bytes).map_err(RecorderError::Write)?;
        file.sync_data().map_err(RecorderError::Write)?;
        drop(file);

        window.touch(now);

        let stop = window.stop;
        if stop > name.stop {
            let renamed = name.with_stop(stop);
            let new_path = self.dir.join(renamed.file_name());
            match std::fs::rename(&path, &new_path) {
                Ok(()) => self.artifact = Some(renamed),
                Err(e) => {
                    log::warn!(
                        "stop-timestamp rename failed for {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok(())
    }

    /// True once the artifact spans at least the rotation threshold. Pure
    /// predicate over the embedded timestamps; never reverts for the same
    /// artifact because the stop timestamp only moves forward.
    pub fn is_complete(&self) -> bool {
        self.artifact
            .as_ref()
            .map(|a| a.duration_secs() >= self.rotate_secs)
            .unwrap_or(false)
    }

    /// Finalize the open artifact by stripping the ".tmp" suffix.
    ///
    /// The recorder returns to idle regardless of the rename outcome; a
    /// failed finalize leaves the artifact on disk with its ".tmp" marker,
    /// to be recovered by the next playlist query.
    pub fn stop(&mut self, window: &mut TimeWindow) -> Result<()> {
        let Some(name) = self.artifact.take() else {
            return Ok(());
        };
        window.release();

        let open_path = self.dir.join(name.file_name());
        let final_path = self.dir.join(name.finalized().file_name());

        match std::fs::rename(&open_path, &final_path) {
            Ok(()) => {
                log::debug!("[stop] {}", final_path.display());
                Ok(())
            }
            Err(e) => Err(RecorderError::Rename(e)),
        }
    }
}
