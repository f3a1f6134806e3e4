// Session: the paired video+audio recording activity for one calendar day

use std::path::Path;

use crate::recorder::{RecordKind, Recorder, StreamKind, TimeWindow};

/// Which of a session's two recorders a delivered sample targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSelector {
    Video,
    Audio,
}

/// The currently active pair of recordings sharing one day bucket.
///
/// A session exists only with both recorders present, and exclusively owns
/// them; dropping the session is the sole destruction path. The shared
/// `TimeWindow` keeps the two streams' artifact names time-aligned so
/// playlist reconstruction can pair them.
pub struct Session {
    key: String,
    window: TimeWindow,
    video: Recorder,
    audio: Recorder,
}

impl Session {
    pub fn new(
        key: String,
        video_dir: &Path,
        audio_dir: &Path,
        record: RecordKind,
        rotate_secs: u32,
    ) -> Self {
        Self {
            key,
            window: TimeWindow::new(),
            video: Recorder::new(video_dir, StreamKind::Video, record, rotate_secs),
            audio: Recorder::new(audio_dir, StreamKind::Audio, record, rotate_secs),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Start epoch of either live artifact, used by playlist reconstruction
    /// to keep in-progress records out of query results.
    pub fn live_start_epoch(&self) -> Option<u32> {
        self.video.start_epoch().or_else(|| self.audio.start_epoch())
    }

    pub fn recorder_mut(&mut self, sel: StreamSelector) -> (&mut Recorder, &mut TimeWindow) {
        match sel {
            StreamSelector::Video => (&mut self.video, &mut self.window),
            StreamSelector::Audio => (&mut self.audio, &mut self.window),
        }
    }

    /// Stop both recorders, best-effort. Finalize failures are logged and
    /// not escalated; the leftover ".tmp" artifacts are recovered by the
    /// next playlist query.
    pub fn close(mut self) {
        if let Err(e) = self.video.stop(&mut self.window) {
            log::warn!("video recorder stop failed: {}", e);
        }
        if let Err(e) = self.audio.stop(&mut self.window) {
            log::warn!("audio recorder stop failed: {}", e);
        }
    }
}
