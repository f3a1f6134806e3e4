// On-disk artifact naming scheme
//
// Record filenames are the database: every timestamp a playlist query needs
// is embedded in the name. The grammar, kept for compatibility with media
// already on cards:
//
//   Video Full:    <CCYYMMDDhhmmss>_<start>_<stop>_13.h264
//   Video Motion:  <CCYYMMDDhhmmss>_<start>_<stop>_13_mdt.h264
//   Audio Full:    <CCYYMMDDhhmmss>_<start>_<stop>.g711
//   Audio Motion:  <CCYYMMDDhhmmss>_<start>_<stop>_mdt.g711
//
// plus a trailing ".tmp" while the artifact is still open. Names are parsed
// exactly once per directory scan into this typed form; the suffix
// convention exists only at this serialization boundary.

use super::{RecordKind, StreamKind};
use crate::clock;

pub const TMP_SUFFIX: &str = ".tmp";
pub const VIDEO_EXTENSION: &str = ".h264";
pub const AUDIO_EXTENSION: &str = ".g711";

/// Stream marker carried by video names (historically the FPS field).
const VIDEO_STREAM_MARKER: &str = "13";
const MOTION_MARKER: &str = "mdt";

/// A record filename in typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    /// `CCYYMMDDhhmmss`, derived from the start timestamp
    pub stem: String,
    /// Start epoch, seconds
    pub start: u32,
    /// Stop epoch, seconds; equals `start` until the first rename
    pub stop: u32,
    pub stream: StreamKind,
    pub record: RecordKind,
    /// Open artifacts serialize with a ".tmp" suffix, finalized ones without
    pub finalized: bool,
}

impl ArtifactName {
    /// Name a fresh artifact opened over the given time window.
    pub fn open(stream: StreamKind, record: RecordKind, start: u32, stop: u32) -> Self {
        Self {
            stem: clock::filename_stem(start),
            start,
            stop,
            stream,
            record,
            finalized: false,
        }
    }

    /// Render the full filename, ".tmp" suffix included while open.
    pub fn file_name(&self) -> String {
        let mut name = format!("{}_{}_{}", self.stem, self.start, self.stop);
        if self.stream == StreamKind::Video {
            name.push('_');
            name.push_str(VIDEO_STREAM_MARKER);
        }
        if self.record == RecordKind::Motion {
            name.push('_');
            name.push_str(MOTION_MARKER);
        }
        name.push_str(self.extension());
        if !self.finalized {
            name.push_str(TMP_SUFFIX);
        }
        name
    }

    pub fn extension(&self) -> &'static str {
        match self.stream {
            StreamKind::Video => VIDEO_EXTENSION,
            StreamKind::Audio => AUDIO_EXTENSION,
        }
    }

    /// Parse a directory entry name. Returns `None` for anything that is not
    /// a well-formed record name (wrong extension, wrong field count,
    /// non-numeric timestamps).
    pub fn parse(name: &str) -> Option<Self> {
        let (body, finalized) = match name.strip_suffix(TMP_SUFFIX) {
            Some(body) => (body, false),
            None => (name, true),
        };

        let (body, stream) = if let Some(body) = body.strip_suffix(VIDEO_EXTENSION) {
            (body, StreamKind::Video)
        } else if let Some(body) = body.strip_suffix(AUDIO_EXTENSION) {
            (body, StreamKind::Audio)
        } else {
            return None;
        };

        let fields: Vec<&str> = body.split('_').collect();
        if fields.len() < 3 {
            return None;
        }

        let stem = fields[0];
        if stem.len() != 14 || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let start: u32 = fields[1].parse().ok()?;
        let stop: u32 = fields[2].parse().ok()?;

        // Markers after the timestamps decide the record kind and must match
        // the stream implied by the extension.
        let markers = &fields[3..];
        let record = match (stream, markers) {
            (StreamKind::Video, [VIDEO_STREAM_MARKER]) => RecordKind::Full,
            (StreamKind::Video, [VIDEO_STREAM_MARKER, MOTION_MARKER]) => RecordKind::Motion,
            (StreamKind::Audio, []) => RecordKind::Full,
            (StreamKind::Audio, [MOTION_MARKER]) => RecordKind::Motion,
            _ => return None,
        };

        Some(Self {
            stem: stem.to_string(),
            start,
            stop,
            stream,
            record,
            finalized,
        })
    }

    /// Same artifact with an updated stop timestamp.
    pub fn with_stop(&self, stop: u32) -> Self {
        Self {
            stop,
            ..self.clone()
        }
    }

    /// Same artifact finalized (".tmp" stripped).
    pub fn finalized(&self) -> Self {
        Self {
            finalized: true,
            ..self.clone()
        }
    }

    /// The paired name on the other stream: identical timestamps and record
    /// kind, stream marker and extension swapped. Used to locate the audio
    /// half of a video record during playlist reconstruction.
    pub fn counterpart(&self) -> Self {
        let stream = match self.stream {
            StreamKind::Video => StreamKind::Audio,
            StreamKind::Audio => StreamKind::Video,
        };
        Self {
            stream,
            ..self.clone()
        }
    }

    /// Duration covered by the embedded timestamps, in seconds.
    pub fn duration_secs(&self) -> u32 {
        self.stop.saturating_sub(self.start)
    }

    /// The kind-appropriate reconstructed stem used in playlist entries:
    /// `<CCYYMMDDhhmmss>_<start>_<stop>` without markers or extension.
    pub fn record_stem(&self) -> String {
        format!("{}_{}_{}", self.stem, self.start, self.stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_then_parse_round_trips() {
        let cases = [
            (StreamKind::Video, RecordKind::Full),
            (StreamKind::Video, RecordKind::Motion),
            (StreamKind::Audio, RecordKind::Full),
            (StreamKind::Audio, RecordKind::Motion),
        ];

        for (stream, record) in cases {
            for finalized in [false, true] {
                let mut name = ArtifactName::open(stream, record, 1_704_931_200, 1_704_931_500);
                name.finalized = finalized;
                let rendered = name.file_name();
                let parsed = ArtifactName::parse(&rendered)
                    .unwrap_or_else(|| panic!("failed to parse {rendered}"));
                assert_eq!(parsed, name, "round trip mismatch for {rendered}");
            }
        }
    }

    #[test]
    fn rendered_forms_match_grammar() {
        let name = ArtifactName::open(StreamKind::Video, RecordKind::Full, 1_704_931_200, 1_704_931_200);
        assert_eq!(name.file_name(), "20240111070000_1704931200_1704931200_13.h264.tmp");

        let name = ArtifactName::open(StreamKind::Audio, RecordKind::Motion, 1_704_931_200, 1_704_931_210).finalized();
        assert_eq!(name.file_name(), "20240111070000_1704931200_1704931210_mdt.g711");
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in [
            "notes.txt",
            "20240111070000_1704931200.h264",              // missing stop
            "20240111070000_1704931200_170x931500_13.h264", // non-numeric stop
            "20240111070000_1704931200_1704931500.h264",   // video without marker
            "20240111070000_1704931200_1704931500_13_mdt_x.h264", // extra field
            "20240111070000_1704931200_1704931500_13.g711", // marker on audio
            "2024_1704931200_1704931500_13.h264",          // short stem
        ] {
            assert!(ArtifactName::parse(bad).is_none(), "accepted {bad}");
        }
    }

    #[test]
    fn counterpart_swaps_stream_only() {
        let video = ArtifactName::open(StreamKind::Video, RecordKind::Motion, 100, 500);
        let audio = video.counterpart();
        assert_eq!(audio.stream, StreamKind::Audio);
        assert_eq!(audio.start, video.start);
        assert_eq!(audio.stop, video.stop);
        assert_eq!(audio.record, RecordKind::Motion);
        assert!(audio.file_name().ends_with(".g711.tmp"));
    }

    #[test]
    fn with_stop_keeps_stem() {
        let name = ArtifactName::open(StreamKind::Audio, RecordKind::Full, 100, 100);
        let renamed = name.with_stop(400);
        assert_eq!(renamed.stem, name.stem);
        assert_eq!(renamed.duration_secs(), 300);
    }
}
