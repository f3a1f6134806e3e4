// Playlist reconstruction from directory contents
//
// Completed records are derived purely from the on-disk tree: nothing about
// them is kept in memory between queries. A query re-scans the day's video
// directory, pairs each entry with its audio half, recovers artifacts
// orphaned by a crash, and reports the survivors sorted latest-first.

use std::path::Path;

use chrono::Timelike;
use serde::Serialize;

use crate::clock;
use crate::recorder::{ArtifactName, RecordKind, StreamKind};

/// Records shorter than this are power-loss fragments, never surfaced.
const MIN_RECORD_SECS: u32 = 10;

/// Time-of-day sort key from a record's start time. Ordering is
/// field-by-field: hour first, then minute, then second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SortKey {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// A parsed, read-only summary of one completed record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordDescriptor {
    /// `<CCYYMMDDhhmmss>_<start>_<stop>`, markers and extension stripped
    pub file_stem: String,
    pub record: RecordKind,
    /// `CCYY.MM.DD hh:mm:ss`
    pub begin_time: String,
    pub end_time: String,
    pub duration_secs: u32,
    pub sort: SortKey,
}

/// Scan one day's directories and reconstruct its playlist for the given
/// record kind. `live_start` is the open session's shared start timestamp;
/// the in-progress artifact pair is never surfaced as a completed record.
pub fn reconstruct(
    mount_point: &Path,
    date_key: &str,
    record: RecordKind,
    live_start: Option<u32>,
) -> Vec<RecordDescriptor> {
    let video_dir = mount_point.join("video").join(date_key);
    let audio_dir = mount_point.join("audio").join(date_key);

    let entries = match std::fs::read_dir(&video_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("cannot read {}: {}", video_dir.display(), e);
            return Vec::new();
        }
    };

    let mut records = Vec::new();

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };

        let Some(mut video) = ArtifactName::parse(name) else {
            continue;
        };
        if video.stream != StreamKind::Video || video.record != record {
            continue;
        }

        // A one-sided artifact is not a complete record.
        let audio = video.counterpart();
        if !audio_dir.join(audio.file_name()).exists() {
            continue;
        }

        // The live session's artifacts stay out of the playlist.
        if live_start == Some(video.start) {
            continue;
        }

        // A leftover ".tmp" here belongs to a crashed prior session; strip
        // the marker from both halves and keep going with the final names.
        if !video.finalized {
            if let Err(e) = recover_pair(&video_dir, &audio_dir, &video) {
                log::warn!("failed to recover {}: {}", video.file_name(), e);
                continue;
            }
            video = video.finalized();
        }

        if video.duration_secs() < MIN_RECORD_SECS {
            continue;
        }

        let begin = clock::biased_datetime(video.start);
        records.push(RecordDescriptor {
            file_stem: video.record_stem(),
            record,
            begin_time: clock::display_time(video.start),
            end_time: clock::display_time(video.stop),
            duration_secs: video.duration_secs(),
            sort: SortKey {
                hour: begin.hour() as u8,
                minute: begin.minute() as u8,
                second: begin.second() as u8,
            },
        });
    }

    // Latest time-of-day first.
    records.sort_by(|a, b| b.sort.cmp(&a.sort));
    records
}

/// Strip the temporary suffix from both halves of an interrupted record.
fn recover_pair(video_dir: &Path, audio_dir: &Path, video: &ArtifactName) -> std::io::Result<()> {
    let audio = video.counterpart();
    std::fs::rename(
        video_dir.join(video.file_name()),
        video_dir.join(video.finalized().file_name()),
    )?;
    if let Err(e) = std::fs::rename(
        audio_dir.join(audio.file_name()),
        audio_dir.join(audio.finalized().file_name()),
    ) {
        // The audio half was paired a moment ago; losing the rename leaves
        // it recoverable but unpaired, so surface the failure.
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn day_dirs(root: &Path, date: &str) -> (PathBuf, PathBuf) {
        let video = root.join("video").join(date);
        let audio = root.join("audio").join(date);
        std::fs::create_dir_all(&video).unwrap();
        std::fs::create_dir_all(&audio).unwrap();
        (video, audio)
    }

    fn put_pair(root: &Path, date: &str, record: RecordKind, start: u32, stop: u32, finalized: bool) {
        let (video_dir, audio_dir) = day_dirs(root, date);
        let mut video = ArtifactName::open(StreamKind::Video, record, start, stop);
        video.finalized = finalized;
        let audio = video.counterpart();
        std::fs::write(video_dir.join(video.file_name()), b"v").unwrap();
        std::fs::write(audio_dir.join(audio.file_name()), b"a").unwrap();
    }

    const DATE: &str = "2024.01.11";
    // 2024-01-11 00:00:00 UTC; biased display time is 07:00:00
    const BASE: u32 = 1_704_931_200;

    #[test]
    fn missing_day_directory_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(reconstruct(tmp.path(), DATE, RecordKind::Full, None).is_empty());
    }

    #[test]
    fn completed_pair_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        put_pair(tmp.path(), DATE, RecordKind::Full, BASE, BASE + 300, true);

        let list = reconstruct(tmp.path(), DATE, RecordKind::Full, None);
        assert_eq!(list.len(), 1);
        let rec = &list[0];
        assert_eq!(rec.duration_secs, 300);
        assert_eq!(rec.begin_time, "2024.01.11 07:00:00");
        assert_eq!(rec.end_time, "2024.01.11 07:05:00");
        assert_eq!(rec.sort, SortKey { hour: 7, minute: 0, second: 0 });
        assert_eq!(rec.file_stem, format!("20240111070000_{}_{}", BASE, BASE + 300));
    }

    #[test]
    fn orphan_video_without_audio_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let (video_dir, _) = day_dirs(tmp.path(), DATE);
        let video = ArtifactName::open(StreamKind::Video, RecordKind::Full, BASE, BASE + 300).finalized();
        std::fs::write(video_dir.join(video.file_name()), b"v").unwrap();

        assert!(reconstruct(tmp.path(), DATE, RecordKind::Full, None).is_empty());
    }

    #[test]
    fn live_artifact_never_leaks_into_results() {
        let tmp = tempfile::tempdir().unwrap();
        put_pair(tmp.path(), DATE, RecordKind::Full, BASE, BASE + 300, false);

        let live = reconstruct(tmp.path(), DATE, RecordKind::Full, Some(BASE));
        assert!(live.is_empty());

        // same artifact, different live session: treated as crash leftovers
        let other = reconstruct(tmp.path(), DATE, RecordKind::Full, Some(BASE + 9999));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn crash_leftovers_are_recovered_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        put_pair(tmp.path(), DATE, RecordKind::Full, BASE, BASE + 120, false);

        let list = reconstruct(tmp.path(), DATE, RecordKind::Full, None);
        assert_eq!(list.len(), 1);

        let (video_dir, audio_dir) = day_dirs(tmp.path(), DATE);
        let video = ArtifactName::open(StreamKind::Video, RecordKind::Full, BASE, BASE + 120);
        assert!(!video_dir.join(video.file_name()).exists());
        assert!(video_dir.join(video.finalized().file_name()).exists());
        let audio = video.counterpart();
        assert!(audio_dir.join(audio.finalized().file_name()).exists());

        // a second query must not double-count or re-rename
        let again = reconstruct(tmp.path(), DATE, RecordKind::Full, None);
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn sub_threshold_fragments_are_discarded() {
        let tmp = tempfile::tempdir().unwrap();
        put_pair(tmp.path(), DATE, RecordKind::Full, BASE, BASE + 9, true);
        put_pair(tmp.path(), DATE, RecordKind::Full, BASE + 100, BASE + 110, true);

        let list = reconstruct(tmp.path(), DATE, RecordKind::Full, None);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].duration_secs, 10);
    }

    #[test]
    fn record_kinds_query_independently() {
        let tmp = tempfile::tempdir().unwrap();
        put_pair(tmp.path(), DATE, RecordKind::Full, BASE, BASE + 300, true);
        put_pair(tmp.path(), DATE, RecordKind::Motion, BASE + 1000, BASE + 1300, true);

        let full = reconstruct(tmp.path(), DATE, RecordKind::Full, None);
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].record, RecordKind::Full);

        let motion = reconstruct(tmp.path(), DATE, RecordKind::Motion, None);
        assert_eq!(motion.len(), 1);
        assert_eq!(motion[0].record, RecordKind::Motion);
    }

    #[test]
    fn results_sort_descending_by_time_of_day() {
        let tmp = tempfile::tempdir().unwrap();
        // biased times of day: 09:59:59, 10:30:00, 10:05:00
        let starts = [BASE + 2 * 3600 + 59 * 60 + 59, BASE + 3 * 3600 + 30 * 60, BASE + 3 * 3600 + 5 * 60];
        for start in starts {
            put_pair(tmp.path(), DATE, RecordKind::Full, start, start + 300, true);
        }

        let list = reconstruct(tmp.path(), DATE, RecordKind::Full, None);
        let keys: Vec<SortKey> = list.iter().map(|r| r.sort).collect();
        assert_eq!(
            keys,
            vec![
                SortKey { hour: 10, minute: 30, second: 0 },
                SortKey { hour: 10, minute: 5, second: 0 },
                SortKey { hour: 9, minute: 59, second: 59 },
            ]
        );
    }
}
