// Oldest-first eviction
//
// Two granularities: with no date key, a whole day (both video and audio
// subtrees) is evicted; with a date key, a single video+audio record pair
// inside that day. Victims are chosen by filesystem birth time, with the
// entry name as tiebreaker so equal timestamps still evict deterministically
// (day directories and record stems both sort chronologically).

use std::path::Path;

use crate::fsutil;
use crate::recorder::{ArtifactName, StreamKind};

/// Remove the oldest entry under the mount point. Returns the evicted entry
/// name, or `None` when the tree is empty (a no-op, never an error).
pub fn evict_oldest(mount_point: &Path, date_key: Option<&str>) -> anyhow::Result<Option<String>> {
    match date_key {
        None => evict_oldest_day(mount_point),
        Some(date) => evict_oldest_record(mount_point, date),
    }
}

fn evict_oldest_day(mount_point: &Path) -> anyhow::Result<Option<String>> {
    let video_root = mount_point.join("video");
    let audio_root = mount_point.join("audio");

    // Scan both trees: a day left over in only one of them (a partially
    // failed eviction, or a one-sided write) must still be reclaimable.
    let Some((_, victim)) = [&video_root, &audio_root]
        .into_iter()
        .filter_map(|root| oldest_entry(root, |_| true))
        .min()
    else {
        return Ok(None);
    };

    log::info!("evicting day {}", victim);
    for root in [&video_root, &audio_root] {
        let day = root.join(&victim);
        if day.exists() {
            std::fs::remove_dir_all(day)?;
        }
    }
    Ok(Some(victim))
}

fn evict_oldest_record(mount_point: &Path, date_key: &str) -> anyhow::Result<Option<String>> {
    let video_dir = mount_point.join("video").join(date_key);
    let audio_dir = mount_point.join("audio").join(date_key);

    // Candidates come from both trees so an orphaned half is still
    // reclaimable. Ties compare by the shared record stem, video first, so
    // an intact pair always reports its video half as the victim.
    let candidates = [
        (StreamKind::Video, &video_dir),
        (StreamKind::Audio, &audio_dir),
    ]
    .into_iter()
    .filter_map(|(stream, dir)| {
        let (birth, name) = oldest_entry(dir, |name| {
            ArtifactName::parse(name).is_some_and(|a| a.stream == stream)
        })?;
        Some((birth, ArtifactName::parse(&name)?))
    });
    let Some((_, artifact)) = candidates.min_by_key(|(birth, a)| {
        (*birth, a.record_stem(), matches!(a.stream, StreamKind::Audio))
    }) else {
        return Ok(None);
    };

    let victim = artifact.file_name();
    log::info!("evicting record {}", victim);
    let (own_dir, other_dir) = match artifact.stream {
        StreamKind::Video => (&video_dir, &audio_dir),
        StreamKind::Audio => (&audio_dir, &video_dir),
    };
    std::fs::remove_file(own_dir.join(&victim))?;
    let counterpart = other_dir.join(artifact.counterpart().file_name());
    if counterpart.exists() {
        std::fs::remove_file(counterpart)?;
    }
    Ok(Some(victim))
}

/// Entry with the smallest (birth time, name) in a directory, filtered.
/// `None` when the directory is missing or has no matching entries.
fn oldest_entry(dir: &Path, keep: impl Fn(&str) -> bool) -> Option<(i64, String)> {
    let entries = std::fs::read_dir(dir).ok()?;

    entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            if !keep(&name) {
                return None;
            }
            let birth = fsutil::birth_timestamp(&entry.path());
            Some((birth, name))
        })
        .min()
}
