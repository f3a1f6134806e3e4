// Filesystem helpers shared by the recorder and storage layers

use std::io;
use std::path::Path;

/// Create a directory (and any missing parents) if it does not exist yet.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Filesystem birth time of a path in epoch seconds, used to pick eviction
/// victims. Falls back to the inode change time when the filesystem does not
/// report a creation time; 0 when the path cannot be stat'd at all.
pub fn birth_timestamp(path: &Path) -> i64 {
    let Ok(meta) = std::fs::metadata(path) else {
        return 0;
    };

    if let Ok(created) = meta.created() {
        if let Ok(secs) = created.duration_since(std::time::UNIX_EPOCH) {
            return secs.as_secs() as i64;
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        meta.ctime()
    }

    #[cfg(not(unix))]
    {
        0
    }
}

/// True when `path` is backed by a different filesystem than its parent
/// directory, i.e. something is mounted there.
pub fn is_distinct_filesystem(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("/"),
        };

        match (std::fs::metadata(path), std::fs::metadata(parent)) {
            (Ok(own), Ok(up)) => own.dev() != up.dev(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        false
    }
}
