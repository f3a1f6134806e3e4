// Removable medium: block device, mount lifecycle, capacity snapshot

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use sysinfo::Disks;

use crate::fsutil;

const FILESYSTEM_TYPE: &str = "vfat";
const FORMAT_COMMAND: &str = "mkfs.vfat";

/// The medium's relationship to the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Removed,
    Inserted,
    Mounted,
}

/// Capacity snapshot of the mounted filesystem. Valid only while mounted;
/// stale otherwise.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Capacity {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Error type for medium operations
#[derive(Debug, thiserror::Error)]
pub enum MediumError {
    #[error("mount of {device} at {mount_point} failed: {detail}")]
    Mount {
        device: PathBuf,
        mount_point: PathBuf,
        detail: String,
    },

    #[error("unmount of {mount_point} failed: {detail}")]
    Unmount {
        mount_point: PathBuf,
        detail: String,
    },

    #[error("format of {device} failed: {detail}")]
    Format { device: PathBuf, detail: String },
}

/// The physical storage device plus its mount relationship to a path.
pub struct Medium {
    device: PathBuf,
    mount_point: PathBuf,
    state: MountState,
    capacity: Capacity,
}

impl Medium {
    /// Bind to a device and mount point. Creates the mount-point directory
    /// and force-unmounts anything a previous run left mounted there, so the
    /// state machine starts from a clean Removed state.
    pub fn new(device: &Path, mount_point: &Path) -> Self {
        if let Err(e) = fsutil::ensure_dir(mount_point) {
            log::warn!("failed to create mount point {}: {}", mount_point.display(), e);
        }

        let medium = Self {
            device: device.to_path_buf(),
            mount_point: mount_point.to_path_buf(),
            state: MountState::Removed,
            capacity: Capacity::default(),
        };

        if medium.has_mount_point() {
            log::info!("stale mount at {}, unmounting", mount_point.display());
            if let Err(e) = medium.unmount() {
                log::warn!("{}", e);
            }
        }

        medium
    }

    pub fn state(&self) -> MountState {
        self.state
    }

    pub fn set_state(&mut self, state: MountState) {
        self.state = state;
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// The device node exists.
    pub fn is_inserted(&self) -> bool {
        std::fs::metadata(&self.device).is_ok()
    }

    /// The mount path is backed by a distinct filesystem.
    pub fn has_mount_point(&self) -> bool {
        fsutil::is_distinct_filesystem(&self.mount_point)
    }

    pub fn mount(&self) -> Result<(), MediumError> {
        run_checked(
            Command::new("mount")
                .arg("-t")
                .arg(FILESYSTEM_TYPE)
                .arg("-o")
                .arg("relatime")
                .arg(&self.device)
                .arg(&self.mount_point),
        )
        .map_err(|detail| MediumError::Mount {
            device: self.device.clone(),
            mount_point: self.mount_point.clone(),
            detail,
        })
    }

    /// Force, lazy unmount (MNT_FORCE | MNT_DETACH semantics).
    pub fn unmount(&self) -> Result<(), MediumError> {
        run_checked(Command::new("umount").arg("-f").arg("-l").arg(&self.mount_point)).map_err(
            |detail| MediumError::Unmount {
                mount_point: self.mount_point.clone(),
                detail,
            },
        )
    }

    /// Shell out to `mkfs.vfat` and wait for its exit code. The medium is
    /// force-unmounted first; the caller re-mounts through the normal poll
    /// path afterwards.
    pub fn format(&mut self) -> Result<(), MediumError> {
        if let Err(e) = self.unmount() {
            log::warn!("pre-format unmount failed: {}", e);
        }
        self.state = MountState::Inserted;

        log::info!("formatting {} as {}", self.device.display(), FILESYSTEM_TYPE);
        run_checked(Command::new(FORMAT_COMMAND).arg(&self.device)).map_err(|detail| {
            MediumError::Format {
                device: self.device.clone(),
                detail,
            }
        })
    }

    /// Refresh the capacity snapshot from the filesystem backing the mount
    /// point. Only meaningful while mounted.
    pub fn update_capacity(&mut self) {
        let disks = Disks::new_with_refreshed_list();
        for disk in disks.list() {
            if disk.mount_point() == self.mount_point {
                let total = disk.total_space();
                let free = disk.available_space();
                self.capacity = Capacity {
                    total,
                    free,
                    used: total.saturating_sub(free),
                };
                return;
            }
        }
        log::warn!(
            "no filesystem found at {} while refreshing capacity",
            self.mount_point.display()
        );
    }
}

fn run_checked(cmd: &mut Command) -> Result<(), String> {
    match cmd.output() {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => Err(format!(
            "exit {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )),
        Err(e) => Err(e.to_string()),
    }
}
