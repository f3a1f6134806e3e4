// Wall-clock and calendar conversion utilities
//
// The on-disk naming scheme carries a fixed +7 hour bias in its calendar
// fields (local time baked into the format). The bias is part of the format,
// so it lives here, applied in exactly one place.

use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Fixed local-time bias applied when converting epoch seconds to the
/// calendar fields embedded in filenames and playlist entries.
pub const LOCAL_TIME_BIAS_HOURS: i64 = 7;

/// Time providers consumed from the driver layer.
///
/// The core never reads the system clock directly; everything that needs
/// "now" or "today" goes through this trait so tests can run on a manual
/// clock and day-rollover can be exercised deterministically.
pub trait Clock: Send {
    /// Current epoch timestamp in seconds.
    fn epoch(&self) -> u32;

    /// Today's date key, `CCYY.MM.DD`, used as the session key and the
    /// per-day directory name.
    fn today(&self) -> String;
}

/// Production clock backed by the OS.
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch(&self) -> u32 {
        Utc::now().timestamp() as u32
    }

    fn today(&self) -> String {
        Local::now().format("%Y.%m.%d").to_string()
    }
}

/// Convert an epoch timestamp to calendar fields with the filename bias
/// applied.
pub fn biased_datetime(epoch: u32) -> NaiveDateTime {
    let dt = DateTime::<Utc>::from_timestamp(epoch as i64, 0).unwrap_or_default();
    (dt + chrono::Duration::hours(LOCAL_TIME_BIAS_HOURS)).naive_utc()
}

/// Render the `CCYYMMDDhhmmss` filename stem for an epoch timestamp.
pub fn filename_stem(epoch: u32) -> String {
    biased_datetime(epoch).format("%Y%m%d%H%M%S").to_string()
}

/// Render the human-readable `CCYY.MM.DD hh:mm:ss` form used in playlist
/// entries.
pub fn display_time(epoch: u32) -> String {
    biased_datetime(epoch).format("%Y.%m.%d %H:%M:%S").to_string()
}

/// Manual clock for tests: epoch advances only when told to.
#[cfg(test)]
pub struct ManualClock {
    epoch: std::sync::atomic::AtomicU32,
    today: parking_lot::Mutex<String>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(epoch: u32, today: &str) -> Self {
        Self {
            epoch: std::sync::atomic::AtomicU32::new(epoch),
            today: parking_lot::Mutex::new(today.to_string()),
        }
    }

    pub fn advance(&self, secs: u32) {
        self.epoch
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_today(&self, today: &str) {
        *self.today.lock() = today.to_string();
    }
}

#[cfg(test)]
impl Clock for std::sync::Arc<ManualClock> {
    fn epoch(&self) -> u32 {
        self.epoch.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn today(&self) -> String {
        self.today.lock().clone()
    }
}
