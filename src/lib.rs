// Sdvault - SD-card recording retention manager
// Main library entry point

pub mod clock;
pub mod config;
pub mod fsutil;
pub mod recorder;
pub mod storage;

pub use storage::{SharedStorage, StorageManager};
