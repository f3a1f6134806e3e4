// Sdvault daemon: wires the driver loops around the storage core
//
// Four independent worker loops share the manager through its single guard:
// a medium/day-rollover poller, one sample-delivery loop per stream, and an
// optional capacity-policy loop. The Ctrl-C handler drains session state
// under the guard and reports today's playlists before exit.

use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::bounded;

use sdvault::clock::SystemClock;
use sdvault::config::Config;
use sdvault::recorder::RecordKind;
use sdvault::storage::{SharedStorage, StorageError, StorageManager, StreamSelector};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sdvault.toml"));
    let config = Config::load_or_default(&config_path);
    log::info!(
        "starting with device {} mounted at {}",
        config.device_path.display(),
        config.mount_path.display()
    );

    let storage = SharedStorage::new(StorageManager::new(&config, Box::new(SystemClock)));

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })?;

    // Bring the medium up before the loops start so the first samples have a
    // session to land in.
    storage.with_lock(|mgr| {
        if mgr.poll_medium() {
            if let Err(e) = mgr.open_session() {
                log::error!("failed to open session: {}", e);
            }
        }
    });

    spawn_medium_poller(storage.clone(), config.poll_interval_secs);
    spawn_sample_feeder(storage.clone(), StreamSelector::Video, config.sample_interval_secs);
    spawn_sample_feeder(storage.clone(), StreamSelector::Audio, config.sample_interval_secs);
    if config.min_free_bytes > 0 {
        spawn_capacity_policy(storage.clone(), config.min_free_bytes, config.poll_interval_secs);
    }

    shutdown_rx.recv()?;
    log::info!("shutting down");

    storage.with_lock(|mgr| {
        mgr.close_session();

        let today = mgr.today();
        for kind in [RecordKind::Full, RecordKind::Motion] {
            let records = mgr.get_playlist(&today, kind);
            log::info!("{:?} records for {}: {}", kind, today, records.len());
            if !records.is_empty() {
                match serde_json::to_string_pretty(&records) {
                    Ok(json) => println!("{json}"),
                    Err(e) => log::warn!("failed to serialize playlist: {}", e),
                }
            }
        }
    });

    Ok(())
}

/// Poll insertion/mount state and roll the session over at day boundaries.
fn spawn_medium_poller(storage: SharedStorage, interval_secs: u64) {
    std::thread::spawn(move || loop {
        storage.with_lock(|mgr| {
            if !mgr.poll_medium() {
                return;
            }

            let stale = mgr
                .session_key()
                .is_some_and(|key| key != mgr.today());
            if stale {
                log::info!("day rollover");
                mgr.close_session();
            }
            if let Err(e) = mgr.open_session() {
                log::error!("failed to open session: {}", e);
            }
        });

        std::thread::sleep(Duration::from_secs(interval_secs));
    });
}

/// Deliver one synthetic sample per tick. Real deployments replace the
/// payload with the encoder's bitstream buffers; the storage contract is
/// identical since samples are opaque bytes.
fn spawn_sample_feeder(storage: SharedStorage, sel: StreamSelector, interval_secs: u64) {
    std::thread::spawn(move || {
        let mut counter: u8 = 0;
        loop {
            counter = counter.wrapping_add(1);
            let outcome = storage.with_lock(|mgr| mgr.deliver_sample(sel, &[counter]));
            match outcome {
                Ok(()) => log::debug!("{:?} sample {} stored", sel, counter),
                Err(StorageError::NoSession) => log::debug!("{:?} sample dropped, no session", sel),
                Err(e) => log::warn!("{:?} sample {} not stored: {}", sel, counter, e),
            }

            std::thread::sleep(Duration::from_secs(interval_secs));
        }
    });
}

/// Evict the oldest day whenever free space falls under the floor.
fn spawn_capacity_policy(storage: SharedStorage, min_free_bytes: u64, interval_secs: u64) {
    std::thread::spawn(move || loop {
        storage.with_lock(|mgr| {
            if mgr.state() != sdvault::storage::MountState::Mounted {
                return;
            }
            let capacity = mgr.capacity();
            if capacity.free >= min_free_bytes {
                return;
            }
            log::info!(
                "free space {} below floor {}, evicting oldest day",
                capacity.free,
                min_free_bytes
            );
            match mgr.evict_oldest(None) {
                Ok(Some(day)) => log::info!("evicted {}", day),
                Ok(None) => log::warn!("nothing left to evict"),
                Err(e) => log::error!("eviction failed: {}", e),
            }
        });

        std::thread::sleep(Duration::from_secs(interval_secs));
    });
}
