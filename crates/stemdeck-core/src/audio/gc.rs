//! RT-safe garbage collection for decoded track buffers
//!
//! Decoded stems are wrapped in `basedrop::Shared<TrackBuffer>`. When the
//! audio thread drops the last reference (a source plays out after the track
//! set it belonged to was replaced), the drop only enqueues the pointer; the
//! actual deallocation of tens of megabytes happens on a background collector
//! thread where latency doesn't matter.
//!
//! ```ignore
//! use basedrop::Shared;
//! use stemdeck_core::audio::gc_handle;
//!
//! let buffer = Shared::new(&gc_handle(), decoded);
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Global handle for creating Shared<T> allocations
static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// How often the collector thread reclaims deferred drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

/// Spawn the collector thread and return a handle to it
fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("stemdeck-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread only
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }

            log::info!("Buffer collector thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        });

    match spawned.ok().and_then(|_| rx.recv().ok()) {
        Some(handle) => handle,
        None => {
            // Without a collector thread the handle must stay owned by a
            // collector that is never collected; leaking it keeps Shared valid.
            log::warn!("Failed to spawn collector thread, deferred drops will not be reclaimed");
            let collector = Box::leak(Box::new(Collector::new()));
            collector.handle()
        }
    }
}

/// Get a handle for creating `Shared<T>` allocations
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
