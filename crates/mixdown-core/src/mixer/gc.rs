//! Deferred deallocation for channels destroyed on the audio thread
//!
//! Channels are wrapped in `basedrop::Owned`. Dropping one inside the mix
//! callback only enqueues the pointer; the actual free (stream buffers,
//! decoder state, converter scratch) happens on a background collector
//! thread.
//!
//! ```ignore
//! let owned = Owned::new(&gc_handle(), channel);
//! drop(owned); // queued, freed later on the "mixer-gc" thread
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("mixer-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives and dies on this thread
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }

            log::info!("Mixer GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        });

    match spawned.ok().and_then(|_| rx.recv().ok()) {
        Some(handle) => handle,
        None => {
            // No background thread: keep a collector that is never run,
            // leaking deferred drops rather than freeing on the audio thread
            log::error!("Failed to start mixer GC thread; deferred frees will leak");
            let collector = Box::leak(Box::new(Collector::new()));
            collector.handle()
        }
    }
}

/// Handle for wrapping values in `basedrop::Owned`/`Shared`
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Owned;

    #[test]
    fn test_handle_is_reusable() {
        let first = Owned::new(&gc_handle(), vec![0u8; 1024]);
        let second = Owned::new(&gc_handle(), 42u32);
        assert_eq!(first.len(), 1024);
        assert_eq!(*second, 42);
    }
}
