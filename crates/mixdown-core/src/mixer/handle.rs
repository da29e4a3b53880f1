//! Sound handles
//!
//! A handle is a shared cell holding `slot index + 1`. The mixer keeps one
//! clone inside the channel and hands the other to the caller; when the
//! channel is destroyed its clone writes 0, so every outstanding copy goes
//! dead at once and can never address a reused slot.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct SoundHandle {
    cell: Arc<AtomicU32>,
}

impl SoundHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            cell: Arc::new(AtomicU32::new(index as u32 + 1)),
        }
    }

    /// A handle that never referred to a channel
    pub fn dead() -> Self {
        Self {
            cell: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Slot index while the channel is alive
    pub fn index(&self) -> Option<usize> {
        match self.cell.load(Ordering::Acquire) {
            0 => None,
            n => Some(n as usize - 1),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.index().is_some()
    }

    pub(crate) fn invalidate(&self) {
        self.cell.store(0, Ordering::Release);
    }

    /// Whether two handles share the same cell
    pub(crate) fn same_as(&self, other: &SoundHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Default for SoundHandle {
    fn default() -> Self {
        Self::dead()
    }
}

impl fmt::Debug for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(index) => write!(f, "SoundHandle({})", index),
            None => write!(f, "SoundHandle(dead)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_kills_every_clone() {
        let handle = SoundHandle::new(3);
        let copy = handle.clone();
        assert_eq!(copy.index(), Some(3));

        handle.invalidate();
        assert!(!copy.is_alive());
        assert_eq!(format!("{:?}", copy), "SoundHandle(dead)");
    }

    #[test]
    fn test_handles_for_same_slot_are_distinct() {
        let first = SoundHandle::new(0);
        let second = SoundHandle::new(0);
        assert!(!first.same_as(&second));
        assert!(first.same_as(&first.clone()));
    }
}
