// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-flight gate.
//!
//! A capacity-one, non-blocking admission flag. The coordinating thread
//! acquires it before submitting a render job and releases it in the
//! completion handler, so at most one job per (widget, layer) exists.

use core::sync::atomic::{AtomicBool, Ordering};

/// Capacity-one non-blocking gate.
#[derive(Debug, Default)]
pub struct Gate {
    held: AtomicBool,
}

impl Gate {
    /// Creates an open gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Tries to take the gate without blocking.
    ///
    /// Returns `true` if the caller now holds it.
    #[inline]
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Opens the gate.
    ///
    /// Returns `true` if it was held before the call.
    #[inline]
    pub fn release(&self) -> bool {
        self.held.swap(false, Ordering::AcqRel)
    }

    /// Returns `true` while a holder exists.
    #[inline]
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let gate = Gate::new();
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire(), "gate admits a single holder");
        assert!(gate.is_held());
        assert!(gate.release());
        assert!(gate.try_acquire());
    }

    #[test]
    fn release_of_open_gate_reports_false() {
        let gate = Gate::new();
        assert!(!gate.release());
        assert!(!gate.is_held());
    }
}
