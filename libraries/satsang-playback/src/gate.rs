//! Non-blocking re-entrancy gates

use std::sync::atomic::{AtomicU64, Ordering};

const FREE: u64 = 0;

/// A try-only mutex flag
///
/// Overlapping requests are rejected rather than queued: `try_acquire`
/// either hands out the single permit or returns `None`. The permit releases
/// the gate when dropped, including when the owning future is cancelled.
///
/// A holder that is known to be stuck can be displaced with
/// [`TryGate::take_over`]; the displaced permit then releases nothing.
#[derive(Debug)]
pub struct TryGate {
    name: &'static str,
    owner: AtomicU64,
    next_token: AtomicU64,
}

impl TryGate {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            owner: AtomicU64::new(FREE),
            next_token: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        let token = self.token();
        self.owner
            .compare_exchange(FREE, token, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GatePermit { gate: self, token })
    }

    /// Acquire the gate whether or not it is held
    pub fn take_over(&self) -> GatePermit<'_> {
        let token = self.token();
        let displaced = self.owner.swap(token, Ordering::AcqRel);
        if displaced != FREE {
            tracing::debug!(gate = self.name, "gate taken over from a stuck holder");
        }
        GatePermit { gate: self, token }
    }

    pub fn is_held(&self) -> bool {
        self.owner.load(Ordering::Acquire) != FREE
    }

    fn token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }
}

/// Proof of holding a [`TryGate`]
#[derive(Debug)]
#[must_use = "the gate is released as soon as the permit is dropped"]
pub struct GatePermit<'a> {
    gate: &'a TryGate,
    token: u64,
}

impl GatePermit<'_> {
    /// Whether this permit still owns the gate
    pub fn is_current(&self) -> bool {
        self.gate.owner.load(Ordering::Acquire) == self.token
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        // Only the current owner may free the gate
        let _ = self.gate.owner.compare_exchange(
            self.token,
            FREE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_until_release() {
        let gate = TryGate::new("load");

        let permit = gate.try_acquire();
        assert!(permit.is_some());
        assert!(gate.try_acquire().is_none());
        assert!(gate.is_held());

        drop(permit);
        assert!(!gate.is_held());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn displaced_permit_does_not_release_the_new_owner() {
        let gate = TryGate::new("load");

        let stuck = gate.try_acquire().unwrap();
        let fresh = gate.take_over();
        assert!(!stuck.is_current());
        assert!(fresh.is_current());

        drop(stuck);
        assert!(gate.is_held());
        assert!(gate.try_acquire().is_none());

        drop(fresh);
        assert!(!gate.is_held());
    }
}
