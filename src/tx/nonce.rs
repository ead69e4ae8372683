//! Nonce sequencing for reliable transaction submission
//!
//! Handles:
//! - Local tracking of the next unused nonce
//! - Serializing submissions so a nonce is never handed out twice
//! - Adopting the gateway's view on refresh (`last used + 1`)

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Tracks the next usable nonce of one account
#[derive(Debug, Default)]
pub struct NonceManager {
    /// Held for the whole read-sign-submit-increment sequence
    lock: Mutex<()>,
    /// Next nonce to use
    next: AtomicU64,
    /// Whether `next` has been synced with the gateway
    known: AtomicBool,
}

/// Exclusive claim on the current nonce; dropping it without
/// [`commit`](NonceLease::commit) leaves the nonce unused
#[derive(Debug)]
pub struct NonceLease<'a> {
    manager: &'a NonceManager,
    nonce: u64,
    _guard: MutexGuard<'a, ()>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    pub fn is_known(&self) -> bool {
        self.known.load(Ordering::SeqCst)
    }

    /// Wait for any in-flight submission, then claim the current nonce
    pub async fn lease(&self) -> NonceLease<'_> {
        let guard = self.lock.lock().await;
        let nonce = self.current();
        debug!(nonce, "Leased nonce");
        NonceLease {
            manager: self,
            nonce,
            _guard: guard,
        }
    }

    /// Adopt the gateway's last used nonce; local nonce becomes `last_used + 1`
    pub async fn sync(&self, last_used: u64) -> u64 {
        let _guard = self.lock.lock().await;
        let next = last_used.saturating_add(1);
        let previous = self.next.swap(next, Ordering::SeqCst);
        self.known.store(true, Ordering::SeqCst);
        debug!(previous, next, "Synced nonce with gateway");
        next
    }

    /// Zero the counter; `&mut` so no lease can be outstanding
    pub fn reset(&mut self) {
        *self.next.get_mut() = 0;
        *self.known.get_mut() = false;
    }

    /// Set the next nonce directly
    pub fn set(&mut self, next: u64) {
        *self.next.get_mut() = next;
    }
}

impl NonceLease<'_> {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Mark the nonce consumed; the next lease gets `nonce + 1`
    pub fn commit(self) -> u64 {
        let next = self.nonce + 1;
        self.manager.next.store(next, Ordering::SeqCst);
        debug!(used = self.nonce, next, "Committed nonce");
        next
    }
}
