// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Counting guard that bounds live browser processes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Process-wide render slot pool.
///
/// Cloning shares the same pool. At most `limit` [`RenderSlot`]s exist at
/// any moment; `acquire` suspends until one is free.
#[derive(Debug, Clone)]
pub struct RenderGuard {
    semaphore: Arc<Semaphore>,
    limit: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl RenderGuard {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<RenderSlot, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(RenderSlot {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Default for RenderGuard {
    fn default() -> Self {
        Self::new(2)
    }
}

/// A held render slot. Released on drop.
#[derive(Debug)]
pub struct RenderSlot {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for RenderSlot {
    fn drop(&mut self) {
        // Counter drops before the permit field is released.
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_slots_bounded_and_released() {
        let guard = RenderGuard::new(2);
        let a = guard.acquire().await.unwrap();
        let b = guard.acquire().await.unwrap();
        assert_eq!(guard.in_flight(), 2);

        let third = tokio::time::timeout(Duration::from_millis(50), guard.acquire()).await;
        assert!(third.is_err(), "third slot must wait");

        drop(a);
        assert_eq!(guard.in_flight(), 1);
        let c = tokio::time::timeout(Duration::from_millis(50), guard.acquire())
            .await
            .expect("slot should be free")
            .unwrap();
        drop(b);
        drop(c);
        assert_eq!(guard.in_flight(), 0);
        assert_eq!(guard.peak(), 2);
    }

    #[test]
    fn test_zero_limit_clamped() {
        assert_eq!(RenderGuard::new(0).limit(), 1);
    }
}
