//! # Tick Signal
//!
//! One-bit handshake between the fixed-period timer (producer) and the
//! sample loop (consumer).
//!
//! The producer only sets the pending bit; it never runs tick logic. The
//! consumer clears the bit and runs exactly one tick. Signals arriving while
//! a tick is still pending coalesce: there is no queue and missed ticks are
//! not detected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Default sample period (100 Hz).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Pending-tick bit.
///
/// The [`Notify`] is only a wake-up hint so [`TickFlag::wait`] does not spin;
/// the atomic bit is the single piece of shared state.
///
/// # Examples
///
/// ```
/// use dualstick_cal::tick::TickFlag;
///
/// let flag = TickFlag::new();
/// flag.signal();
/// flag.signal();
/// assert!(flag.take());
/// assert!(!flag.take()); // both signals coalesced into one tick
/// ```
#[derive(Debug, Default)]
pub struct TickFlag {
    pending: AtomicBool,
    wake: Notify,
}

impl TickFlag {
    /// Creates a flag with no tick pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer side: mark a tick pending.
    pub fn signal(&self) {
        self.pending.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Consumer side: clear the bit, returning whether a tick was pending.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Consumer side: wait until a tick is pending, then clear it.
    pub async fn wait(&self) {
        loop {
            if self.take() {
                return;
            }
            self.wake.notified().await;
        }
    }
}

/// Spawns the periodic producer: signals `flag` once per `period`.
///
/// A late timer does not burst to catch up; the flag would coalesce the
/// burst anyway.
pub fn spawn_ticker(flag: Arc<TickFlag>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            timer.tick().await;
            flag.signal();
        }
    })
}
