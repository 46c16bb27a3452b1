use core::sync::atomic::{fence, AtomicBool, AtomicU32, Ordering};

use crate::error::{P128Error, P128Result};
use crate::hal::WaitQueue;
use crate::transport::ChannelStatus;

const NO_TOKEN: u32 = u32::MAX;

/// Readiness of one direction of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// No transfer may proceed until the peripheral signals an event.
    NotReady,
    /// Exactly one transfer may proceed.
    Ready,
}

impl From<bool> for Readiness {
    fn from(ready: bool) -> Self {
        if ready {
            Readiness::Ready
        } else {
            Readiness::NotReady
        }
    }
}

/// One flow direction of a channel: a readiness flag, a transfer lock that
/// serializes callers, and the queue they sleep on.
///
/// The flag is a lock-free atomic so interrupt context can flip it without ever
/// spinning on a lock held by a preempted task. Only the transfer-lock holder
/// clears it; only the interrupt path (or bring-up) sets it.
pub(crate) struct Direction<W> {
    ready: AtomicBool,
    transfer: AtomicBool,
    queue: W,
}

/// Holds the transfer lock of a [`Direction`]; releases and wakes on drop.
pub(crate) struct TransferGuard<'a, W: WaitQueue> {
    dir: &'a Direction<W>,
}

impl<W: WaitQueue> Direction<W> {
    fn new(queue: W) -> Self {
        Self {
            ready: AtomicBool::new(false),
            transfer: AtomicBool::new(false),
            queue,
        }
    }

    pub(crate) fn readiness(&self) -> Readiness {
        self.ready.load(Ordering::Acquire).into()
    }

    fn seed(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// `NotReady -> Ready`. Wakes the waiters only when the transition happens.
    ///
    /// Never blocks; safe to call from interrupt context.
    pub(crate) fn signal(&self) -> bool {
        if self
            .ready
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        // The flag store must be visible before any waiter re-checks it.
        fence(Ordering::SeqCst);
        self.queue.notify_all();
        true
    }

    /// `Ready -> NotReady`. Only called by the transfer-lock holder.
    pub(crate) fn consume(&self) -> bool {
        self.ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Gives back readiness taken by [`consume`](Self::consume) when the transfer failed.
    pub(crate) fn restore(&self) {
        self.ready.store(true, Ordering::Release);
    }

    fn try_acquire(&self) -> bool {
        self.transfer
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Acquires the transfer lock, sleeping while another task holds it.
    pub(crate) fn lock(&self, alive: &AtomicBool) -> P128Result<TransferGuard<'_, W>> {
        let mut acquired = false;
        self.queue.wait_until(|| {
            acquired = self.try_acquire();
            acquired || !alive.load(Ordering::Acquire)
        })?;
        if acquired {
            Ok(TransferGuard { dir: self })
        } else {
            Err(P128Error::NoSuchChannel)
        }
    }

    /// Sleeps until the direction is `Ready`. Caller holds the transfer lock.
    pub(crate) fn wait_ready(&self, _guard: &TransferGuard<'_, W>, alive: &AtomicBool) -> P128Result {
        self.queue.wait_until(|| {
            !alive.load(Ordering::Acquire) || self.ready.load(Ordering::Acquire)
        })?;
        if alive.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(P128Error::NoSuchChannel)
        }
    }

    fn wake(&self) {
        self.queue.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.transfer.load(Ordering::Acquire)
    }
}

impl<W: WaitQueue> Drop for TransferGuard<'_, W> {
    fn drop(&mut self) {
        self.dir.transfer.store(false, Ordering::Release);
        self.dir.queue.notify_all();
    }
}

/// One sub-channel of an instance: a duplex pipe moving fixed-size frames.
///
/// Receive (`rx`, gated by data-ready) and transmit (`tx`, gated by tx-empty) are
/// independent: each has its own flag, transfer lock and wait queue, so a blocked
/// reader never holds up a writer on the same channel.
pub struct Channel<W> {
    instance_id: u32,
    index: u16,
    irq_token: AtomicU32,
    busy: AtomicBool,
    published: AtomicBool,
    pub(crate) rx: Direction<W>,
    pub(crate) tx: Direction<W>,
}

impl<W: WaitQueue> Channel<W> {
    pub(crate) fn new(instance_id: u32, index: u16, rx_queue: W, tx_queue: W) -> Self {
        Self {
            instance_id,
            index,
            irq_token: AtomicU32::new(NO_TOKEN),
            busy: AtomicBool::new(false),
            published: AtomicBool::new(false),
            rx: Direction::new(rx_queue),
            tx: Direction::new(tx_queue),
        }
    }

    /// The id of the instance owning this channel.
    pub const fn instance_id(&self) -> u32 {
        self.instance_id
    }

    /// The index of this channel inside its instance.
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// The interrupt token bound at bring-up, if any.
    pub fn interrupt_token(&self) -> Option<u16> {
        match self.irq_token.load(Ordering::Acquire) {
            NO_TOKEN => None,
            token => Some(token as u16),
        }
    }

    /// Whether the channel is fully brought up.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether the channel's device node is visible.
    pub fn is_published(&self) -> bool {
        self.published.load(Ordering::Acquire)
    }

    /// Readiness of the receive direction.
    pub fn data_ready(&self) -> Readiness {
        self.rx.readiness()
    }

    /// Readiness of the transmit direction.
    pub fn tx_empty(&self) -> Readiness {
        self.tx.readiness()
    }

    pub(crate) fn alive(&self) -> &AtomicBool {
        &self.busy
    }

    pub(crate) fn bind_token(&self, token: u16) {
        self.irq_token.store(token as u32, Ordering::Release);
    }

    pub(crate) fn unbind_token(&self) {
        self.irq_token.store(NO_TOKEN, Ordering::Release);
    }

    /// Resets both directions from a status snapshot.
    pub(crate) fn seed(&self, status: ChannelStatus) {
        self.rx.seed(status.contains(ChannelStatus::DATA_READY));
        self.tx.seed(status.contains(ChannelStatus::TX_EMPTY));
    }

    pub(crate) fn set_published(&self, published: bool) {
        self.published.store(published, Ordering::Release);
    }

    /// Marks the channel up. Must only follow a successful publish.
    pub(crate) fn set_up(&self) {
        debug_assert!(self.is_published());
        self.busy.store(true, Ordering::Release);
    }

    /// Marks the channel down and releases every task sleeping on it.
    ///
    /// Returns `false` if the channel was already down.
    pub(crate) fn set_down(&self) -> bool {
        if !self.busy.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.rx.wake();
        self.tx.wake();
        true
    }
}
