use crate::channel::{Channel, Readiness};
use crate::hal::WaitQueue;

/// A readiness snapshot of one channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollState {
    /// A read would proceed without waiting.
    pub readable: bool,
    /// A write would proceed without waiting.
    pub writable: bool,
}

impl<W: WaitQueue> Channel<W> {
    /// Observes both readiness flags without blocking or consuming them.
    pub fn poll(&self) -> PollState {
        PollState {
            readable: self.data_ready() == Readiness::Ready,
            writable: self.tx_empty() == Readiness::Ready,
        }
    }
}
