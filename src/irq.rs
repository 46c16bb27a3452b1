use alloc::sync::{Arc, Weak};

use crate::channel::Channel;
use crate::hal::{P128Hal, WaitQueue};
use crate::lifecycle::Instance;
use crate::transport::{ChannelStatus, ChannelTransport};

/// Outcome reported back to the interrupt subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrqReturn {
    /// No channel could be serviced.
    None,
    /// The interrupt was serviced.
    Handled,
}

/// The dispatcher bound to one interrupt token by [`P128Hal::request_irq`].
///
/// Holds only a weak reference to the instance: once the instance is dropped the
/// handler reports [`IrqReturn::None`].
pub struct IrqHandler<H: P128Hal> {
    instance: Weak<Instance<H>>,
    token: u16,
}

impl<H: P128Hal> IrqHandler<H> {
    pub(crate) fn new(instance: &Arc<Instance<H>>, token: u16) -> Self {
        Self {
            instance: Arc::downgrade(instance),
            token,
        }
    }

    /// The interrupt token this handler serves.
    pub const fn token(&self) -> u16 {
        self.token
    }

    /// Services the interrupt. Never blocks.
    pub fn handle(&self) -> IrqReturn {
        match self.instance.upgrade() {
            Some(instance) => instance.handle_irq(self.token),
            None => IrqReturn::None,
        }
    }
}

impl<H: P128Hal> Clone for IrqHandler<H> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            token: self.token,
        }
    }
}

impl<W: WaitQueue> Channel<W> {
    /// Refreshes readiness from the channel's current status and wakes the
    /// waiters of every direction that became ready.
    ///
    /// Only queries status; never transfers data. If the query fails nothing is
    /// changed and [`IrqReturn::None`] is returned.
    pub fn dispatch_event<T>(&self, transport: &T) -> IrqReturn
    where
        T: ChannelTransport + ?Sized,
    {
        let status = match transport.get_status(self.instance_id(), self.index()) {
            Ok(status) => status,
            Err(err) => {
                trace!(
                    "p128 {}.{}: status query failed in irq: {}",
                    self.instance_id(),
                    self.index(),
                    err
                );
                return IrqReturn::None;
            }
        };
        if status.contains(ChannelStatus::DATA_READY) && self.rx.signal() {
            trace!("p128 {}.{}: data ready", self.instance_id(), self.index());
        }
        if status.contains(ChannelStatus::TX_EMPTY) && self.tx.signal() {
            trace!("p128 {}.{}: tx empty", self.instance_id(), self.index());
        }
        IrqReturn::Handled
    }
}

impl<H: P128Hal> Instance<H> {
    /// Resolves `token` to the channel it is bound to and services it.
    pub fn handle_irq(&self, token: u16) -> IrqReturn {
        self.channels()
            .iter()
            .find(|channel| channel.interrupt_token() == Some(token))
            .map_or(IrqReturn::None, |channel| {
                channel.dispatch_event(self.hal().transport())
            })
    }
}
