use crate::error::P128Result;
use crate::irq::IrqHandler;
use crate::registry::DevNum;
use crate::transport::ChannelTransport;

/// A queue of tasks sleeping until some condition holds.
///
/// Implementations must evaluate `condition` under the queue's own lock and take
/// that lock in [`notify_all`](WaitQueue::notify_all) as well, so a wake issued
/// after the condition became true is never lost.
pub trait WaitQueue: Send + Sync {
    /// Blocks the current task until `condition` returns `true`.
    ///
    /// Returns `Ok(())` as soon as `condition` returns `true`; the condition is not
    /// evaluated again afterwards. Returns [`P128Error::Cancelled`] if the task is
    /// cancelled while blocked.
    ///
    /// [`P128Error::Cancelled`]: crate::P128Error::Cancelled
    fn wait_until<F>(&self, condition: F) -> P128Result
    where
        F: FnMut() -> bool;

    /// Wakes every task blocked on this queue.
    ///
    /// Must be callable from interrupt context.
    fn notify_all(&self);
}

/// The interfaces which the underlying kernel must implement.
pub trait P128Hal: Send + Sync + Sized + 'static {
    /// The hypercall transport used by every instance.
    type Transport: ChannelTransport;
    /// The blocking facility used by channel readers and writers.
    type WaitQueue: WaitQueue;

    /// Returns the hypercall transport.
    fn transport(&self) -> &Self::Transport;

    /// Creates an empty wait queue.
    fn new_wait_queue(&self) -> Self::WaitQueue;

    /// Routes the interrupt identified by `token` to `handler`.
    ///
    /// # Parameters
    ///
    /// * `token` - The interrupt token reported by the hypervisor for the channel.
    /// * `handler` - The dispatcher to invoke from interrupt context.
    fn request_irq(&self, token: u16, handler: IrqHandler<Self>) -> P128Result;

    /// Releases an interrupt previously bound with [`request_irq`](P128Hal::request_irq).
    fn free_irq(&self, token: u16);

    /// Publishes the device node `name` for `devnum`.
    fn create_node(&self, devnum: DevNum, name: &str) -> P128Result;

    /// Removes the device node published for `devnum`.
    fn destroy_node(&self, devnum: DevNum);
}
