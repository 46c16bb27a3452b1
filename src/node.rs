use axerrno::{ax_err, AxResult};

use crate::hal::P128Hal;
use crate::poll::PollState;
use crate::registry::{ChannelRef, DevNum};

/// An open channel, as seen through its device node.
pub struct P128File<H: P128Hal> {
    channel: ChannelRef<H>,
}

impl<H: P128Hal> P128File<H> {
    pub(crate) fn new(channel: ChannelRef<H>) -> Self {
        Self { channel }
    }

    pub fn devnum(&self) -> DevNum {
        self.channel.devnum()
    }

    /// Reads up to one frame. See [`Channel::read`](crate::Channel::read).
    pub fn read(&self, buf: &mut [u8]) -> AxResult<usize> {
        trace!("read({}, count={})", self.devnum(), buf.len());
        let transport = self.channel.instance().hal().transport();
        Ok(self.channel.read(transport, buf)?)
    }

    /// Writes one frame. See [`Channel::write`](crate::Channel::write).
    pub fn write(&self, buf: &[u8]) -> AxResult<usize> {
        trace!("write({}, count={})", self.devnum(), buf.len());
        let transport = self.channel.instance().hal().transport();
        Ok(self.channel.write(transport, buf)?)
    }

    /// Readiness of the channel, for multiplexed waits.
    pub fn poll(&self) -> AxResult<PollState> {
        if !self.channel.is_busy() {
            return ax_err!(NotFound, "channel has been removed");
        }
        Ok(self.channel.poll())
    }

    /// Closes the file.
    pub fn release(self) {
        trace!("release({})", self.devnum());
    }
}
