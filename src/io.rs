//! Blocking frame transfers on a single channel.
//!
//! Every call moves exactly one [`FRAME_SIZE`] frame. A short read returns the
//! head of the frame and discards the rest; a short write is zero-padded. Longer
//! buffers are not split across frames: a read fills at most `FRAME_SIZE` bytes
//! and a write reports `FRAME_SIZE` bytes written.

use crate::channel::Channel;
use crate::error::{P128Error, P128Result};
use crate::hal::WaitQueue;
use crate::transport::{ChannelTransport, Frame, FRAME_SIZE};

impl<W: WaitQueue> Channel<W> {
    /// Reads one frame into `buf`, blocking until the channel has data.
    ///
    /// Concurrent readers of the same channel are served one at a time. Returns
    /// the number of bytes copied, which is `min(buf.len(), FRAME_SIZE)`.
    ///
    /// On [`P128Error::ChannelIo`] or [`P128Error::Cancelled`] the data-ready state
    /// is unchanged, so a retry waits for the same event again.
    pub fn read<T>(&self, transport: &T, buf: &mut [u8]) -> P128Result<usize>
    where
        T: ChannelTransport + ?Sized,
    {
        if buf.is_empty() {
            return Ok(0);
        }
        let guard = self.rx.lock(self.alive())?;
        self.rx.wait_ready(&guard, self.alive())?;
        self.rx.consume();

        let (id, index) = (self.instance_id(), self.index());
        let result = match buf.first_chunk_mut::<FRAME_SIZE>() {
            Some(frame) => transport.receive(id, index, frame).map(|()| FRAME_SIZE),
            None => {
                let mut scratch = Frame::zeroed();
                transport.receive(id, index, &mut scratch.0).map(|()| {
                    let len = buf.len();
                    buf.copy_from_slice(&scratch.0[..len]);
                    len
                })
            }
        };

        match result {
            Ok(len) => {
                debug!("p128 {}.{}: read {} bytes", id, index, len);
                Ok(len)
            }
            Err(err) => {
                self.rx.restore();
                warn!("p128 {}.{}: receive failed: {}", id, index, err);
                Err(P128Error::ChannelIo)
            }
        }
    }

    /// Writes `buf` as one frame, blocking until the channel's send buffer is free.
    ///
    /// A buffer shorter than [`FRAME_SIZE`] is zero-padded; only the first
    /// `FRAME_SIZE` bytes of a longer one are sent. Returns the number of bytes
    /// taken from `buf`.
    pub fn write<T>(&self, transport: &T, buf: &[u8]) -> P128Result<usize>
    where
        T: ChannelTransport + ?Sized,
    {
        if buf.is_empty() {
            return Ok(0);
        }
        let guard = self.tx.lock(self.alive())?;
        self.tx.wait_ready(&guard, self.alive())?;
        self.tx.consume();

        let (id, index) = (self.instance_id(), self.index());
        let result = match buf.first_chunk::<FRAME_SIZE>() {
            Some(frame) => transport.send(id, index, frame).map(|()| FRAME_SIZE),
            None => {
                let mut padded = Frame::zeroed();
                padded.0[..buf.len()].copy_from_slice(buf);
                transport.send(id, index, &padded.0).map(|()| buf.len())
            }
        };

        match result {
            Ok(len) => {
                debug!("p128 {}.{}: wrote {} bytes", id, index, len);
                Ok(len)
            }
            Err(err) => {
                self.tx.restore();
                warn!("p128 {}.{}: send failed: {}", id, index, err);
                Err(P128Error::ChannelIo)
            }
        }
    }
}
