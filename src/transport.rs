use memory_addr::{is_aligned, VirtAddr};

use crate::command::{CommandCode, CommandWord};
use crate::error::TransportError;

/// Size of every data transfer, in bytes.
pub const FRAME_SIZE: usize = 128;

/// Alignment the hypervisor expects for frame buffers.
pub const FRAME_ALIGN: usize = 8;

bitflags::bitflags! {
    /// Per-channel status bits reported by `GS` and `GE`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ChannelStatus: u32 {
        /// The receive buffer holds a frame.
        const DATA_READY = 1 << 0;
        /// The send buffer is free.
        const TX_EMPTY = 1 << 1;
    }
}

/// A frame-sized buffer with the alignment required by the hypervisor.
#[repr(C, align(8))]
pub struct Frame(pub [u8; FRAME_SIZE]);

impl Frame {
    pub const fn zeroed() -> Self {
        Self([0; FRAME_SIZE])
    }
}

/// The request/response contract of the p128 hypervisor interface.
///
/// Every operation either completes in full or fails with the status reported by
/// the privileged call; there is no partial success.
pub trait ChannelTransport: Send + Sync {
    /// Number of sub-channels exposed by the instance.
    fn count_interfaces(&self, instance_id: u32) -> Result<u16, TransportError>;

    /// Interrupt token bound to a sub-channel.
    fn get_interrupt_token(&self, instance_id: u32, channel: u16) -> Result<u16, TransportError>;

    /// Current level status of a sub-channel.
    fn get_status(&self, instance_id: u32, channel: u16) -> Result<ChannelStatus, TransportError>;

    /// Status edges latched since the previous `get_event`.
    fn get_event(&self, instance_id: u32, channel: u16) -> Result<ChannelStatus, TransportError>;

    /// Sends exactly one frame.
    fn send(
        &self,
        instance_id: u32,
        channel: u16,
        frame: &[u8; FRAME_SIZE],
    ) -> Result<(), TransportError>;

    /// Receives exactly one frame.
    fn receive(
        &self,
        instance_id: u32,
        channel: u16,
        frame: &mut [u8; FRAME_SIZE],
    ) -> Result<(), TransportError>;
}

/// The privileged call itself, usually a few lines of assembly around `hvc`.
pub trait Hypercall: Send + Sync {
    /// Issues a query command (`NI`, `GI`, `GS` or `GE`) and returns the value
    /// register on success.
    fn query(&self, cmd: CommandWord) -> Result<u64, TransportError>;

    /// Issues a frame command (`WR` or `RD`) with the guest address of the frame.
    ///
    /// # Safety
    ///
    /// `frame` must point to [`FRAME_SIZE`] bytes aligned to [`FRAME_ALIGN`] that stay
    /// valid for the whole call: readable for `WR`, writable for `RD`.
    unsafe fn transfer(&self, cmd: CommandWord, frame: VirtAddr) -> Result<(), TransportError>;
}

/// Status reported when a value register does not fit its 16-bit field.
pub const OUT_OF_RANGE: i64 = -34;

fn narrow(value: u64) -> Result<u16, TransportError> {
    u16::try_from(value).map_err(|_| {
        warn!("hypercall value {:#x} does not fit in 16 bits", value);
        TransportError::new(OUT_OF_RANGE)
    })
}

/// [`ChannelTransport`] over a raw [`Hypercall`].
pub struct HvcTransport<C: Hypercall> {
    hvc: C,
}

impl<C: Hypercall> HvcTransport<C> {
    pub const fn new(hvc: C) -> Self {
        Self { hvc }
    }

    pub fn hypercall(&self) -> &C {
        &self.hvc
    }

    fn query(&self, instance_id: u32, code: CommandCode, channel: u16) -> Result<u64, TransportError> {
        self.hvc.query(CommandWord::encode(instance_id, code, channel))
    }
}

impl<C: Hypercall> ChannelTransport for HvcTransport<C> {
    fn count_interfaces(&self, instance_id: u32) -> Result<u16, TransportError> {
        self.query(instance_id, CommandCode::CountInterfaces, 0)
            .and_then(narrow)
    }

    fn get_interrupt_token(&self, instance_id: u32, channel: u16) -> Result<u16, TransportError> {
        self.query(instance_id, CommandCode::GetInterruptToken, channel)
            .and_then(narrow)
    }

    fn get_status(&self, instance_id: u32, channel: u16) -> Result<ChannelStatus, TransportError> {
        self.query(instance_id, CommandCode::GetStatus, channel)
            .map(|v| ChannelStatus::from_bits_retain(v as u32))
    }

    fn get_event(&self, instance_id: u32, channel: u16) -> Result<ChannelStatus, TransportError> {
        self.query(instance_id, CommandCode::GetEvent, channel)
            .map(|v| ChannelStatus::from_bits_retain(v as u32))
    }

    fn send(
        &self,
        instance_id: u32,
        channel: u16,
        frame: &[u8; FRAME_SIZE],
    ) -> Result<(), TransportError> {
        let cmd = CommandWord::encode(instance_id, CommandCode::Write, channel);
        let addr = frame.as_ptr() as usize;
        if is_aligned(addr, FRAME_ALIGN) {
            // SAFETY: `frame` is a live, aligned FRAME_SIZE buffer borrowed for the call.
            unsafe { self.hvc.transfer(cmd, VirtAddr::from(addr)) }
        } else {
            let bounce = Frame(*frame);
            // SAFETY: `bounce` is aligned by construction and outlives the call.
            unsafe { self.hvc.transfer(cmd, VirtAddr::from(bounce.0.as_ptr() as usize)) }
        }
    }

    fn receive(
        &self,
        instance_id: u32,
        channel: u16,
        frame: &mut [u8; FRAME_SIZE],
    ) -> Result<(), TransportError> {
        let cmd = CommandWord::encode(instance_id, CommandCode::Read, channel);
        let addr = frame.as_mut_ptr() as usize;
        if is_aligned(addr, FRAME_ALIGN) {
            // SAFETY: `frame` is a live, aligned FRAME_SIZE buffer mutably borrowed for the call.
            unsafe { self.hvc.transfer(cmd, VirtAddr::from(addr)) }
        } else {
            let mut bounce = Frame::zeroed();
            // SAFETY: `bounce` is aligned by construction and outlives the call.
            unsafe {
                self.hvc
                    .transfer(cmd, VirtAddr::from(bounce.0.as_mut_ptr() as usize))?
            };
            frame.copy_from_slice(&bounce.0);
            Ok(())
        }
    }
}
