use core::fmt;

use axerrno::AxError;

/// Non-zero status returned by the privileged call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportError {
    /// The raw status reported by the hypervisor.
    pub status: i64,
}

impl TransportError {
    pub const fn new(status: i64) -> Self {
        Self { status }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hypercall failed with status {}", self.status)
    }
}

/// Errors reported by the p128 driver core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum P128Error {
    /// The hypervisor rejected the instance id, or the interface count query failed.
    DeviceNotFound,
    /// The instance reported zero sub-channels.
    NoChannels,
    /// The channel is already brought up.
    ChannelBusy,
    /// An instance with the same id is already registered.
    InstanceExists,
    /// Out of memory during bring-up.
    AllocationFailure,
    /// A status, event or interrupt-token query failed.
    Transport(TransportError),
    /// A frame transfer failed. Readiness is left as it was.
    ChannelIo,
    /// No brought-up channel matches the device number.
    NoSuchChannel,
    /// A wait was aborted by the calling task's pending cancellation.
    Cancelled,
    /// A required firmware property is missing.
    MissingProperty(&'static str),
}

/// A specialized [`Result`] type for the p128 driver core.
pub type P128Result<T = ()> = Result<T, P128Error>;

impl From<TransportError> for P128Error {
    fn from(err: TransportError) -> Self {
        P128Error::Transport(err)
    }
}

impl fmt::Display for P128Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            P128Error::DeviceNotFound => write!(f, "device not found"),
            P128Error::NoChannels => write!(f, "device exposes no channels"),
            P128Error::ChannelBusy => write!(f, "channel is busy"),
            P128Error::InstanceExists => write!(f, "instance is already registered"),
            P128Error::AllocationFailure => write!(f, "out of memory"),
            P128Error::Transport(err) => write!(f, "{}", err),
            P128Error::ChannelIo => write!(f, "channel transfer failed"),
            P128Error::NoSuchChannel => write!(f, "no such channel"),
            P128Error::Cancelled => write!(f, "wait cancelled"),
            P128Error::MissingProperty(name) => write!(f, "property \"{}\" is not available", name),
        }
    }
}

impl From<P128Error> for AxError {
    fn from(err: P128Error) -> Self {
        match err {
            P128Error::DeviceNotFound | P128Error::NoChannels | P128Error::NoSuchChannel => {
                AxError::NotFound
            }
            P128Error::ChannelBusy => AxError::ResourceBusy,
            P128Error::InstanceExists => AxError::AlreadyExists,
            P128Error::AllocationFailure => AxError::NoMemory,
            P128Error::Transport(_) | P128Error::ChannelIo => AxError::Io,
            // axerrno has no "interrupted" kind.
            P128Error::Cancelled => AxError::BadState,
            P128Error::MissingProperty(_) => AxError::InvalidInput,
        }
    }
}
