// Copyright 2025 The Axvisor Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! AxP128 - Guest driver core for the `hvcs-p128` hypercall channel device.
//!
//! A p128 instance is a virtual peripheral reached through hypercalls. It exposes a
//! fixed number of sub-channels, each a duplex pipe moving 128-byte frames, with
//! readiness signalled by per-channel interrupts. This crate implements the part
//! of the driver that does not depend on the host kernel: command encoding,
//! per-channel readiness and blocking I/O, interrupt dispatch, instance bring-up
//! with rollback, and device-number lookup. Everything kernel-specific is
//! delegated to an implementation of the [`P128Hal`] trait.
//!
//! # Features
//!
//! - Edge-triggered readiness per direction (data-ready, tx-empty), consumed by each transfer
//! - Independent, cancellable transfer locks for the receive and transmit directions
//! - Interrupt handler that never blocks and never transfers data
//! - All-or-nothing instance bring-up
//! - Registry of live instances addressed by device number

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate alloc;
#[macro_use]
extern crate log;

mod channel; // Per-channel readiness state and transfer locks
mod command; // Hypercall command word encoding
mod config; // Firmware-supplied instance configuration
mod driver; // Probe/remove/open entry points
mod error; // Error kinds and errno mapping
mod hal; // Platform interfaces
mod io; // Blocking frame read/write
mod irq; // Interrupt dispatch
mod lifecycle; // Instance bring-up and teardown
mod node; // Device-node file operations
mod poll; // Non-blocking readiness query
mod registry; // Live instances and device numbers
mod transport; // Hypervisor request/response contract

pub use channel::{Channel, Readiness};
pub use command::{CommandCode, CommandWord};
pub use config::{is_compatible, DeviceProperties, P128Config, COMPATIBLE, DRIVER_NAME};
pub use driver::P128Driver;
pub use error::{P128Error, P128Result, TransportError};
pub use hal::{P128Hal, WaitQueue};
pub use irq::{IrqHandler, IrqReturn};
pub use lifecycle::Instance;
pub use node::P128File;
pub use poll::PollState;
pub use registry::{
    ChannelRef, DevNum, InstanceRegistry, Reservation, BASE_MINOR, FIRST_DYNAMIC_MAJOR,
};
pub use transport::{
    ChannelStatus, ChannelTransport, Frame, HvcTransport, Hypercall, FRAME_ALIGN, FRAME_SIZE,
    OUT_OF_RANGE,
};
