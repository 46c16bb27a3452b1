//! Bring-up and teardown of instances.
//!
//! A channel is either fully up (interrupt bound, node published, marked busy)
//! or fully down. When any channel of an instance fails to come up, every channel
//! already up is torn down again before the error is returned.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::channel::Channel;
use crate::error::{P128Error, P128Result};
use crate::hal::P128Hal;
use crate::irq::IrqHandler;
use crate::registry::{DevNum, BASE_MINOR};
use crate::transport::ChannelTransport;

/// One p128 peripheral and its fixed set of channels.
pub struct Instance<H: P128Hal> {
    name: String,
    id: u32,
    major: u32,
    channels: Box<[Channel<H::WaitQueue>]>,
    hal: Arc<H>,
}

impl<H: P128Hal> Instance<H> {
    /// Discovers the channels of instance `id` and brings every one of them up.
    ///
    /// # Parameters
    ///
    /// * `hal` - The platform the instance runs on.
    /// * `name` - Display name; channel `i` is published as `<name><i>`.
    /// * `id` - The instance id understood by the hypervisor.
    /// * `major` - The device major reserved for the instance.
    ///
    /// # Returns
    ///
    /// * [`P128Error::DeviceNotFound`] if the interface count query fails.
    /// * [`P128Error::NoChannels`] if the instance has no channel.
    /// * The first channel bring-up error otherwise, after rolling back.
    pub fn bring_up(hal: Arc<H>, name: &str, id: u32, major: u32) -> P128Result<Arc<Self>> {
        let count = match hal.transport().count_interfaces(id) {
            Ok(count) => count,
            Err(err) => {
                error!("count_interfaces({}<{:#010x}>) -> {}", name, id, err);
                return Err(P128Error::DeviceNotFound);
            }
        };
        info!("{}: # of I/F = {}", name, count);
        if count == 0 {
            return Err(P128Error::NoChannels);
        }

        let mut channels = Vec::new();
        channels
            .try_reserve_exact(count as usize)
            .map_err(|_| P128Error::AllocationFailure)?;
        for index in 0..count {
            channels.push(Channel::new(
                id,
                index,
                hal.new_wait_queue(),
                hal.new_wait_queue(),
            ));
        }
        let mut owned_name = String::new();
        owned_name
            .try_reserve_exact(name.len())
            .map_err(|_| P128Error::AllocationFailure)?;
        owned_name.push_str(name);

        let instance = Arc::new(Self {
            name: owned_name,
            id,
            major,
            channels: channels.into_boxed_slice(),
            hal,
        });
        instance.register_channels()?;
        Ok(instance)
    }

    /// The display name of the instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The instance id.
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// The device major of the instance.
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Number of channels, fixed at bring-up.
    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    pub fn channels(&self) -> &[Channel<H::WaitQueue>] {
        &self.channels
    }

    pub fn channel(&self, index: u16) -> Option<&Channel<H::WaitQueue>> {
        self.channels.get(index as usize)
    }

    pub(crate) fn hal(&self) -> &H {
        &self.hal
    }

    /// The device number of channel `index`.
    pub const fn devnum(&self, index: u16) -> DevNum {
        DevNum::new(self.major, BASE_MINOR + index as u32)
    }

    /// Tears down every channel. Channels already down are skipped.
    pub fn tear_down(&self) {
        for index in 0..self.channel_count() {
            self.unregister_channel(index);
        }
    }

    fn register_channels(self: &Arc<Self>) -> P128Result {
        for index in 0..self.channel_count() {
            if let Err(err) = self.register_channel(index) {
                error!("{}: bring-up failed at {}{}: {}", self.name, self.name, index, err);
                self.tear_down();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Brings channel `index` up. On failure the channel is left exactly as it was.
    pub(crate) fn register_channel(self: &Arc<Self>, index: u16) -> P128Result {
        let Some(channel) = self.channel(index) else {
            return Err(P128Error::NoSuchChannel);
        };
        if channel.is_busy() {
            error!("{}{} is busy", self.name, index);
            return Err(P128Error::ChannelBusy);
        }

        let transport = self.hal.transport();
        let token = transport
            .get_interrupt_token(self.id, index)
            .inspect_err(|err| {
                error!("get_interrupt_token({}{}) -> {}", self.name, index, err)
            })?;
        let mut status = transport
            .get_status(self.id, index)
            .inspect_err(|err| error!("get_status({}{}) -> {}", self.name, index, err))?;
        // Edges latched before the handler is installed would otherwise be lost.
        match transport.get_event(self.id, index) {
            Ok(event) => status |= event,
            Err(err) => debug!("get_event({}{}) -> {}, using level status", self.name, index, err),
        }
        channel.seed(status);
        channel.bind_token(token);

        let devnum = self.devnum(index);
        let node = format!("{}{}", self.name, index);
        if let Err(err) = self.hal.create_node(devnum, &node) {
            error!("unable to create device {}: {}", node, err);
            channel.unbind_token();
            return Err(err);
        }
        channel.set_published(true);

        if let Err(err) = self.hal.request_irq(token, IrqHandler::new(self, token)) {
            error!("unable to request irq {} for {}: {}", token, node, err);
            self.hal.destroy_node(devnum);
            channel.set_published(false);
            channel.unbind_token();
            return Err(err);
        }
        channel.set_up();
        info!("{} is added.", node);
        Ok(())
    }

    /// Takes channel `index` down. A no-op if it is not up.
    pub(crate) fn unregister_channel(&self, index: u16) {
        let Some(channel) = self.channel(index) else {
            return;
        };
        if !channel.set_down() {
            return;
        }
        if let Some(token) = channel.interrupt_token() {
            self.hal.free_irq(token);
        }
        channel.unbind_token();
        self.hal.destroy_node(self.devnum(index));
        channel.set_published(false);
        info!("{}{} is removed.", self.name, index);
    }
}

impl<H: P128Hal> Drop for Instance<H> {
    fn drop(&mut self) {
        self.tear_down();
    }
}
