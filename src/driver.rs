use alloc::sync::Arc;

use crate::config::{DeviceProperties, P128Config};
use crate::error::{P128Error, P128Result};
use crate::hal::P128Hal;
use crate::lifecycle::Instance;
use crate::node::P128File;
use crate::registry::{DevNum, InstanceRegistry};

/// The p128 driver: every live instance plus the platform they run on.
///
/// Recommended usage:
///
/// ```ignore
/// let driver = P128Driver::new(MyHal::new());
/// driver.probe_properties(&fwnode)?;
/// let file = driver.open(DevNum::new(major, 0))?;
/// let n = file.read(&mut buf)?;
/// ```
pub struct P128Driver<H: P128Hal> {
    hal: Arc<H>,
    registry: InstanceRegistry<H>,
}

impl<H: P128Hal> P128Driver<H> {
    pub fn new(hal: H) -> Self {
        Self {
            hal: Arc::new(hal),
            registry: InstanceRegistry::new(),
        }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn registry(&self) -> &InstanceRegistry<H> {
        &self.registry
    }

    /// Brings up the instance described by `config` and registers it.
    ///
    /// The id is claimed before the hypervisor is queried, so a concurrent or
    /// repeated probe of the same id fails with [`P128Error::InstanceExists`]
    /// without side effects. A probe whose bring-up fails still consumes the
    /// major it was given.
    pub fn probe(&self, config: &P128Config) -> P128Result<Arc<Instance<H>>> {
        let reservation = self.registry.reserve(config.device_id).inspect_err(|_| {
            warn!("{}<{:#010x}> is already registered", config.name, config.device_id)
        })?;
        let major = self.registry.allocate_major();
        let instance =
            Instance::bring_up(self.hal.clone(), &config.name, config.device_id, major)?;
        reservation.commit(instance.clone());
        info!(
            "{}<{:#010x}>: {} channels at major {}",
            instance.name(),
            instance.id(),
            instance.channel_count(),
            major
        );
        Ok(instance)
    }

    /// Reads the instance configuration from firmware properties, then probes it.
    pub fn probe_properties<P>(&self, props: &P) -> P128Result<Arc<Instance<H>>>
    where
        P: DeviceProperties + ?Sized,
    {
        self.probe(&P128Config::from_properties(props)?)
    }

    /// Unregisters instance `id` and tears it down.
    pub fn remove(&self, id: u32) -> P128Result {
        let instance = self.registry.remove(id).ok_or(P128Error::DeviceNotFound)?;
        instance.tear_down();
        Ok(())
    }

    /// Unregisters and tears down every instance.
    pub fn remove_all(&self) {
        for instance in self.registry.take_all() {
            instance.tear_down();
        }
    }

    /// Opens the channel published at `devnum`.
    pub fn open(&self, devnum: DevNum) -> P128Result<P128File<H>> {
        let channel = self.registry.resolve(devnum)?;
        debug!("open {} -> {}{}", devnum, channel.instance().name(), channel.index());
        Ok(P128File::new(channel))
    }
}

impl<H: P128Hal> Drop for P128Driver<H> {
    fn drop(&mut self) {
        self.remove_all();
    }
}
