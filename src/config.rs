use alloc::string::String;

use crate::error::{P128Error, P128Result};

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "hvcs-p128";

/// Device-tree `compatible` string matched by the driver.
pub const COMPATIBLE: &str = "sssl,hvcs-p128";

/// Firmware-node property reader (device tree or ACPI).
pub trait DeviceProperties {
    fn read_string(&self, name: &str) -> Option<&str>;
    fn read_u32(&self, name: &str) -> Option<u32>;
}

/// Per-instance configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct P128Config {
    /// Display name, also the prefix of every channel's node name.
    pub name: String,
    /// Instance id understood by the hypervisor.
    pub device_id: u32,
}

impl P128Config {
    pub fn new(name: impl Into<String>, device_id: u32) -> Self {
        Self {
            name: name.into(),
            device_id,
        }
    }

    /// Reads the `name` and `device-id` properties.
    pub fn from_properties<P>(props: &P) -> P128Result<Self>
    where
        P: DeviceProperties + ?Sized,
    {
        let name = props.read_string("name").ok_or_else(|| {
            error!("property \"name\" is not available.");
            P128Error::MissingProperty("name")
        })?;
        let device_id = props.read_u32("device-id").ok_or_else(|| {
            error!("property \"device-id\" is not available.");
            P128Error::MissingProperty("device-id")
        })?;
        Ok(Self::new(name, device_id))
    }
}

/// Whether a device-tree node with `compatible` is driven by this driver.
pub fn is_compatible(compatible: &str) -> bool {
    compatible == COMPATIBLE
}
