use alloc::collections::{BTreeMap, BTreeSet};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Deref;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::Mutex;

use crate::channel::Channel;
use crate::error::{P128Error, P128Result};
use crate::hal::P128Hal;
use crate::lifecycle::Instance;

/// Minor number of channel 0 of every instance.
pub const BASE_MINOR: u32 = 0;

/// The first major handed out by [`InstanceRegistry::allocate_major`].
pub const FIRST_DYNAMIC_MAJOR: u32 = 240;

/// A device number: the instance's major plus the channel's minor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevNum {
    pub major: u32,
    pub minor: u32,
}

impl DevNum {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for DevNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// A resolved channel. Keeps its instance alive while held.
pub struct ChannelRef<H: P128Hal> {
    instance: Arc<Instance<H>>,
    index: u16,
}

impl<H: P128Hal> ChannelRef<H> {
    pub fn instance(&self) -> &Arc<Instance<H>> {
        &self.instance
    }

    pub fn devnum(&self) -> DevNum {
        self.instance.devnum(self.index)
    }
}

impl<H: P128Hal> Deref for ChannelRef<H> {
    type Target = Channel<H::WaitQueue>;

    fn deref(&self) -> &Self::Target {
        // `index` was range-checked in `InstanceRegistry::resolve`.
        &self.instance.channels()[self.index as usize]
    }
}

struct Slots<H: P128Hal> {
    live: BTreeMap<u32, Arc<Instance<H>>>,
    // Ids being brought up; not yet resolvable.
    pending: BTreeSet<u32>,
}

/// The set of live instances, keyed by instance id.
///
/// An id is claimed with [`reserve`](Self::reserve) before its instance is
/// brought up, so at most one instance per id ever touches the hypervisor.
pub struct InstanceRegistry<H: P128Hal> {
    slots: Mutex<Slots<H>>,
    next_major: AtomicU32,
}

/// An instance id claimed for bring-up.
///
/// Dropping it without [`commit`](Self::commit) releases the id again.
pub struct Reservation<'a, H: P128Hal> {
    registry: &'a InstanceRegistry<H>,
    id: u32,
}

impl<H: P128Hal> Reservation<'_, H> {
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Publishes the brought-up instance under the reserved id.
    pub fn commit(self, instance: Arc<Instance<H>>) {
        debug_assert_eq!(instance.id(), self.id);
        let mut slots = self.registry.slots.lock();
        slots.pending.remove(&self.id);
        slots.live.insert(self.id, instance);
    }
}

impl<H: P128Hal> Drop for Reservation<'_, H> {
    fn drop(&mut self) {
        self.registry.slots.lock().pending.remove(&self.id);
    }
}

impl<H: P128Hal> InstanceRegistry<H> {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                live: BTreeMap::new(),
                pending: BTreeSet::new(),
            }),
            next_major: AtomicU32::new(FIRST_DYNAMIC_MAJOR),
        }
    }

    /// Reserves a fresh device major. Majors are never reused, so one taken by a
    /// probe whose bring-up fails stays consumed.
    pub fn allocate_major(&self) -> u32 {
        self.next_major.fetch_add(1, Ordering::Relaxed)
    }

    /// Whether a live instance is registered under `id`.
    pub fn contains(&self, id: u32) -> bool {
        self.slots.lock().live.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<Arc<Instance<H>>> {
        self.slots.lock().live.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().live.is_empty()
    }

    /// Claims `id` for bring-up.
    ///
    /// Fails with [`P128Error::InstanceExists`] if `id` is live or already
    /// being brought up.
    pub fn reserve(&self, id: u32) -> P128Result<Reservation<'_, H>> {
        let mut slots = self.slots.lock();
        if slots.live.contains_key(&id) || !slots.pending.insert(id) {
            return Err(P128Error::InstanceExists);
        }
        Ok(Reservation { registry: self, id })
    }

    /// Unregisters instance `id`, handing it back for teardown.
    pub fn remove(&self, id: u32) -> Option<Arc<Instance<H>>> {
        self.slots.lock().live.remove(&id)
    }

    /// Unregisters every instance.
    pub fn take_all(&self) -> Vec<Arc<Instance<H>>> {
        let live = core::mem::take(&mut self.slots.lock().live);
        live.into_values().collect()
    }

    /// Resolves a device number to an up channel.
    pub fn resolve(&self, devnum: DevNum) -> P128Result<ChannelRef<H>> {
        let slots = self.slots.lock();
        let instance = slots
            .live
            .values()
            .find(|instance| instance.major() == devnum.major)
            .ok_or(P128Error::NoSuchChannel)?;
        let index = devnum
            .minor
            .checked_sub(BASE_MINOR)
            .and_then(|n| u16::try_from(n).ok())
            .filter(|&n| n < instance.channel_count())
            .ok_or(P128Error::NoSuchChannel)?;
        if !instance.channels()[index as usize].is_busy() {
            return Err(P128Error::NoSuchChannel);
        }
        Ok(ChannelRef {
            instance: instance.clone(),
            index,
        })
    }
}

impl<H: P128Hal> Default for InstanceRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
