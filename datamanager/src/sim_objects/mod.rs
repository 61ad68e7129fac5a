//! Data exchanged with the simulator through asynchronous requests, answered
//! later through the dispatch queue.
use crate::{
    managed_data_object::{ManagedData, ManagedDataObject},
    shared::{DefinitionId, RequestId, UpdateMode},
    simulation::{SharedHost, SimDataMessage},
};
use std::{
    cell::{Cell, RefCell},
    mem, ptr, slice,
};
use tracing::trace;
use uom::si::f64::*;

mod client_data_area;
pub use client_data_area::ClientDataAreaVariable;

mod client_data_buffered_area;
pub use client_data_buffered_area::{ClientDataBufferedAreaVariable, StreamState};

mod data_definition;
pub use data_definition::{DataDefinition, DataDefinitionVariable, SimDataType};

/// When the staleness stamps of a sim object are updated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StampPolicy {
    /// Stamp when the request is sent. A request which is never answered still
    /// counts as an update, preventing a request on every tick.
    OnRequest,
    /// Stamp only when changed data is applied.
    OnCompletion,
}
impl Default for StampPolicy {
    fn default() -> Self {
        StampPolicy::OnRequest
    }
}

/// Plain old data which can be exchanged with the simulator as raw bytes.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or primitives), contain no padding, no
/// pointers or references, and every bit pattern must be a valid value.
pub unsafe trait SimData: Copy + Default + 'static {
    fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self as *const Self as *const u8, mem::size_of::<Self>()) }
    }

    fn copy_from_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(
            bytes.len(),
            mem::size_of::<Self>(),
            "Cannot copy {} bytes into a type of {} bytes",
            bytes.len(),
            mem::size_of::<Self>()
        );
        unsafe {
            ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self as *mut Self as *mut u8,
                mem::size_of::<Self>(),
            )
        }
    }
}

unsafe impl SimData for u8 {}
unsafe impl SimData for i32 {}
unsafe impl SimData for u32 {}
unsafe impl SimData for i64 {}
unsafe impl SimData for u64 {}
unsafe impl SimData for f32 {}
unsafe impl SimData for f64 {}
unsafe impl<T: SimData, const N: usize> SimData for [T; N] where [T; N]: Default {}

/// The identity and staleness state shared by all sim objects.
pub struct SimObjectBase {
    host: SharedHost,
    managed: ManagedDataObject,
    definition_id: DefinitionId,
    request_id: RequestId,
    stamp_policy: Cell<StampPolicy>,
}
impl SimObjectBase {
    pub fn new(
        host: SharedHost,
        name: &str,
        definition_id: DefinitionId,
        request_id: RequestId,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Self {
        Self {
            host,
            managed: ManagedDataObject::new(name, update_mode, max_age_time, max_age_ticks),
            definition_id,
            request_id,
            stamp_policy: Cell::new(StampPolicy::default()),
        }
    }

    pub fn host(&self) -> &SharedHost {
        &self.host
    }

    pub fn managed(&self) -> &ManagedDataObject {
        &self.managed
    }

    pub fn definition_id(&self) -> DefinitionId {
        self.definition_id
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn stamp_policy(&self) -> StampPolicy {
        self.stamp_policy.get()
    }

    pub fn set_stamp_policy(&self, stamp_policy: StampPolicy) {
        self.stamp_policy.set(stamp_policy);
    }

    /// Applies received bytes when they differ from the current bytes (or when
    /// change checking is skipped). Returns whether the data changed.
    fn apply_if_changed<T: SimData>(
        &self,
        data: &RefCell<T>,
        incoming: &[u8],
        time: Time,
        tick: u64,
    ) -> bool {
        let changed = self.managed.skip_change_check() || incoming != data.borrow().as_bytes();
        if changed {
            data.borrow_mut().copy_from_bytes(incoming);
            self.managed.update_stamps(time, tick);
            trace!(object = self.managed.name(), "Data has changed");
        }

        self.managed.set_changed(changed);
        changed
    }
}

/// A variable whose data is requested from the simulator and received later
/// through the dispatch queue.
pub trait SimObject: ManagedData {
    fn base(&self) -> &SimObjectBase;

    /// Requests the data once, regardless of its staleness.
    fn request_data_from_sim(&self) -> bool;

    /// Called with the answer to a request of this object.
    fn process_sim_data(&self, message: &SimDataMessage, time: Time, tick: u64);

    fn write_data_to_sim(&self) -> bool;

    fn definition_id(&self) -> DefinitionId {
        self.base().definition_id()
    }

    fn request_id(&self) -> RequestId {
        self.base().request_id()
    }

    fn stamp_policy(&self) -> StampPolicy {
        self.base().stamp_policy()
    }

    fn set_stamp_policy(&self, stamp_policy: StampPolicy) {
        self.base().set_stamp_policy(stamp_policy);
    }

    /// Requests the data when it is stale. Returns true without a request when
    /// it is not.
    fn request_update_from_sim(&self, time: Time, tick: u64) -> bool {
        if !self.needs_update_from_sim(time, tick) {
            trace!(object = self.name(), "Not requesting update as data is not stale");
            return true;
        }

        if self.stamp_policy() == StampPolicy::OnRequest {
            self.managed().update_stamps(time, tick);
        }

        self.request_data_from_sim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Position {
        latitude: f64,
        longitude: f64,
    }
    unsafe impl SimData for Position {}

    #[test]
    fn bytes_of_a_struct_are_its_fields_in_order() {
        let position = Position {
            latitude: 1.5,
            longitude: -2.5,
        };

        let mut expected = 1.5f64.to_ne_bytes().to_vec();
        expected.extend_from_slice(&(-2.5f64).to_ne_bytes());

        assert_eq!(position.as_bytes(), expected.as_slice());
    }

    #[test]
    fn copying_bytes_overwrites_the_struct() {
        let source = Position {
            latitude: 51.5,
            longitude: 4.2,
        };
        let mut target = Position::default();

        target.copy_from_bytes(source.as_bytes());

        assert_eq!(target, source);
    }

    #[test]
    #[should_panic]
    fn copying_bytes_of_the_wrong_size_panics() {
        let mut target = Position::default();

        target.copy_from_bytes(&[0; 8]);
    }

    #[test]
    fn arrays_are_sim_data() {
        let values: [u32; 3] = [1, 2, 3];

        assert_eq!(values.as_bytes().len(), 12);
    }
}
