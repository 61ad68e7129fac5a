//! Single scalar values of the simulator, cached so that each of them is read
//! from the simulator at most once per tick no matter how many modules use it.
use crate::{
    managed_data_object::{ManagedData, ManagedDataObject},
    shared::SimUnit,
    simulation::from_bool,
};
use std::{cell::Cell, fmt};
use tracing::{debug, error, warn};
use uom::si::f64::*;

mod aircraft_variable;
pub use aircraft_variable::{AircraftVariable, AircraftVariableAccess, AircraftVariableSetter};

mod named_variable;
pub use named_variable::{NamedVariable, NamedVariableAccess};

/// The raw connection between a cached variable and the simulator.
pub trait SimVariableAccess {
    fn unit(&self) -> &SimUnit;

    fn index(&self) -> u32 {
        0
    }

    fn raw_read(&self) -> f64;

    /// Returns whether the simulator accepted the value.
    fn raw_write(&self, value: f64) -> bool;

    fn is_writable(&self) -> bool {
        true
    }
}

pub struct CacheableVariable<A: SimVariableAccess> {
    managed: ManagedDataObject,
    access: A,
    cached_value: Cell<Option<f64>>,
    dirty: Cell<bool>,
    epsilon: Cell<f64>,
    warn_if_dirty: Cell<bool>,
}
impl<A: SimVariableAccess> CacheableVariable<A> {
    pub fn from_access(managed: ManagedDataObject, access: A, epsilon: f64) -> Self {
        Self {
            managed,
            access,
            cached_value: Cell::new(None),
            dirty: Cell::new(false),
            epsilon: Cell::new(epsilon),
            warn_if_dirty: Cell::new(false),
        }
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    pub fn unit(&self) -> &SimUnit {
        self.access.unit()
    }

    pub fn index(&self) -> u32 {
        self.access.index()
    }

    /// Returns the cached value. Returns zero when nothing was read or set yet.
    pub fn get(&self) -> f64 {
        match self.cached_value.get() {
            Some(value) => {
                if self.dirty.get() {
                    if self.warn_if_dirty.get() {
                        warn!(variable = self.name(), value, "Reading a value not yet written to the simulator");
                    } else {
                        debug!(variable = self.name(), value, "Reading a value not yet written to the simulator");
                    }
                }
                value
            }
            None => {
                error!(variable = self.name(), "Value has not been read from or set for the simulator yet");
                0.
            }
        }
    }

    pub fn cached_value(&self) -> Option<f64> {
        self.cached_value.get()
    }

    pub fn get_as_bool(&self) -> bool {
        self.get() != 0.
    }

    pub fn get_as_i64(&self) -> i64 {
        self.get() as i64
    }

    /// Reads from the simulator when the cached value is stale and stamps the read.
    /// A value served from the cache never counts as a change.
    pub fn update_from_sim(&self, time: Time, tick: u64) -> f64 {
        if !self.managed.needs_update_from_sim(time, tick) {
            self.managed.set_changed(false);
            return self.cached_value.get().unwrap_or_default();
        }

        let value = self.read_from_sim();
        self.managed.update_stamps(time, tick);
        value
    }

    /// Reads from the simulator regardless of the staleness of the cache.
    /// Does not update the stamps.
    pub fn read_from_sim(&self) -> f64 {
        let raw = self.access.raw_read();
        let (value, changed) = match self.cached_value.get() {
            Some(cached) if (raw - cached).abs() <= self.epsilon.get() => (cached, false),
            _ => (raw, true),
        };

        self.cached_value.set(Some(value));
        self.dirty.set(false);
        self.managed.set_changed(changed);

        value
    }

    /// Sets the cached value and marks it dirty. Setting the exact cached value again
    /// does nothing.
    pub fn set(&self, value: f64) {
        if !self.access.is_writable() {
            error!(variable = self.name(), value, "Cannot set a read-only variable");
            return;
        }

        if self.cached_value.get() == Some(value) {
            return;
        }

        self.cached_value.set(Some(value));
        self.dirty.set(true);
    }

    pub fn set_as_bool(&self, value: bool) {
        self.set(from_bool(value));
    }

    pub fn set_as_i64(&self, value: i64) {
        self.set(value as f64);
    }

    pub fn write_to_sim(&self) {
        if !self.access.is_writable() {
            error!(variable = self.name(), "Cannot write a read-only variable to the simulator");
            return;
        }

        match self.cached_value.get() {
            Some(value) => {
                self.managed.set_changed(false);
                self.dirty.set(false);
                self.access.raw_write(value);
            }
            None => {
                error!(variable = self.name(), "Cannot write a variable without a value to the simulator");
            }
        }
    }

    /// Writes the cached value to the simulator when it is dirty.
    pub fn update_to_sim(&self) {
        if self.cached_value.get().is_some() && self.dirty.get() {
            self.write_to_sim();
        }
    }

    pub fn set_and_write_to_sim(&self, value: f64) {
        self.set(value);
        self.write_to_sim();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn is_writable(&self) -> bool {
        self.access.is_writable()
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon.get()
    }

    pub fn set_epsilon(&self, epsilon: f64) {
        self.epsilon.set(epsilon);
    }

    pub fn warn_if_dirty(&self) -> bool {
        self.warn_if_dirty.get()
    }

    pub fn set_warn_if_dirty(&self, warn_if_dirty: bool) {
        self.warn_if_dirty.set(warn_if_dirty);
    }
}
impl<A: SimVariableAccess> ManagedData for CacheableVariable<A> {
    fn managed(&self) -> &ManagedDataObject {
        &self.managed
    }

    fn set_auto_write(&self, auto_write: bool) {
        if auto_write && !self.access.is_writable() {
            error!(variable = self.name(), "Cannot enable automatic writing of a read-only variable");
            return;
        }

        self.managed.set_auto_write(auto_write);
    }
}
impl<A: SimVariableAccess> fmt::Display for CacheableVariable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({}) = ", self.name(), self.index(), self.unit())?;
        match self.cached_value.get() {
            Some(value) => write!(f, "{}", value)?,
            None => write!(f, "<none>")?,
        }
        if self.dirty.get() {
            write!(f, " (dirty)")?;
        }

        Ok(())
    }
}
