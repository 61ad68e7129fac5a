use super::{CacheableVariable, SimVariableAccess};
use crate::{
    managed_data_object::ManagedDataObject,
    shared::{SimUnit, UpdateMode, VariableId},
    simulation::SharedHost,
};
use tracing::error;
use uom::si::f64::*;

/// A variable known to the simulator by name only ("L:" variables).
pub type NamedVariable = CacheableVariable<NamedVariableAccess>;

pub struct NamedVariableAccess {
    host: SharedHost,
    name: String,
    unit: SimUnit,
    id: Option<VariableId>,
}
impl NamedVariableAccess {
    fn new(host: SharedHost, name: &str, unit: SimUnit) -> Self {
        let id = match host.register_named_variable(name) {
            Ok(id) => Some(id),
            Err(err) => {
                error!(variable = name, %err, "Failed to register named variable");
                None
            }
        };

        Self {
            host,
            name: name.to_owned(),
            unit,
            id,
        }
    }

    pub fn id(&self) -> Option<VariableId> {
        self.id
    }
}
impl SimVariableAccess for NamedVariableAccess {
    fn unit(&self) -> &SimUnit {
        &self.unit
    }

    fn raw_read(&self) -> f64 {
        match self.id {
            Some(id) => self.host.named_variable_value(id, &self.unit),
            None => {
                error!(variable = %self.name, "Cannot read an unregistered named variable");
                0.
            }
        }
    }

    fn raw_write(&self, value: f64) -> bool {
        match self.id {
            Some(id) => {
                self.host.set_named_variable_value(id, value, &self.unit);
                true
            }
            None => {
                error!(variable = %self.name, "Cannot write an unregistered named variable");
                false
            }
        }
    }
}

impl NamedVariable {
    pub(crate) fn new(
        host: SharedHost,
        name: &str,
        unit: SimUnit,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
        epsilon: f64,
    ) -> Self {
        CacheableVariable::from_access(
            ManagedDataObject::new(name, update_mode, max_age_time, max_age_ticks),
            NamedVariableAccess::new(host, name, unit),
            epsilon,
        )
    }
}
