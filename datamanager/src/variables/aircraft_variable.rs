use super::{CacheableVariable, SimVariableAccess};
use crate::{
    events::ClientEvent,
    managed_data_object::ManagedDataObject,
    shared::{SimUnit, UpdateMode, VariableId},
    simulation::SharedHost,
};
use std::rc::Rc;
use tracing::error;
use uom::si::f64::*;

/// A variable of the simulated aircraft ("A:" variables). These are read-only
/// unless a setter is given.
pub type AircraftVariable = CacheableVariable<AircraftVariableAccess>;

/// How a value is written to an aircraft variable.
#[derive(Clone)]
pub enum AircraftVariableSetter {
    ReadOnly,
    /// Triggers the event with the value as its parameter.
    Event(Rc<ClientEvent>),
    /// Executes the key event of the given name as calculator code.
    CalculatorCode(String),
}
impl AircraftVariableSetter {
    pub fn calculator_code(event_name: impl Into<String>) -> Self {
        AircraftVariableSetter::CalculatorCode(event_name.into())
    }
}
impl Default for AircraftVariableSetter {
    fn default() -> Self {
        AircraftVariableSetter::ReadOnly
    }
}

pub struct AircraftVariableAccess {
    host: SharedHost,
    name: String,
    index: u32,
    unit: SimUnit,
    id: Option<VariableId>,
    setter: AircraftVariableSetter,
}
impl AircraftVariableAccess {
    fn new(
        host: SharedHost,
        name: &str,
        index: u32,
        unit: SimUnit,
        setter: AircraftVariableSetter,
    ) -> Self {
        let id = match host.aircraft_variable_id(name) {
            Ok(id) => Some(id),
            Err(err) => {
                error!(variable = name, %err, "Failed to resolve aircraft variable");
                None
            }
        };

        Self {
            host,
            name: name.to_owned(),
            index,
            unit,
            id,
            setter,
        }
    }

    pub fn id(&self) -> Option<VariableId> {
        self.id
    }

    pub fn setter(&self) -> &AircraftVariableSetter {
        &self.setter
    }

    fn calculator_code(&self, event_name: &str, value: f64) -> String {
        if self.index == 0 {
            format!("{} (>K:{})", value, event_name)
        } else {
            format!("{} {} (>K:2:{})", value, self.index, event_name)
        }
    }
}
impl SimVariableAccess for AircraftVariableAccess {
    fn unit(&self) -> &SimUnit {
        &self.unit
    }

    fn index(&self) -> u32 {
        self.index
    }

    fn raw_read(&self) -> f64 {
        match self.id {
            Some(id) => self.host.aircraft_variable_value(id, &self.unit, self.index),
            None => {
                error!(variable = %self.name, "Cannot read an unresolved aircraft variable");
                0.
            }
        }
    }

    fn raw_write(&self, value: f64) -> bool {
        match &self.setter {
            AircraftVariableSetter::ReadOnly => {
                error!(variable = %self.name, "Aircraft variable has no setter");
                false
            }
            AircraftVariableSetter::Event(event) => {
                if self.index == 0 {
                    event.trigger(value as u32)
                } else {
                    event.trigger_ex1([value as u32, self.index, 0, 0, 0])
                }
            }
            AircraftVariableSetter::CalculatorCode(event_name) => {
                let code = self.calculator_code(event_name, value);
                match self.host.execute_calculator_code(&code) {
                    Ok(()) => true,
                    Err(err) => {
                        error!(variable = %self.name, %code, %err, "Failed to set aircraft variable");
                        false
                    }
                }
            }
        }
    }

    fn is_writable(&self) -> bool {
        !matches!(self.setter, AircraftVariableSetter::ReadOnly)
    }
}

impl AircraftVariable {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        host: SharedHost,
        name: &str,
        index: u32,
        unit: SimUnit,
        setter: AircraftVariableSetter,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
        epsilon: f64,
    ) -> Self {
        let access = AircraftVariableAccess::new(host, name, index, unit, setter);
        let update_mode = if update_mode.auto_write && !access.is_writable() {
            error!(variable = name, "Cannot enable automatic writing of a read-only variable");
            UpdateMode::new(update_mode.auto_read, false)
        } else {
            update_mode
        };

        CacheableVariable::from_access(
            ManagedDataObject::new(name, update_mode, max_age_time, max_age_ticks),
            access,
            epsilon,
        )
    }
}
