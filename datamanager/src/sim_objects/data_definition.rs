use super::{SimData, SimObject, SimObjectBase};
use crate::{
    managed_data_object::{ManagedData, ManagedDataObject},
    shared::{DefinitionId, RequestId, SimUnit, UpdateMode},
    simulation::{SharedHost, SimDataMessage, SimObjectPeriod},
};
use itertools::Itertools;
use std::{
    cell::{Ref, RefCell, RefMut},
    fmt, mem,
};
use tracing::{debug, error, trace};
use uom::si::f64::*;

/// The type the simulator delivers a field of a data definition as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimDataType {
    Int32,
    Int64,
    Float32,
    Float64,
    String8,
    String32,
    String64,
    String128,
    String256,
    String260,
}
impl SimDataType {
    pub fn size(&self) -> usize {
        match self {
            SimDataType::Int32 | SimDataType::Float32 => 4,
            SimDataType::Int64 | SimDataType::Float64 | SimDataType::String8 => 8,
            SimDataType::String32 => 32,
            SimDataType::String64 => 64,
            SimDataType::String128 => 128,
            SimDataType::String256 => 256,
            SimDataType::String260 => 260,
        }
    }
}

/// A simulator variable as a field of a data definition.
#[derive(Clone, Debug, PartialEq)]
pub struct DataDefinition {
    pub name: String,
    pub index: u32,
    pub unit: SimUnit,
    pub data_type: SimDataType,
    pub epsilon: f32,
}
impl DataDefinition {
    pub fn new(name: impl Into<String>, index: u32, unit: SimUnit) -> Self {
        Self {
            name: name.into(),
            index,
            unit,
            data_type: SimDataType::Float64,
            epsilon: 0.,
        }
    }

    pub fn data_type(mut self, data_type: SimDataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// The name as the simulator expects it, including a non-zero index.
    pub fn full_name(&self) -> String {
        if self.index == 0 {
            self.name.clone()
        } else {
            format!("{}:{}", self.name, self.index)
        }
    }
}
impl fmt::Display for DataDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {:?})", self.full_name(), self.unit, self.data_type)
    }
}

/// A group of simulator variables of the user aircraft, exchanged with the
/// simulator as one `T`. The fields of `T` must match the data definitions in
/// order and size.
pub struct DataDefinitionVariable<T: SimData> {
    base: SimObjectBase,
    definitions: Vec<DataDefinition>,
    data: RefCell<T>,
}
impl<T: SimData> DataDefinitionVariable<T> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        host: SharedHost,
        name: &str,
        definitions: Vec<DataDefinition>,
        definition_id: DefinitionId,
        request_id: RequestId,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Self {
        let definitions_size: usize = definitions.iter().map(|d| d.data_type.size()).sum();
        assert_eq!(
            definitions_size,
            mem::size_of::<T>(),
            "The data definitions of {} describe {} bytes, while the data type has {} bytes",
            name,
            definitions_size,
            mem::size_of::<T>()
        );

        for definition in &definitions {
            if let Err(err) = host.add_to_data_definition(definition_id, definition) {
                error!(object = name, field = %definition, %err, "Failed to add field to data definition");
            }
        }

        Self {
            base: SimObjectBase::new(
                host,
                name,
                definition_id,
                request_id,
                update_mode,
                max_age_time,
                max_age_ticks,
            ),
            definitions,
            data: RefCell::new(T::default()),
        }
    }

    pub fn definitions(&self) -> &[DataDefinition] {
        &self.definitions
    }

    pub fn data(&self) -> Ref<'_, T> {
        self.data.borrow()
    }

    pub fn data_mut(&self) -> RefMut<'_, T> {
        self.data.borrow_mut()
    }

    /// Replaces the data. Does not write it to the simulator.
    pub fn set_data(&self, data: T) {
        *self.data.borrow_mut() = data;
    }

    /// Requests the simulator to send the data with the given period. Not allowed
    /// while the data is read automatically.
    pub fn request_periodic_data_from_sim(&self, period: SimObjectPeriod) -> bool {
        if self.is_auto_read() && period > SimObjectPeriod::Never {
            error!(object = self.name(), ?period, "Periodic request ignored as the data is read automatically");
            return false;
        }

        self.request(period)
    }

    fn request(&self, period: SimObjectPeriod) -> bool {
        match self.base.host().request_data_on_sim_object(
            self.base.request_id(),
            self.base.definition_id(),
            period,
        ) {
            Ok(()) => true,
            Err(err) => {
                error!(object = self.name(), ?period, %err, "Failed to request data from the simulator");
                false
            }
        }
    }
}
impl<T: SimData> ManagedData for DataDefinitionVariable<T> {
    fn managed(&self) -> &ManagedDataObject {
        self.base.managed()
    }
}
impl<T: SimData> SimObject for DataDefinitionVariable<T> {
    fn base(&self) -> &SimObjectBase {
        &self.base
    }

    fn request_data_from_sim(&self) -> bool {
        self.request(SimObjectPeriod::Once)
    }

    fn process_sim_data(&self, message: &SimDataMessage, time: Time, tick: u64) {
        assert_eq!(
            message.request_id,
            self.base.request_id(),
            "Data of request {} was passed to {}",
            message.request_id,
            self.name()
        );
        assert_eq!(
            message.define_count as usize,
            self.definitions.len(),
            "Received {} fields for {}, which has {} data definitions",
            message.define_count,
            self.name(),
            self.definitions.len()
        );
        assert!(
            message.data.len() >= mem::size_of::<T>(),
            "Received {} bytes for {}, which needs {} bytes",
            message.data.len(),
            self.name(),
            mem::size_of::<T>()
        );

        trace!(object = self.name(), "Received data");
        let incoming = &message.data[..mem::size_of::<T>()];
        self.base.apply_if_changed(&self.data, incoming, time, tick);
    }

    fn write_data_to_sim(&self) -> bool {
        let data = *self.data.borrow();
        match self
            .base
            .host()
            .set_data_on_sim_object(self.base.definition_id(), data.as_bytes())
        {
            Ok(()) => true,
            Err(err) => {
                error!(object = self.name(), definition = self.base.definition_id(), %err, "Failed to write data to the simulator");
                false
            }
        }
    }
}
impl<T: SimData> Drop for DataDefinitionVariable<T> {
    fn drop(&mut self) {
        debug!(object = self.name(), "Clearing data definition");
        if let Err(err) = self
            .base
            .host()
            .clear_data_definition(self.base.definition_id())
        {
            error!(object = self.name(), %err, "Failed to clear data definition");
        }
    }
}
impl<T: SimData> fmt::Display for DataDefinitionVariable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (definition {}, request {}, {} bytes): {}",
            self.managed(),
            self.base.definition_id(),
            self.base.request_id(),
            mem::size_of::<T>(),
            self.definitions.iter().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sim_objects::StampPolicy,
        simulation::test::{capture_logs, TestSimulatorHost},
    };
    use ntest::assert_about_eq;
    use std::{cell::Cell, rc::Rc};
    use uom::si::time::second;

    const DEFINITION_ID: DefinitionId = 5;
    const REQUEST_ID: RequestId = 8;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Lights {
        beacon: f64,
        strobe: f64,
    }
    unsafe impl SimData for Lights {}

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Attitude {
        pitch: f64,
        bank: f64,
        heading: f64,
    }
    unsafe impl SimData for Attitude {}

    fn seconds(value: f64) -> Time {
        Time::new::<second>(value)
    }

    fn lights_definitions() -> Vec<DataDefinition> {
        vec![
            DataDefinition::new("LIGHT BEACON", 0, SimUnit::BOOL),
            DataDefinition::new("LIGHT STROBE", 0, SimUnit::BOOL),
        ]
    }

    fn lights_variable(
        host: &Rc<TestSimulatorHost>,
        update_mode: UpdateMode,
    ) -> DataDefinitionVariable<Lights> {
        DataDefinitionVariable::new(
            host.clone(),
            "LIGHTS",
            lights_definitions(),
            DEFINITION_ID,
            REQUEST_ID,
            update_mode,
            seconds(0.),
            0,
        )
    }

    fn message(lights: Lights) -> SimDataMessage {
        SimDataMessage {
            request_id: REQUEST_ID,
            define_count: 2,
            data: lights.as_bytes().to_vec(),
        }
    }

    #[test]
    fn fields_are_added_to_the_data_definition_in_order() {
        let host = Rc::new(TestSimulatorHost::new());

        let _variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);

        assert_eq!(host.data_definition(DEFINITION_ID), lights_definitions());
    }

    #[test]
    fn indexed_field_name_contains_the_index() {
        let definition = DataDefinition::new("GENERAL ENG N1", 2, SimUnit::PERCENT);

        assert_eq!(definition.full_name(), "GENERAL ENG N1:2");
    }

    #[test]
    #[should_panic]
    fn fewer_definitions_than_fields_fails_construction() {
        let host = Rc::new(TestSimulatorHost::new());

        let _variable: DataDefinitionVariable<Attitude> = DataDefinitionVariable::new(
            host.clone(),
            "ATTITUDE",
            vec![
                DataDefinition::new("PLANE PITCH DEGREES", 0, SimUnit::DEGREES),
                DataDefinition::new("PLANE BANK DEGREES", 0, SimUnit::DEGREES),
            ],
            DEFINITION_ID,
            REQUEST_ID,
            UpdateMode::NO_AUTO_UPDATE,
            seconds(0.),
            0,
        );
    }

    #[test]
    fn changed_data_is_applied_and_stamped() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        let lights = Lights {
            beacon: 1.,
            strobe: 0.,
        };

        variable.process_sim_data(&message(lights), seconds(2.), 3);

        assert!(variable.has_changed());
        assert_eq!(*variable.data(), lights);
        assert_eq!(variable.managed().tick_stamp(), Some(3));
    }

    #[test]
    fn unchanged_data_is_not_a_change_and_keeps_the_stamps() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        let lights = Lights {
            beacon: 1.,
            strobe: 1.,
        };
        variable.process_sim_data(&message(lights), seconds(1.), 1);

        variable.process_sim_data(&message(lights), seconds(2.), 2);

        assert!(!variable.has_changed());
        assert_eq!(variable.managed().tick_stamp(), Some(1));
    }

    #[test]
    fn unchanged_data_after_request_leaves_stamps_at_their_pre_request_values() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        variable.set_stamp_policy(StampPolicy::OnCompletion);

        assert!(variable.request_update_from_sim(seconds(1.), 1));
        variable.process_sim_data(&message(Lights::default()), seconds(1.), 1);

        assert!(!variable.has_changed());
        assert_eq!(variable.managed().stamp(), None);
    }

    #[test]
    fn request_stamps_before_the_answer_by_default() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);

        variable.request_update_from_sim(seconds(1.), 1);

        assert_eq!(variable.managed().tick_stamp(), Some(1));
        assert_eq!(
            host.sim_object_requests(),
            vec![(REQUEST_ID, DEFINITION_ID, SimObjectPeriod::Once)]
        );
    }

    #[test]
    fn data_that_is_not_stale_is_not_requested() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);

        variable.request_update_from_sim(seconds(1.), 1);
        assert!(variable.request_update_from_sim(seconds(1.), 1));

        assert_eq!(host.sim_object_requests().len(), 1);
    }

    #[test]
    fn skipping_the_change_check_always_signals_a_change() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        variable.set_skip_change_check(true);
        let changes = Rc::new(Cell::new(0));
        let counter = changes.clone();
        variable.add_callback(Rc::new(move || counter.set(counter.get() + 1)));

        variable.process_sim_data(&message(Lights::default()), seconds(1.), 1);
        variable.process_sim_data(&message(Lights::default()), seconds(2.), 2);

        assert_eq!(changes.get(), 2);
    }

    #[test]
    fn trailing_padding_bytes_are_ignored() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        let lights = Lights {
            beacon: 1.,
            strobe: 1.,
        };
        let mut message = message(lights);
        message.data.extend_from_slice(&[0xff; 4]);

        variable.process_sim_data(&message, seconds(1.), 1);

        assert_eq!(*variable.data(), lights);
    }

    #[test]
    #[should_panic]
    fn data_of_another_request_panics() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        let mut message = message(Lights::default());
        message.request_id = REQUEST_ID + 1;

        variable.process_sim_data(&message, seconds(1.), 1);
    }

    #[test]
    #[should_panic]
    fn data_with_another_field_count_panics() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        let mut message = message(Lights::default());
        message.define_count = 3;

        variable.process_sim_data(&message, seconds(1.), 1);
    }

    #[test]
    #[should_panic]
    fn too_little_data_panics() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        let mut message = message(Lights::default());
        message.data.truncate(8);

        variable.process_sim_data(&message, seconds(1.), 1);
    }

    #[test]
    fn writes_the_data_as_one_block() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        let lights = Lights {
            beacon: 0.,
            strobe: 1.,
        };
        variable.set_data(lights);

        assert!(variable.write_data_to_sim());

        assert_eq!(
            host.sim_object_writes(),
            vec![(DEFINITION_ID, lights.as_bytes().to_vec())]
        );
    }

    #[test]
    fn failed_write_returns_false() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);
        host.fail("set_data_on_sim_object");

        let (written, logs) = capture_logs(|| variable.write_data_to_sim());

        assert!(!written);
        assert!(logs.has_error_containing("Failed to write"));
    }

    #[test]
    fn periodic_request_is_refused_while_reading_automatically() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::AUTO_READ);

        let (requested, logs) =
            capture_logs(|| variable.request_periodic_data_from_sim(SimObjectPeriod::SimFrame));

        assert!(!requested);
        assert!(host.sim_object_requests().is_empty());
        assert!(logs.has_error_containing("Periodic request ignored"));
    }

    #[test]
    fn periodic_request_can_be_stopped_while_reading_automatically() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::AUTO_READ);

        assert!(variable.request_periodic_data_from_sim(SimObjectPeriod::Never));
    }

    #[test]
    fn periodic_request_is_passed_to_the_simulator() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);

        assert!(variable.request_periodic_data_from_sim(SimObjectPeriod::Second));

        assert_eq!(
            host.sim_object_requests(),
            vec![(REQUEST_ID, DEFINITION_ID, SimObjectPeriod::Second)]
        );
    }

    #[test]
    fn dropping_clears_the_data_definition() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);

        drop(variable);

        assert!(host.is_data_definition_cleared(DEFINITION_ID));
    }

    #[test]
    fn data_can_be_modified_in_place() {
        let host = Rc::new(TestSimulatorHost::new());
        let variable = lights_variable(&host, UpdateMode::NO_AUTO_UPDATE);

        variable.data_mut().strobe = 1.;

        assert_about_eq!(variable.data().strobe, 1.);
    }
}
