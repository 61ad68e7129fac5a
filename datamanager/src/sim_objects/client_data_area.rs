use super::{SimData, SimObject, SimObjectBase};
use crate::{
    managed_data_object::{ManagedData, ManagedDataObject},
    shared::{ClientDataId, DefinitionId, RequestId, UpdateMode},
    simulation::{ClientDataPeriod, HostError, SharedHost, SimDataMessage},
};
use std::{
    cell::{Ref, RefCell, RefMut},
    fmt, mem,
};
use tracing::{debug, error, trace};
use uom::si::f64::*;

/// Maps a client data area name to an ID and defines the area as `size` bytes.
/// Shared with the buffered area.
pub(super) fn define_client_data_area(
    host: &SharedHost,
    name: &str,
    client_data_id: ClientDataId,
    definition_id: DefinitionId,
    size: usize,
) {
    match host.map_client_data_name_to_id(name, client_data_id) {
        Ok(()) => {}
        Err(HostError::NameAlreadyInUse(_)) => {
            error!(object = name, "Client data area name already in use");
        }
        Err(HostError::DuplicateId(_)) => {
            error!(object = name, client_data_id, "Client data area ID already in use");
        }
        Err(err) => {
            error!(object = name, %err, "Failed to map client data area name to ID");
        }
    }

    if let Err(err) = host.add_to_client_data_definition(definition_id, size) {
        error!(object = name, %err, "Failed to add to client data definition");
    }
}

pub(super) fn create_client_data_area(
    host: &SharedHost,
    name: &str,
    client_data_id: ClientDataId,
    size: usize,
    read_only: bool,
) -> bool {
    match host.create_client_data(client_data_id, size, read_only) {
        Ok(()) => {
            debug!(object = name, client_data_id, size, read_only, "Created client data area");
            true
        }
        Err(err) => {
            error!(object = name, %err, "Failed to create client data area");
            false
        }
    }
}

pub(super) fn clear_client_data_definition(host: &SharedHost, name: &str, definition_id: DefinitionId) {
    debug!(object = name, "Clearing client data definition");
    if let Err(err) = host.clear_client_data_definition(definition_id) {
        error!(object = name, %err, "Failed to clear client data definition");
    }
}

/// A memory area defined by the client rather than by the simulator, used to
/// exchange a `T` with other simulator clients.
pub struct ClientDataAreaVariable<T: SimData> {
    base: SimObjectBase,
    client_data_id: ClientDataId,
    data: RefCell<T>,
}
impl<T: SimData> ClientDataAreaVariable<T> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        host: SharedHost,
        name: &str,
        client_data_id: ClientDataId,
        definition_id: DefinitionId,
        request_id: RequestId,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Self {
        define_client_data_area(&host, name, client_data_id, definition_id, mem::size_of::<T>());

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
            client_data_id,
            data: RefCell::new(T::default()),
        }
    }

    pub fn client_data_id(&self) -> ClientDataId {
        self.client_data_id
    }

    /// Creates the area in the simulator. Only one of the clients sharing the
    /// area does this, before any data is exchanged.
    pub fn allocate_client_data_area(&self, read_only_for_others: bool) -> bool {
        create_client_data_area(
            self.base.host(),
            self.name(),
            self.client_data_id,
            mem::size_of::<T>(),
            read_only_for_others,
        )
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

    /// Requests the simulator to send the area with the given period. Not allowed
    /// while the data is read automatically.
    pub fn request_periodic_data_from_sim(&self, period: ClientDataPeriod) -> bool {
        if self.is_auto_read() && period > ClientDataPeriod::Never {
            error!(object = self.name(), ?period, "Periodic request ignored as the data is read automatically");
            return false;
        }

        self.request(period)
    }

    fn request(&self, period: ClientDataPeriod) -> bool {
        match self.base.host().request_client_data(
            self.client_data_id,
            self.base.request_id(),
            self.base.definition_id(),
            period,
        ) {
            Ok(()) => true,
            Err(err) => {
                error!(object = self.name(), ?period, %err, "Failed to request client data");
                false
            }
        }
    }
}
impl<T: SimData> ManagedData for ClientDataAreaVariable<T> {
    fn managed(&self) -> &ManagedDataObject {
        self.base.managed()
    }
}
impl<T: SimData> SimObject for ClientDataAreaVariable<T> {
    fn base(&self) -> &SimObjectBase {
        &self.base
    }

    fn request_data_from_sim(&self) -> bool {
        self.request(ClientDataPeriod::Once)
    }

    fn process_sim_data(&self, message: &SimDataMessage, time: Time, tick: u64) {
        assert_eq!(
            message.request_id,
            self.base.request_id(),
            "Data of request {} was passed to {}",
            message.request_id,
            self.name()
        );
        assert!(
            message.data.len() >= mem::size_of::<T>(),
            "Received {} bytes for {}, which needs {} bytes",
            message.data.len(),
            self.name(),
            mem::size_of::<T>()
        );

        trace!(object = self.name(), "Received client data");
        let incoming = &message.data[..mem::size_of::<T>()];
        self.base.apply_if_changed(&self.data, incoming, time, tick);
    }

    fn write_data_to_sim(&self) -> bool {
        let data = *self.data.borrow();
        match self.base.host().set_client_data(
            self.client_data_id,
            self.base.definition_id(),
            data.as_bytes(),
        ) {
            Ok(()) => true,
            Err(err) => {
                error!(object = self.name(), client_data_id = self.client_data_id, %err, "Failed to write client data");
                false
            }
        }
    }
}
impl<T: SimData> Drop for ClientDataAreaVariable<T> {
    fn drop(&mut self) {
        clear_client_data_definition(self.base.host(), self.base.managed().name(), self.base.definition_id());
    }
}
impl<T: SimData> fmt::Display for ClientDataAreaVariable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (client data {}, definition {}, request {}, {} bytes)",
            self.managed(),
            self.client_data_id,
            self.base.definition_id(),
            self.base.request_id(),
            mem::size_of::<T>()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::test::{capture_logs, TestSimulatorHost};
    use rand::Rng;
    use std::rc::Rc;
    use uom::si::time::second;

    const CLIENT_DATA_ID: ClientDataId = 2;
    const DEFINITION_ID: DefinitionId = 4;
    const REQUEST_ID: RequestId = 6;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct FlightPlanSummary {
        waypoint_count: u32,
        active_leg: u32,
        distance_to_destination: f64,
    }
    unsafe impl SimData for FlightPlanSummary {}

    fn seconds(value: f64) -> Time {
        Time::new::<second>(value)
    }

    fn area(host: &Rc<TestSimulatorHost>, update_mode: UpdateMode) -> ClientDataAreaVariable<FlightPlanSummary> {
        ClientDataAreaVariable::new(
            host.clone(),
            "A32NX_FLIGHT_PLAN_SUMMARY",
            CLIENT_DATA_ID,
            DEFINITION_ID,
            REQUEST_ID,
            update_mode,
            seconds(0.),
            0,
        )
    }

    fn message(summary: FlightPlanSummary) -> SimDataMessage {
        SimDataMessage {
            request_id: REQUEST_ID,
            define_count: 1,
            data: summary.as_bytes().to_vec(),
        }
    }

    fn random_summary() -> FlightPlanSummary {
        let mut rng = rand::thread_rng();
        FlightPlanSummary {
            waypoint_count: rng.gen_range(1..100),
            active_leg: rng.gen_range(1..100),
            distance_to_destination: rng.gen_range(1.0..3000.0),
        }
    }

    #[test]
    fn maps_the_name_and_defines_the_size() {
        let host = Rc::new(TestSimulatorHost::new());

        let _area = area(&host, UpdateMode::NO_AUTO_UPDATE);

        assert_eq!(
            host.client_data_id("A32NX_FLIGHT_PLAN_SUMMARY"),
            Some(CLIENT_DATA_ID)
        );
        assert_eq!(host.client_data_definition_size(DEFINITION_ID), Some(16));
    }

    #[test]
    fn name_already_in_use_is_logged() {
        let host = Rc::new(TestSimulatorHost::new());
        let _first = area(&host, UpdateMode::NO_AUTO_UPDATE);

        let (_second, logs) = capture_logs(|| {
            ClientDataAreaVariable::<FlightPlanSummary>::new(
                host.clone(),
                "A32NX_FLIGHT_PLAN_SUMMARY",
                CLIENT_DATA_ID + 1,
                DEFINITION_ID + 1,
                REQUEST_ID + 1,
                UpdateMode::NO_AUTO_UPDATE,
                seconds(0.),
                0,
            )
        });

        assert!(logs.has_error_containing("name already in use"));
    }

    #[test]
    fn allocation_creates_an_area_of_the_type_size() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area(&host, UpdateMode::NO_AUTO_UPDATE);

        assert!(area.allocate_client_data_area(true));

        assert_eq!(host.created_client_data(CLIENT_DATA_ID), Some((16, true)));
    }

    #[test]
    fn allocating_twice_is_rejected_by_the_simulator() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area(&host, UpdateMode::NO_AUTO_UPDATE);
        area.allocate_client_data_area(false);

        let (allocated, logs) = capture_logs(|| area.allocate_client_data_area(false));

        assert!(!allocated);
        assert!(logs.has_error_containing("Failed to create"));
    }

    #[test]
    fn received_data_is_applied() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area(&host, UpdateMode::NO_AUTO_UPDATE);
        let summary = random_summary();

        area.process_sim_data(&message(summary), seconds(1.), 1);

        assert!(area.has_changed());
        assert_eq!(*area.data(), summary);
    }

    #[test]
    fn identical_data_is_not_a_change() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area(&host, UpdateMode::NO_AUTO_UPDATE);
        let summary = random_summary();
        area.process_sim_data(&message(summary), seconds(1.), 1);

        area.process_sim_data(&message(summary), seconds(2.), 2);

        assert!(!area.has_changed());
    }

    #[test]
    fn request_asks_for_the_area_once() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area(&host, UpdateMode::NO_AUTO_UPDATE);

        assert!(area.request_update_from_sim(seconds(1.), 1));

        assert_eq!(
            host.client_data_requests(),
            vec![(
                CLIENT_DATA_ID,
                REQUEST_ID,
                DEFINITION_ID,
                ClientDataPeriod::Once
            )]
        );
    }

    #[test]
    fn periodic_request_is_refused_while_reading_automatically() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area(&host, UpdateMode::AUTO_READ);

        let (requested, _) =
            capture_logs(|| area.request_periodic_data_from_sim(ClientDataPeriod::OnSet));

        assert!(!requested);
        assert!(host.client_data_requests().is_empty());
    }

    #[test]
    fn writes_the_whole_area() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area(&host, UpdateMode::NO_AUTO_UPDATE);
        let summary = random_summary();
        area.set_data(summary);

        assert!(area.write_data_to_sim());

        assert_eq!(
            host.client_data_writes(),
            vec![(CLIENT_DATA_ID, summary.as_bytes().to_vec())]
        );
    }

    #[test]
    fn dropping_clears_the_client_data_definition() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area(&host, UpdateMode::NO_AUTO_UPDATE);

        drop(area);

        assert!(host.is_client_data_definition_cleared(DEFINITION_ID));
    }
}
