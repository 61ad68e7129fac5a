use crate::{
    shared::{
        ClientDataId, DefinitionId, EventId, InputGroupId, KeyEventId, NotificationGroupId,
        RequestId, SimUnit, VariableId,
    },
    sim_objects::DataDefinition,
};
use std::rc::Rc;
use thiserror::Error;

/// The simulator as seen by the data manager and everything it manages.
pub type SharedHost = Rc<dyn SimulatorHost>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum HostError {
    #[error("{call} failed with code {code}")]
    CallFailed { call: &'static str, code: i32 },
    #[error("the name {0} is already in use")]
    NameAlreadyInUse(String),
    #[error("the ID {0} is already in use")]
    DuplicateId(u32),
    #[error("the name {0} is unknown to the simulator")]
    UnknownName(String),
    #[error("not connected to the simulator")]
    NotConnected,
}

/// How often the simulator sends the data of a data definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimObjectPeriod {
    Never,
    Once,
    VisualFrame,
    SimFrame,
    Second,
}

/// How often the simulator sends the content of a client data area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientDataPeriod {
    Never,
    Once,
    VisualFrame,
    OnSet,
    Second,
}

/// An input event mapped to a client event, with the value passed along when
/// the input fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputEventAction {
    pub event_id: EventId,
    pub value: u32,
}

/// The answer to a data definition or client data request.
#[derive(Clone, Debug, PartialEq)]
pub struct SimDataMessage {
    pub request_id: RequestId,
    pub define_count: u32,
    pub data: Vec<u8>,
}

/// A message taken from the simulator's dispatch queue.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchMessage {
    Open,
    Quit,
    Exception {
        exception: u32,
        send_id: u32,
        index: u32,
    },
    SimObjectData(SimDataMessage),
    ClientData(SimDataMessage),
    Event {
        event_id: EventId,
        data: u32,
    },
    EventEx1 {
        event_id: EventId,
        data: [u32; 5],
    },
    /// A key event intercepted by the key event handler.
    KeyEvent {
        key_event_id: KeyEventId,
        data: [u32; 5],
    },
    /// Any message kind the data manager has no use for.
    Other(u32),
}

/// The calls the data manager makes into the simulator.
///
/// Every method takes `&self`: the simulator API is single threaded and
/// non-reentrant, implementors use interior mutability where they keep state.
pub trait SimulatorHost {
    fn register_named_variable(&self, name: &str) -> Result<VariableId, HostError>;
    fn named_variable_value(&self, id: VariableId, unit: &SimUnit) -> f64;
    fn set_named_variable_value(&self, id: VariableId, value: f64, unit: &SimUnit);

    fn aircraft_variable_id(&self, name: &str) -> Result<VariableId, HostError>;
    fn aircraft_variable_value(&self, id: VariableId, unit: &SimUnit, index: u32) -> f64;

    fn execute_calculator_code(&self, code: &str) -> Result<(), HostError>;
    fn trigger_key_event(&self, key_event_id: KeyEventId, data: [u32; 5])
        -> Result<(), HostError>;

    fn map_client_event_to_sim_event(
        &self,
        event_id: EventId,
        event_name: &str,
    ) -> Result<(), HostError>;
    fn transmit_client_event(&self, event_id: EventId, data: u32) -> Result<(), HostError>;
    fn transmit_client_event_ex1(&self, event_id: EventId, data: [u32; 5])
        -> Result<(), HostError>;
    fn add_client_event_to_notification_group(
        &self,
        group_id: NotificationGroupId,
        event_id: EventId,
        mask_event: bool,
    ) -> Result<(), HostError>;
    fn remove_client_event(
        &self,
        group_id: NotificationGroupId,
        event_id: EventId,
    ) -> Result<(), HostError>;
    fn clear_notification_group(&self, group_id: NotificationGroupId) -> Result<(), HostError>;
    fn set_notification_group_priority(
        &self,
        group_id: NotificationGroupId,
        priority: u32,
    ) -> Result<(), HostError>;

    fn subscribe_to_system_event(
        &self,
        event_id: EventId,
        system_event_name: &str,
    ) -> Result<(), HostError>;
    fn unsubscribe_from_system_event(&self, event_id: EventId) -> Result<(), HostError>;
    fn set_system_event_state(&self, event_id: EventId, enabled: bool) -> Result<(), HostError>;

    fn map_input_event_to_client_event(
        &self,
        input_group_id: InputGroupId,
        input_definition: &str,
        down: Option<InputEventAction>,
        up: Option<InputEventAction>,
        maskable: bool,
    ) -> Result<(), HostError>;
    fn remove_input_event(
        &self,
        input_group_id: InputGroupId,
        input_definition: &str,
    ) -> Result<(), HostError>;
    fn clear_input_group(&self, input_group_id: InputGroupId) -> Result<(), HostError>;
    fn set_input_group_state(
        &self,
        input_group_id: InputGroupId,
        enabled: bool,
    ) -> Result<(), HostError>;

    fn add_to_data_definition(
        &self,
        definition_id: DefinitionId,
        definition: &DataDefinition,
    ) -> Result<(), HostError>;
    fn clear_data_definition(&self, definition_id: DefinitionId) -> Result<(), HostError>;
    fn request_data_on_sim_object(
        &self,
        request_id: RequestId,
        definition_id: DefinitionId,
        period: SimObjectPeriod,
    ) -> Result<(), HostError>;
    fn set_data_on_sim_object(
        &self,
        definition_id: DefinitionId,
        data: &[u8],
    ) -> Result<(), HostError>;

    fn map_client_data_name_to_id(
        &self,
        name: &str,
        client_data_id: ClientDataId,
    ) -> Result<(), HostError>;
    fn add_to_client_data_definition(
        &self,
        definition_id: DefinitionId,
        size: usize,
    ) -> Result<(), HostError>;
    fn clear_client_data_definition(&self, definition_id: DefinitionId)
        -> Result<(), HostError>;
    fn create_client_data(
        &self,
        client_data_id: ClientDataId,
        size: usize,
        read_only: bool,
    ) -> Result<(), HostError>;
    fn request_client_data(
        &self,
        client_data_id: ClientDataId,
        request_id: RequestId,
        definition_id: DefinitionId,
        period: ClientDataPeriod,
    ) -> Result<(), HostError>;
    fn set_client_data(
        &self,
        client_data_id: ClientDataId,
        definition_id: DefinitionId,
        data: &[u8],
    ) -> Result<(), HostError>;

    /// Takes the next pending message from the dispatch queue, if any.
    fn next_dispatch(&self) -> Option<DispatchMessage>;
}
