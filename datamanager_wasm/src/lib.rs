use datamanager::{
    managed_data_object::ManagedData,
    shared::{
        ClientDataId, DefinitionId, EventId, InputGroupId, KeyEventId, NotificationGroupId,
        RequestId, SimUnit, UpdateMode, VariableId,
    },
    sim_objects::{DataDefinition, SimDataType},
    simulation::{
        ClientDataPeriod, DispatchMessage, HostError, InputEventAction, Module,
        SimDataMessage, SimObjectPeriod, Simulation, SimulatorHost, UpdateContext,
    },
    variables::{AircraftVariable, AircraftVariableSetter, NamedVariable},
    DataManager,
};
use msfs::{legacy, sim_connect::SIMCONNECT_OBJECT_ID_USER, sys, MSFSEvent};
use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
    ffi::{c_void, CString},
    ptr,
    rc::Rc,
};
use tracing::{debug, error, info, warn};
use uom::si::{f64::*, time::second};

#[msfs::gauge(name=datamanager)]
async fn datamanager(mut gauge: msfs::Gauge) -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .without_time()
        .with_ansi(false)
        .with_target(false)
        .try_init();

    let host = Rc::new(MsfsHost::open("DataManager")?);
    let mut simulation = Simulation::new(DataManager::new(host));
    simulation.register_module(Box::new(PanelBrightness::new()));
    if !simulation.initialize() {
        error!("Not all modules were initialized");
    }

    while let Some(event) = gauge.next_event().await {
        if let MSFSEvent::PreDraw(d) = event {
            simulation.tick(d.delta_time());
        }
    }

    simulation.shutdown();
    info!("Gauge stopped");

    Ok(())
}

/// Mirrors the panel light potentiometer into a named variable, so the
/// instruments can read it without an aircraft variable lookup.
struct PanelBrightness {
    potentiometer: Option<Rc<AircraftVariable>>,
    brightness: Option<Rc<NamedVariable>>,
}
impl PanelBrightness {
    const POTENTIOMETER_INDEX: u32 = 84;

    fn new() -> Self {
        Self {
            potentiometer: None,
            brightness: None,
        }
    }
}
impl Module for PanelBrightness {
    fn name(&self) -> &str {
        "panel brightness"
    }

    fn initialize(&mut self, data_manager: &mut DataManager) -> bool {
        self.potentiometer = Some(data_manager.make_aircraft_var(
            "LIGHT POTENTIOMETER",
            Self::POTENTIOMETER_INDEX,
            AircraftVariableSetter::calculator_code("LIGHT_POTENTIOMETER_SET"),
            SimUnit::PERCENT,
            UpdateMode::AUTO_READ,
            Time::new::<second>(0.25),
            0,
        ));
        self.brightness = Some(data_manager.make_named_var(
            "A32NX_PANEL_BRIGHTNESS",
            SimUnit::PERCENT,
            UpdateMode::AUTO_WRITE,
            Time::new::<second>(0.),
            0,
        ));

        true
    }

    fn update(&mut self, _: &mut DataManager, _: &UpdateContext) -> bool {
        match (&self.potentiometer, &self.brightness) {
            (Some(potentiometer), Some(brightness)) => {
                if potentiometer.has_changed() {
                    brightness.set(potentiometer.get());
                }
                true
            }
            _ => false,
        }
    }
}

thread_local! {
    static KEY_EVENTS: RefCell<VecDeque<DispatchMessage>> = RefCell::new(VecDeque::new());
}

unsafe extern "C" fn key_event_handler(
    event: sys::ID32,
    data0: sys::UINT32,
    data1: sys::UINT32,
    data2: sys::UINT32,
    data3: sys::UINT32,
    data4: sys::UINT32,
    _user_data: *mut c_void,
) {
    KEY_EVENTS.with(|events| {
        events.borrow_mut().push_back(DispatchMessage::KeyEvent {
            key_event_id: event as KeyEventId,
            data: [data0 as u32, data1 as u32, data2 as u32, data3 as u32, data4 as u32],
        })
    });
}

/// Turns a message from the dispatch queue into the form the data manager
/// handles.
///
/// # Safety
///
/// `message` must point to a message of `size` bytes handed out by
/// `SimConnect_GetNextDispatch`, valid until the next dispatch call.
unsafe fn parse_message(message: *const sys::SIMCONNECT_RECV, size: usize) -> DispatchMessage {
    let id = (*message).dwID as sys::SIMCONNECT_RECV_ID;
    match id {
        sys::SIMCONNECT_RECV_ID_SIMCONNECT_RECV_ID_OPEN => DispatchMessage::Open,
        sys::SIMCONNECT_RECV_ID_SIMCONNECT_RECV_ID_QUIT => DispatchMessage::Quit,
        sys::SIMCONNECT_RECV_ID_SIMCONNECT_RECV_ID_EXCEPTION => {
            let exception = &*(message as *const sys::SIMCONNECT_RECV_EXCEPTION);
            DispatchMessage::Exception {
                exception: exception.dwException,
                send_id: exception.dwSendID,
                index: exception.dwIndex,
            }
        }
        sys::SIMCONNECT_RECV_ID_SIMCONNECT_RECV_ID_EVENT => {
            let event = &*(message as *const sys::SIMCONNECT_RECV_EVENT);
            DispatchMessage::Event {
                event_id: event.id(),
                data: event.data(),
            }
        }
        sys::SIMCONNECT_RECV_ID_SIMCONNECT_RECV_ID_EVENT_EX1 => {
            let event = &*(message as *const sys::SIMCONNECT_RECV_EVENT_EX1);
            DispatchMessage::EventEx1 {
                event_id: event.uEventID,
                data: [
                    event.dwData0,
                    event.dwData1,
                    event.dwData2,
                    event.dwData3,
                    event.dwData4,
                ],
            }
        }
        sys::SIMCONNECT_RECV_ID_SIMCONNECT_RECV_ID_SIMOBJECT_DATA => DispatchMessage::SimObjectData(
            object_data(&*(message as *const sys::SIMCONNECT_RECV_SIMOBJECT_DATA), size),
        ),
        sys::SIMCONNECT_RECV_ID_SIMCONNECT_RECV_ID_CLIENT_DATA => {
            let client_data = &*(message as *const sys::SIMCONNECT_RECV_CLIENT_DATA);
            DispatchMessage::ClientData(object_data(&client_data._base, size))
        }
        _ => DispatchMessage::Other(id as u32),
    }
}

/// Copies the data trailing an object or client data message. It starts at
/// `dwData` and runs to the end of the message.
unsafe fn object_data(message: &sys::SIMCONNECT_RECV_SIMOBJECT_DATA, size: usize) -> SimDataMessage {
    let start = ptr::addr_of!(message.dwData) as *const u8;
    let offset = start as usize - message as *const _ as usize;

    SimDataMessage {
        request_id: message.dwRequestID,
        define_count: message.dwDefineCount,
        data: std::slice::from_raw_parts(start, size.saturating_sub(offset)).to_vec(),
    }
}

struct RegisteredNamedVariable {
    name: String,
    variable: legacy::NamedVariable,
}

/// The simulator as reached through SimConnect and the gauge API.
///
/// Variables and calculator code go through the `msfs::legacy` wrappers. The
/// SimConnect calls stay on the raw connection: the data manager mints its own
/// definition, request, client data and event IDs at run time, while the
/// typed `msfs::sim_connect` calls allocate IDs per Rust type themselves.
struct MsfsHost {
    handle: sys::HANDLE,
    named_variables: RefCell<Vec<RegisteredNamedVariable>>,
    aircraft_variable_names: RefCell<Vec<String>>,
    aircraft_variables: RefCell<BTreeMap<(VariableId, SimUnit, u32), legacy::AircraftVariable>>,
}
impl MsfsHost {
    fn open(name: &str) -> Result<Self, HostError> {
        let name = c_string(name)?;
        let mut handle: sys::HANDLE = ptr::null_mut();
        check("SimConnect_Open", unsafe {
            sys::SimConnect_Open(
                &mut handle,
                name.as_ptr(),
                ptr::null_mut(),
                0,
                ptr::null_mut(),
                0,
            )
        })?;

        unsafe { sys::register_key_event_handler_EX1(Some(key_event_handler), ptr::null_mut()) };
        debug!("Opened SimConnect connection");

        Ok(Self {
            handle,
            named_variables: RefCell::new(Vec::new()),
            aircraft_variable_names: RefCell::new(Vec::new()),
            aircraft_variables: RefCell::new(BTreeMap::new()),
        })
    }

    fn named_variable_name(&self, id: VariableId) -> Option<String> {
        self.named_variables
            .borrow()
            .get(id as usize)
            .map(|registered| registered.name.clone())
    }

    fn next_simconnect_message(&self) -> Option<DispatchMessage> {
        let mut message: *mut sys::SIMCONNECT_RECV = ptr::null_mut();
        let mut size: sys::DWORD = 0;
        let result =
            unsafe { sys::SimConnect_GetNextDispatch(self.handle, &mut message, &mut size) };
        if result < 0 || message.is_null() {
            return None;
        }

        Some(unsafe { parse_message(message, size as usize) })
    }
}
impl Drop for MsfsHost {
    fn drop(&mut self) {
        unsafe { sys::unregister_key_event_handler_EX1(Some(key_event_handler), ptr::null_mut()) };
        if let Err(err) = check("SimConnect_Close", unsafe { sys::SimConnect_Close(self.handle) }) {
            error!(%err, "Failed to close SimConnect connection");
        }
    }
}
impl SimulatorHost for MsfsHost {
    fn register_named_variable(&self, name: &str) -> Result<VariableId, HostError> {
        let mut variables = self.named_variables.borrow_mut();
        if let Some(id) = variables.iter().position(|registered| registered.name == name) {
            return Ok(id as VariableId);
        }

        variables.push(RegisteredNamedVariable {
            name: name.to_owned(),
            variable: legacy::NamedVariable::from(name),
        });
        Ok((variables.len() - 1) as VariableId)
    }

    fn named_variable_value(&self, id: VariableId, unit: &SimUnit) -> f64 {
        if is_unitless(unit) {
            if let Some(registered) = self.named_variables.borrow_mut().get_mut(id as usize) {
                let value: f64 = registered.variable.get_value();
                return value;
            }
        } else if let Some(name) = self.named_variable_name(id) {
            return legacy::execute_calculator_code::<f64>(&format!("(L:{}, {})", name, unit))
                .unwrap_or_else(|| {
                    warn!(variable = %name, %unit, "Failed to read named variable");
                    0.
                });
        }

        warn!(variable = id, "Named variable is not registered");
        0.
    }

    fn set_named_variable_value(&self, id: VariableId, value: f64, unit: &SimUnit) {
        if is_unitless(unit) {
            if let Some(registered) = self.named_variables.borrow_mut().get_mut(id as usize) {
                registered.variable.set_value(value);
                return;
            }
        } else if let Some(name) = self.named_variable_name(id) {
            let code = format!("{} (>L:{}, {})", value, name, unit);
            if legacy::execute_calculator_code::<f64>(&code).is_none() {
                warn!(variable = %name, %unit, "Failed to write named variable");
            }
            return;
        }

        warn!(variable = id, "Named variable is not registered");
    }

    fn aircraft_variable_id(&self, name: &str) -> Result<VariableId, HostError> {
        let mut names = self.aircraft_variable_names.borrow_mut();
        if let Some(id) = names.iter().position(|known| known == name) {
            return Ok(id as VariableId);
        }

        legacy::AircraftVariable::from(name, SimUnit::NUMBER.name(), 0)
            .map_err(|_| HostError::UnknownName(name.to_owned()))?;
        names.push(name.to_owned());
        Ok((names.len() - 1) as VariableId)
    }

    fn aircraft_variable_value(&self, id: VariableId, unit: &SimUnit, index: u32) -> f64 {
        let key = (id, unit.clone(), index);
        let mut variables = self.aircraft_variables.borrow_mut();
        if !variables.contains_key(&key) {
            let name = match self.aircraft_variable_names.borrow().get(id as usize) {
                Some(name) => name.clone(),
                None => {
                    warn!(variable = id, "Aircraft variable is not known");
                    return 0.;
                }
            };

            match legacy::AircraftVariable::from(&name, unit.name(), index as _) {
                Ok(variable) => {
                    variables.insert(key.clone(), variable);
                }
                Err(err) => {
                    warn!(variable = %name, %unit, index, %err, "Failed to read aircraft variable");
                    return 0.;
                }
            }
        }

        match variables.get_mut(&key) {
            Some(variable) => {
                let value: f64 = variable.get();
                value
            }
            None => 0.,
        }
    }

    fn execute_calculator_code(&self, code: &str) -> Result<(), HostError> {
        legacy::execute_calculator_code::<f64>(code)
            .map(|_| ())
            .ok_or(HostError::CallFailed {
                call: "execute_calculator_code",
                code: 0,
            })
    }

    fn trigger_key_event(&self, key_event_id: KeyEventId, data: [u32; 5]) -> Result<(), HostError> {
        unsafe {
            sys::trigger_key_event_EX1(
                key_event_id as _,
                data[0] as _,
                data[1] as _,
                data[2] as _,
                data[3] as _,
                data[4] as _,
            )
        };

        Ok(())
    }

    fn map_client_event_to_sim_event(&self, event_id: EventId, event_name: &str) -> Result<(), HostError> {
        let event_name = c_string(event_name)?;
        check("SimConnect_MapClientEventToSimEvent", unsafe {
            sys::SimConnect_MapClientEventToSimEvent(self.handle, event_id, event_name.as_ptr())
        })
    }

    fn transmit_client_event(&self, event_id: EventId, data: u32) -> Result<(), HostError> {
        check("SimConnect_TransmitClientEvent", unsafe {
            sys::SimConnect_TransmitClientEvent(
                self.handle,
                SIMCONNECT_OBJECT_ID_USER,
                event_id,
                data,
                sys::SIMCONNECT_GROUP_PRIORITY_HIGHEST,
                sys::SIMCONNECT_EVENT_FLAG_GROUPID_IS_PRIORITY,
            )
        })
    }

    fn transmit_client_event_ex1(&self, event_id: EventId, data: [u32; 5]) -> Result<(), HostError> {
        check("SimConnect_TransmitClientEvent_EX1", unsafe {
            sys::SimConnect_TransmitClientEvent_EX1(
                self.handle,
                SIMCONNECT_OBJECT_ID_USER,
                event_id,
                sys::SIMCONNECT_GROUP_PRIORITY_HIGHEST,
                sys::SIMCONNECT_EVENT_FLAG_GROUPID_IS_PRIORITY,
                data[0],
                data[1],
                data[2],
                data[3],
                data[4],
            )
        })
    }

    fn add_client_event_to_notification_group(
        &self,
        group_id: NotificationGroupId,
        event_id: EventId,
        mask_event: bool,
    ) -> Result<(), HostError> {
        check("SimConnect_AddClientEventToNotificationGroup", unsafe {
            sys::SimConnect_AddClientEventToNotificationGroup(
                self.handle,
                group_id,
                event_id,
                mask_event as _,
            )
        })
    }

    fn remove_client_event(&self, group_id: NotificationGroupId, event_id: EventId) -> Result<(), HostError> {
        check("SimConnect_RemoveClientEvent", unsafe {
            sys::SimConnect_RemoveClientEvent(self.handle, group_id, event_id)
        })
    }

    fn clear_notification_group(&self, group_id: NotificationGroupId) -> Result<(), HostError> {
        check("SimConnect_ClearNotificationGroup", unsafe {
            sys::SimConnect_ClearNotificationGroup(self.handle, group_id)
        })
    }

    fn set_notification_group_priority(
        &self,
        group_id: NotificationGroupId,
        priority: u32,
    ) -> Result<(), HostError> {
        check("SimConnect_SetNotificationGroupPriority", unsafe {
            sys::SimConnect_SetNotificationGroupPriority(self.handle, group_id, priority)
        })
    }

    fn subscribe_to_system_event(
        &self,
        event_id: EventId,
        system_event_name: &str,
    ) -> Result<(), HostError> {
        let system_event_name = c_string(system_event_name)?;
        check("SimConnect_SubscribeToSystemEvent", unsafe {
            sys::SimConnect_SubscribeToSystemEvent(self.handle, event_id, system_event_name.as_ptr())
        })
    }

    fn unsubscribe_from_system_event(&self, event_id: EventId) -> Result<(), HostError> {
        check("SimConnect_UnsubscribeFromSystemEvent", unsafe {
            sys::SimConnect_UnsubscribeFromSystemEvent(self.handle, event_id)
        })
    }

    fn set_system_event_state(&self, event_id: EventId, enabled: bool) -> Result<(), HostError> {
        check("SimConnect_SetSystemEventState", unsafe {
            sys::SimConnect_SetSystemEventState(self.handle, event_id, state(enabled))
        })
    }

    fn map_input_event_to_client_event(
        &self,
        input_group_id: InputGroupId,
        input_definition: &str,
        down: Option<InputEventAction>,
        up: Option<InputEventAction>,
        maskable: bool,
    ) -> Result<(), HostError> {
        let input_definition = c_string(input_definition)?;
        let (down_event, down_value) = action_or_unused(down);
        let (up_event, up_value) = action_or_unused(up);

        check("SimConnect_MapInputEventToClientEvent_EX1", unsafe {
            sys::SimConnect_MapInputEventToClientEvent_EX1(
                self.handle,
                input_group_id,
                input_definition.as_ptr(),
                down_event,
                down_value,
                up_event,
                up_value,
                maskable as _,
            )
        })
    }

    fn remove_input_event(&self, input_group_id: InputGroupId, input_definition: &str) -> Result<(), HostError> {
        let input_definition = c_string(input_definition)?;
        check("SimConnect_RemoveInputEvent", unsafe {
            sys::SimConnect_RemoveInputEvent(self.handle, input_group_id, input_definition.as_ptr())
        })
    }

    fn clear_input_group(&self, input_group_id: InputGroupId) -> Result<(), HostError> {
        check("SimConnect_ClearInputGroup", unsafe {
            sys::SimConnect_ClearInputGroup(self.handle, input_group_id)
        })
    }

    fn set_input_group_state(&self, input_group_id: InputGroupId, enabled: bool) -> Result<(), HostError> {
        check("SimConnect_SetInputGroupState", unsafe {
            sys::SimConnect_SetInputGroupState(self.handle, input_group_id, state(enabled))
        })
    }

    fn add_to_data_definition(
        &self,
        definition_id: DefinitionId,
        definition: &DataDefinition,
    ) -> Result<(), HostError> {
        let name = c_string(&definition.full_name())?;
        let unit = c_string(definition.unit.name())?;

        check("SimConnect_AddToDataDefinition", unsafe {
            sys::SimConnect_AddToDataDefinition(
                self.handle,
                definition_id,
                name.as_ptr(),
                unit.as_ptr(),
                data_type(definition.data_type),
                definition.epsilon,
                sys::SIMCONNECT_UNUSED,
            )
        })
    }

    fn clear_data_definition(&self, definition_id: DefinitionId) -> Result<(), HostError> {
        check("SimConnect_ClearDataDefinition", unsafe {
            sys::SimConnect_ClearDataDefinition(self.handle, definition_id)
        })
    }

    fn request_data_on_sim_object(
        &self,
        request_id: RequestId,
        definition_id: DefinitionId,
        period: SimObjectPeriod,
    ) -> Result<(), HostError> {
        let period = match period {
            SimObjectPeriod::Never => sys::SIMCONNECT_PERIOD_SIMCONNECT_PERIOD_NEVER,
            SimObjectPeriod::Once => sys::SIMCONNECT_PERIOD_SIMCONNECT_PERIOD_ONCE,
            SimObjectPeriod::VisualFrame => sys::SIMCONNECT_PERIOD_SIMCONNECT_PERIOD_VISUAL_FRAME,
            SimObjectPeriod::SimFrame => sys::SIMCONNECT_PERIOD_SIMCONNECT_PERIOD_SIM_FRAME,
            SimObjectPeriod::Second => sys::SIMCONNECT_PERIOD_SIMCONNECT_PERIOD_SECOND,
        };

        check("SimConnect_RequestDataOnSimObject", unsafe {
            sys::SimConnect_RequestDataOnSimObject(
                self.handle,
                request_id,
                definition_id,
                SIMCONNECT_OBJECT_ID_USER,
                period as _,
                0,
                0,
                0,
                0,
            )
        })
    }

    fn set_data_on_sim_object(&self, definition_id: DefinitionId, data: &[u8]) -> Result<(), HostError> {
        check("SimConnect_SetDataOnSimObject", unsafe {
            sys::SimConnect_SetDataOnSimObject(
                self.handle,
                definition_id,
                SIMCONNECT_OBJECT_ID_USER,
                0,
                0,
                data.len() as _,
                data.as_ptr() as *mut c_void,
            )
        })
    }

    fn map_client_data_name_to_id(&self, name: &str, client_data_id: ClientDataId) -> Result<(), HostError> {
        let c_name = c_string(name)?;
        check("SimConnect_MapClientDataNameToID", unsafe {
            sys::SimConnect_MapClientDataNameToID(self.handle, c_name.as_ptr(), client_data_id)
        })
    }

    fn add_to_client_data_definition(&self, definition_id: DefinitionId, size: usize) -> Result<(), HostError> {
        check("SimConnect_AddToClientDataDefinition", unsafe {
            sys::SimConnect_AddToClientDataDefinition(
                self.handle,
                definition_id,
                0,
                size as _,
                0.,
                sys::SIMCONNECT_UNUSED,
            )
        })
    }

    fn clear_client_data_definition(&self, definition_id: DefinitionId) -> Result<(), HostError> {
        check("SimConnect_ClearClientDataDefinition", unsafe {
            sys::SimConnect_ClearClientDataDefinition(self.handle, definition_id)
        })
    }

    fn create_client_data(
        &self,
        client_data_id: ClientDataId,
        size: usize,
        read_only: bool,
    ) -> Result<(), HostError> {
        let flags = if read_only {
            sys::SIMCONNECT_CREATE_CLIENT_DATA_FLAG_READ_ONLY
        } else {
            0
        };

        check("SimConnect_CreateClientData", unsafe {
            sys::SimConnect_CreateClientData(self.handle, client_data_id, size as _, flags)
        })
    }

    fn request_client_data(
        &self,
        client_data_id: ClientDataId,
        request_id: RequestId,
        definition_id: DefinitionId,
        period: ClientDataPeriod,
    ) -> Result<(), HostError> {
        let period = match period {
            ClientDataPeriod::Never => sys::SIMCONNECT_CLIENT_DATA_PERIOD_SIMCONNECT_CLIENT_DATA_PERIOD_NEVER,
            ClientDataPeriod::Once => sys::SIMCONNECT_CLIENT_DATA_PERIOD_SIMCONNECT_CLIENT_DATA_PERIOD_ONCE,
            ClientDataPeriod::VisualFrame => sys::SIMCONNECT_CLIENT_DATA_PERIOD_SIMCONNECT_CLIENT_DATA_PERIOD_VISUAL_FRAME,
            ClientDataPeriod::OnSet => sys::SIMCONNECT_CLIENT_DATA_PERIOD_SIMCONNECT_CLIENT_DATA_PERIOD_ON_SET,
            ClientDataPeriod::Second => sys::SIMCONNECT_CLIENT_DATA_PERIOD_SIMCONNECT_CLIENT_DATA_PERIOD_SECOND,
        };

        check("SimConnect_RequestClientData", unsafe {
            sys::SimConnect_RequestClientData(
                self.handle,
                client_data_id,
                request_id,
                definition_id,
                period as _,
                0,
                0,
                0,
                0,
            )
        })
    }

    fn set_client_data(
        &self,
        client_data_id: ClientDataId,
        definition_id: DefinitionId,
        data: &[u8],
    ) -> Result<(), HostError> {
        check("SimConnect_SetClientData", unsafe {
            sys::SimConnect_SetClientData(
                self.handle,
                client_data_id,
                definition_id,
                0,
                0,
                data.len() as _,
                data.as_ptr() as *mut c_void,
            )
        })
    }

    fn next_dispatch(&self) -> Option<DispatchMessage> {
        KEY_EVENTS
            .with(|events| events.borrow_mut().pop_front())
            .or_else(|| self.next_simconnect_message())
    }
}

fn check(call: &'static str, result: sys::HRESULT) -> Result<(), HostError> {
    if result < 0 {
        Err(HostError::CallFailed {
            call,
            code: result as i32,
        })
    } else {
        Ok(())
    }
}

fn c_string(value: &str) -> Result<CString, HostError> {
    CString::new(value).map_err(|_| HostError::UnknownName(value.to_owned()))
}

fn action_or_unused(action: Option<InputEventAction>) -> (u32, u32) {
    match action {
        Some(action) => (action.event_id, action.value),
        None => (sys::SIMCONNECT_UNUSED, 0),
    }
}

fn data_type(data_type: SimDataType) -> sys::SIMCONNECT_DATATYPE {
    match data_type {
        SimDataType::Int32 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_INT32,
        SimDataType::Int64 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_INT64,
        SimDataType::Float32 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_FLOAT32,
        SimDataType::Float64 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_FLOAT64,
        SimDataType::String8 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_STRING8,
        SimDataType::String32 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_STRING32,
        SimDataType::String64 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_STRING64,
        SimDataType::String128 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_STRING128,
        SimDataType::String256 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_STRING256,
        SimDataType::String260 => sys::SIMCONNECT_DATATYPE_SIMCONNECT_DATATYPE_STRING260,
    }
}

fn state(enabled: bool) -> sys::SIMCONNECT_STATE {
    if enabled {
        sys::SIMCONNECT_STATE_SIMCONNECT_STATE_ON
    } else {
        sys::SIMCONNECT_STATE_SIMCONNECT_STATE_OFF
    }
}

fn is_unitless(unit: &SimUnit) -> bool {
    *unit == SimUnit::NUMBER || *unit == SimUnit::BOOL
}
