use crate::{
    events::{ClientEvent, EventCallback, EventParameters, DEFAULT_NOTIFICATION_GROUP},
    managed_data_object::ManagedData,
    shared::{
        CallbackId, ClientDataId, DefinitionId, EventId, IdGenerator, KeyEventId,
        NotificationGroupId, RequestId, SimConnectException, SimUnit, UpdateMode,
    },
    sim_objects::{
        ClientDataAreaVariable, ClientDataBufferedAreaVariable, DataDefinition,
        DataDefinitionVariable, SimData, SimObject, StampPolicy,
    },
    simulation::{DispatchMessage, SharedHost, SimDataMessage, UpdateContext},
    variables::{AircraftVariable, AircraftVariableSetter, NamedVariable},
};
use num_traits::FromPrimitive;
use std::{collections::BTreeMap, rc::Rc};
use tracing::{debug, error, info, trace, warn};
use uom::si::{f64::*, time::second};

/// Defaults applied to everything the data manager creates.
#[derive(Clone, Copy, Debug)]
pub struct DataManagerOptions {
    stamp_policy: StampPolicy,
    warn_if_dirty: bool,
    default_epsilon: f64,
}
impl DataManagerOptions {
    pub fn new() -> Self {
        Self {
            stamp_policy: StampPolicy::default(),
            warn_if_dirty: false,
            default_epsilon: f64::EPSILON,
        }
    }

    pub fn stamp_policy(mut self, stamp_policy: StampPolicy) -> Self {
        self.stamp_policy = stamp_policy;
        self
    }

    /// Log a warning instead of a debug message when a variable is read before
    /// its locally set value was written to the simulator.
    pub fn warn_if_dirty(mut self, warn_if_dirty: bool) -> Self {
        self.warn_if_dirty = warn_if_dirty;
        self
    }

    pub fn default_epsilon(mut self, default_epsilon: f64) -> Self {
        self.default_epsilon = default_epsilon;
        self
    }
}
impl Default for DataManagerOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns every variable, sim object and event, ensures a variable requested
/// by several modules exists only once, and routes the simulator's messages
/// to their receivers.
pub struct DataManager {
    host: SharedHost,
    options: DataManagerOptions,
    is_initialized: bool,

    time_stamp: Time,
    tick_counter: u64,

    named_variables: BTreeMap<String, Rc<NamedVariable>>,
    aircraft_variables: BTreeMap<String, Rc<AircraftVariable>>,
    sim_objects: BTreeMap<RequestId, Rc<dyn SimObject>>,
    client_events: BTreeMap<EventId, Rc<ClientEvent>>,
    key_event_callbacks: BTreeMap<KeyEventId, BTreeMap<CallbackId, EventCallback>>,

    definition_ids: IdGenerator<DefinitionId>,
    request_ids: IdGenerator<RequestId>,
    client_data_ids: IdGenerator<ClientDataId>,
    event_ids: IdGenerator<EventId>,
    callback_ids: IdGenerator<CallbackId>,
}
impl DataManager {
    pub fn new(host: SharedHost) -> Self {
        Self::new_with_options(host, DataManagerOptions::default())
    }

    pub fn new_with_options(host: SharedHost, options: DataManagerOptions) -> Self {
        debug!(?options, "Initialized data manager");

        Self {
            host,
            options,
            is_initialized: true,
            time_stamp: Time::new::<second>(0.),
            tick_counter: 0,
            named_variables: BTreeMap::new(),
            aircraft_variables: BTreeMap::new(),
            sim_objects: BTreeMap::new(),
            client_events: BTreeMap::new(),
            key_event_callbacks: BTreeMap::new(),
            definition_ids: IdGenerator::new(),
            request_ids: IdGenerator::new(),
            client_data_ids: IdGenerator::new(),
            event_ids: IdGenerator::new(),
            callback_ids: IdGenerator::new(),
        }
    }

    pub fn host(&self) -> &SharedHost {
        &self.host
    }

    pub fn options(&self) -> &DataManagerOptions {
        &self.options
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    /// The simulation time of the last `pre_update`.
    pub fn time_stamp(&self) -> Time {
        self.time_stamp
    }

    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }

    /// Returns the named variable of the given name and unit, creating it when
    /// it does not exist yet. An existing variable is widened to the union of
    /// the requested update modes and the smallest of the requested maximum
    /// ages.
    pub fn make_named_var(
        &mut self,
        name: &str,
        unit: SimUnit,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Rc<NamedVariable> {
        let key = format!("{}:{}", name, unit);
        if let Some(existing) = self.named_variables.get(&key) {
            trace!(variable = name, %unit, "Returning existing named variable");
            widen(&**existing, update_mode, max_age_time, max_age_ticks);
            return existing.clone();
        }

        let variable = Rc::new(NamedVariable::new(
            self.host.clone(),
            name,
            unit,
            update_mode,
            max_age_time,
            max_age_ticks,
            self.options.default_epsilon,
        ));
        variable.set_warn_if_dirty(self.options.warn_if_dirty);
        debug!(variable = %variable, "Created named variable");

        self.named_variables.insert(key, variable.clone());
        variable
    }

    /// Returns the aircraft variable of the given name, index and unit,
    /// creating it when it does not exist yet. The setter is only used when the
    /// variable is created.
    #[allow(clippy::too_many_arguments)]
    pub fn make_aircraft_var(
        &mut self,
        name: &str,
        index: u32,
        setter: AircraftVariableSetter,
        unit: SimUnit,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Rc<AircraftVariable> {
        let key = format!("{}:{}:{}", name, index, unit);
        if let Some(existing) = self.aircraft_variables.get(&key) {
            trace!(variable = name, index, %unit, "Returning existing aircraft variable");
            widen(&**existing, update_mode, max_age_time, max_age_ticks);
            return existing.clone();
        }

        let variable = Rc::new(AircraftVariable::new(
            self.host.clone(),
            name,
            index,
            unit,
            setter,
            update_mode,
            max_age_time,
            max_age_ticks,
            self.options.default_epsilon,
        ));
        variable.set_warn_if_dirty(self.options.warn_if_dirty);
        debug!(variable = %variable, "Created aircraft variable");

        self.aircraft_variables.insert(key, variable.clone());
        variable
    }

    /// Returns the read-only aircraft variable of the given name and unit at
    /// index 0.
    pub fn make_simple_aircraft_var(
        &mut self,
        name: &str,
        unit: SimUnit,
        auto_read: bool,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Rc<AircraftVariable> {
        self.make_aircraft_var(
            name,
            0,
            AircraftVariableSetter::ReadOnly,
            unit,
            UpdateMode::new(auto_read, false),
            max_age_time,
            max_age_ticks,
        )
    }

    /// Creates a data definition variable. Every call creates a new variable
    /// with its own definition and request, even for the same name.
    ///
    /// # Panics
    ///
    /// When the sizes of the definitions do not add up to the size of `T`.
    pub fn make_datadefinition_var<T: SimData>(
        &mut self,
        name: &str,
        definitions: Vec<DataDefinition>,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Rc<DataDefinitionVariable<T>> {
        let variable = Rc::new(DataDefinitionVariable::new(
            self.host.clone(),
            name,
            definitions,
            self.definition_ids.next_id(),
            self.request_ids.next_id(),
            update_mode,
            max_age_time,
            max_age_ticks,
        ));
        self.register_sim_object(variable.clone());

        variable
    }

    /// Creates a client data area variable. Every call creates a new variable
    /// with its own client data area, definition and request.
    pub fn make_clientdataarea_var<T: SimData>(
        &mut self,
        name: &str,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Rc<ClientDataAreaVariable<T>> {
        let variable = Rc::new(ClientDataAreaVariable::new(
            self.host.clone(),
            name,
            self.client_data_ids.next_id(),
            self.definition_ids.next_id(),
            self.request_ids.next_id(),
            update_mode,
            max_age_time,
            max_age_ticks,
        ));
        self.register_sim_object(variable.clone());

        variable
    }

    /// Creates a client data area variable which receives its content in
    /// chunks of `CHUNK_SIZE` bytes.
    pub fn make_clientdatabufferedarea_var<const CHUNK_SIZE: usize>(
        &mut self,
        name: &str,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Rc<ClientDataBufferedAreaVariable<CHUNK_SIZE>> {
        let variable = Rc::new(ClientDataBufferedAreaVariable::new(
            self.host.clone(),
            name,
            self.client_data_ids.next_id(),
            self.definition_ids.next_id(),
            self.request_ids.next_id(),
            update_mode,
            max_age_time,
            max_age_ticks,
        ));
        self.register_sim_object(variable.clone());

        variable
    }

    fn register_sim_object(&mut self, sim_object: Rc<dyn SimObject>) {
        sim_object.set_stamp_policy(self.options.stamp_policy);
        debug!(
            object = sim_object.name(),
            request_id = sim_object.request_id(),
            definition_id = sim_object.definition_id(),
            "Created sim object"
        );

        self.sim_objects.insert(sim_object.request_id(), sim_object);
    }

    /// Returns the event of the given simulator event name, creating it when
    /// it does not exist yet. The event joins the default notification group
    /// once a callback is added.
    pub fn make_event(&mut self, name: &str, mask_event: bool) -> Rc<ClientEvent> {
        if let Some(existing) = self.find_event(name) {
            return existing;
        }

        let event = Rc::new(ClientEvent::new(
            self.host.clone(),
            self.event_ids.next_id(),
            name,
            true,
            Some(DEFAULT_NOTIFICATION_GROUP),
            mask_event,
        ));
        self.register_event(event)
    }

    /// Returns the client event of the given name, creating it when it does not
    /// exist yet. A newly created event is added to the given notification
    /// group right away.
    pub fn make_client_event(
        &mut self,
        name: &str,
        register_to_sim: bool,
        notification_group: Option<NotificationGroupId>,
    ) -> Rc<ClientEvent> {
        if let Some(existing) = self.find_event(name) {
            return existing;
        }

        let event = Rc::new(ClientEvent::new(
            self.host.clone(),
            self.event_ids.next_id(),
            name,
            register_to_sim,
            None,
            false,
        ));
        if let Some(group) = notification_group {
            event.add_to_notification_group(group, false);
        }

        self.register_event(event)
    }

    fn find_event(&self, name: &str) -> Option<Rc<ClientEvent>> {
        let existing = self
            .client_events
            .values()
            .find(|event| event.name() == name)
            .cloned();
        if existing.is_some() {
            trace!(event = name, "Returning existing event");
        }

        existing
    }

    fn register_event(&mut self, event: Rc<ClientEvent>) -> Rc<ClientEvent> {
        debug!(event = %event, "Created event");
        self.client_events.insert(event.id(), event.clone());
        event
    }

    /// Adds a callback invoked whenever the simulator raises the key event.
    pub fn add_key_event_callback(
        &mut self,
        key_event_id: KeyEventId,
        callback: EventCallback,
    ) -> CallbackId {
        let id = self.callback_ids.next_id();
        self.key_event_callbacks
            .entry(key_event_id)
            .or_default()
            .insert(id, callback);
        debug!(key_event_id, callback_id = id, "Added key event callback");

        id
    }

    pub fn remove_key_event_callback(
        &mut self,
        key_event_id: KeyEventId,
        callback_id: CallbackId,
    ) -> bool {
        let callbacks = match self.key_event_callbacks.get_mut(&key_event_id) {
            Some(callbacks) => callbacks,
            None => {
                warn!(key_event_id, "Cannot remove callback of key event without callbacks");
                return false;
            }
        };

        if callbacks.remove(&callback_id).is_none() {
            warn!(key_event_id, callback_id, "Cannot remove unknown key event callback");
            return false;
        }
        if callbacks.is_empty() {
            self.key_event_callbacks.remove(&key_event_id);
        }

        true
    }

    pub fn send_key_event(&self, key_event_id: KeyEventId, data: [u32; 5]) -> bool {
        match self.host.trigger_key_event(key_event_id, data) {
            Ok(()) => true,
            Err(err) => {
                error!(key_event_id, %err, "Failed to send key event");
                false
            }
        }
    }

    /// Invokes the callbacks of the key event in the order they were added.
    pub fn process_key_event(&self, key_event_id: KeyEventId, data: [u32; 5]) {
        let callbacks: Vec<EventCallback> = match self.key_event_callbacks.get(&key_event_id) {
            Some(callbacks) => callbacks.values().cloned().collect(),
            None => return,
        };

        trace!(key_event_id, ?data, callbacks = callbacks.len(), "Processing key event");
        let parameters = EventParameters::extended(data);
        for callback in callbacks {
            callback(&parameters);
        }
    }

    /// Reads every variable and requests every sim object which is read
    /// automatically, then handles every message the simulator sent.
    pub fn pre_update(&mut self, context: &UpdateContext) -> bool {
        if !self.is_initialized {
            error!("Pre update called on a data manager which is not initialized");
            return false;
        }

        self.time_stamp = context.simulation_time;
        self.tick_counter = context.tick_counter;

        for variable in self.named_variables.values().filter(|v| v.is_auto_read()) {
            variable.update_from_sim(self.time_stamp, self.tick_counter);
        }
        for variable in self.aircraft_variables.values().filter(|v| v.is_auto_read()) {
            variable.update_from_sim(self.time_stamp, self.tick_counter);
        }
        for sim_object in self.sim_objects.values().filter(|o| o.is_auto_read()) {
            if !sim_object.request_update_from_sim(self.time_stamp, self.tick_counter) {
                error!(object = sim_object.name(), "Failed to request update");
            }
        }

        self.get_requested_data();

        true
    }

    /// Handles messages until the simulator's dispatch queue is empty. Returns
    /// the number of handled messages.
    pub fn get_requested_data(&self) -> usize {
        let mut count = 0;
        while let Some(message) = self.host.next_dispatch() {
            self.process_dispatch_message(message);
            count += 1;
        }

        count
    }

    pub fn process_dispatch_message(&self, message: DispatchMessage) {
        match message {
            DispatchMessage::SimObjectData(data) | DispatchMessage::ClientData(data) => {
                self.process_sim_data(&data)
            }
            DispatchMessage::Event { event_id, data } => match self.client_events.get(&event_id) {
                Some(event) => event.process_event(data),
                None => warn!(event_id, "Received unknown event"),
            },
            DispatchMessage::EventEx1 { event_id, data } => {
                match self.client_events.get(&event_id) {
                    Some(event) => event.process_event_ex1(data),
                    None => warn!(event_id, "Received unknown extended event"),
                }
            }
            DispatchMessage::KeyEvent { key_event_id, data } => {
                self.process_key_event(key_event_id, data)
            }
            DispatchMessage::Open => info!("Connected to the simulator"),
            DispatchMessage::Quit => info!("The simulator quit"),
            DispatchMessage::Exception {
                exception,
                send_id,
                index,
            } => {
                let kind = SimConnectException::from_u32(exception);
                error!(exception, ?kind, send_id, index, "The simulator reported an exception");
            }
            DispatchMessage::Other(kind) => trace!(kind, "Ignoring message"),
        }
    }

    fn process_sim_data(&self, data: &SimDataMessage) {
        match self.sim_objects.get(&data.request_id) {
            Some(sim_object) => {
                sim_object.process_sim_data(data, self.time_stamp, self.tick_counter)
            }
            None => warn!(request_id = data.request_id, "Received data of unknown request"),
        }
    }

    /// Writes every variable and sim object which is written automatically.
    /// Variables are only written when their value was set since the last write.
    pub fn post_update(&mut self, _context: &UpdateContext) -> bool {
        if !self.is_initialized {
            error!("Post update called on a data manager which is not initialized");
            return false;
        }

        for variable in self.named_variables.values().filter(|v| v.is_auto_write()) {
            variable.update_to_sim();
        }
        for variable in self.aircraft_variables.values().filter(|v| v.is_auto_write()) {
            variable.update_to_sim();
        }
        for sim_object in self.sim_objects.values().filter(|o| o.is_auto_write()) {
            if !sim_object.write_data_to_sim() {
                error!(object = sim_object.name(), "Failed to write data");
            }
        }

        true
    }

    /// Releases everything the data manager owns. Objects still referenced
    /// elsewhere live on, but are no longer updated.
    pub fn shutdown(&mut self) {
        self.is_initialized = false;
        self.named_variables.clear();
        self.aircraft_variables.clear();
        self.sim_objects.clear();
        self.client_events.clear();
        self.key_event_callbacks.clear();

        info!("Data manager shut down");
    }
}

fn widen<T: ManagedData + ?Sized>(
    existing: &T,
    update_mode: UpdateMode,
    max_age_time: Time,
    max_age_ticks: u64,
) {
    let current = existing.managed().update_mode();
    let widened = current.union(update_mode);
    if widened.auto_read != current.auto_read {
        existing.set_auto_read(true);
    }
    if widened.auto_write != current.auto_write {
        existing.set_auto_write(true);
    }
    if max_age_time < existing.max_age_time() {
        existing.set_max_age_time(max_age_time);
    }
    if max_age_ticks < existing.max_age_ticks() {
        existing.set_max_age_ticks(max_age_ticks);
    }
}
