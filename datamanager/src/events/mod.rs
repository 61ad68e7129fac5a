//! Events sent to and received from the simulator.
use crate::{
    shared::{CallbackId, EventId, IdGenerator, InputGroupId, NotificationGroupId},
    simulation::{InputEventAction, SharedHost},
};
use itertools::Itertools;
use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    rc::Rc,
};
use tracing::{debug, error, trace, warn};

/// The notification group events join when none is given.
pub const DEFAULT_NOTIFICATION_GROUP: NotificationGroupId = 0;

/// The priority of notification groups this crate subscribes to.
pub const HIGHEST_PRIORITY: u32 = 1;

/// The parameters an event was raised with. Plain events carry one parameter,
/// extended events carry five.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventParameters {
    pub count: usize,
    pub data: [u32; 5],
}
impl EventParameters {
    pub fn single(data: u32) -> Self {
        Self {
            count: 1,
            data: [data, 0, 0, 0, 0],
        }
    }

    pub fn extended(data: [u32; 5]) -> Self {
        Self { count: 5, data }
    }

    pub fn first(&self) -> u32 {
        self.data[0]
    }
}

pub type EventCallback = Rc<dyn Fn(&EventParameters)>;

/// An event which can be triggered in the simulator and whose occurrences can
/// be listened to.
///
/// The event subscribes to its notification group when the first callback is
/// added and unsubscribes when the last callback is removed.
pub struct ClientEvent {
    host: SharedHost,
    id: EventId,
    name: String,
    registered_to_sim: Cell<bool>,
    notification_group: Cell<Option<NotificationGroupId>>,
    mask_event: Cell<bool>,
    subscribed_to_sim: Cell<bool>,
    system_event: RefCell<Option<String>>,
    callback_ids: RefCell<IdGenerator<CallbackId>>,
    callbacks: RefCell<BTreeMap<CallbackId, EventCallback>>,
    input_definitions: RefCell<Vec<(InputGroupId, String)>>,
}
impl ClientEvent {
    pub(crate) fn new(
        host: SharedHost,
        id: EventId,
        name: &str,
        register_to_sim: bool,
        notification_group: Option<NotificationGroupId>,
        mask_event: bool,
    ) -> Self {
        let event = Self {
            host,
            id,
            name: name.to_owned(),
            registered_to_sim: Cell::new(false),
            notification_group: Cell::new(notification_group),
            mask_event: Cell::new(mask_event),
            subscribed_to_sim: Cell::new(false),
            system_event: RefCell::new(None),
            callback_ids: RefCell::new(IdGenerator::new()),
            callbacks: RefCell::new(BTreeMap::new()),
            input_definitions: RefCell::new(vec![]),
        };

        if register_to_sim {
            event.map_to_sim_event();
        }

        event
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_registered_to_sim(&self) -> bool {
        self.registered_to_sim.get()
    }

    pub fn is_subscribed_to_sim(&self) -> bool {
        self.subscribed_to_sim.get()
    }

    pub fn notification_group(&self) -> Option<NotificationGroupId> {
        self.notification_group.get()
    }

    /// The simulator system event this event is subscribed to, if any.
    pub fn system_event(&self) -> Option<String> {
        self.system_event.borrow().clone()
    }

    /// Maps the event to the simulator event of the same name.
    pub fn map_to_sim_event(&self) -> bool {
        if self.registered_to_sim.get() {
            debug!(event = %self.name, "Event is already mapped to a simulator event");
            return true;
        }

        match self.host.map_client_event_to_sim_event(self.id, &self.name) {
            Ok(()) => {
                self.registered_to_sim.set(true);
                debug!(event = %self.name, id = self.id, "Mapped event to simulator event");
                true
            }
            Err(err) => {
                error!(event = %self.name, %err, "Failed to map event to simulator event");
                false
            }
        }
    }

    /// Subscribes to a simulator system event such as `Pause_EX1`. Its
    /// occurrences are received as occurrences of this event.
    pub fn subscribe_to_sim_system_event(&self, system_event_name: &str) -> bool {
        if let Some(current) = self.system_event.borrow().as_deref() {
            warn!(event = %self.name, system_event = current, "Event is already subscribed to a system event");
            return false;
        }

        match self.host.subscribe_to_system_event(self.id, system_event_name) {
            Ok(()) => {
                *self.system_event.borrow_mut() = Some(system_event_name.to_owned());
                debug!(event = %self.name, system_event = system_event_name, "Subscribed to system event");
                true
            }
            Err(err) => {
                error!(event = %self.name, system_event = system_event_name, %err, "Failed to subscribe to system event");
                false
            }
        }
    }

    pub fn unsubscribe_from_sim_system_event(&self) -> bool {
        let system_event = match self.system_event() {
            Some(system_event) => system_event,
            None => {
                warn!(event = %self.name, "Event is not subscribed to a system event");
                return false;
            }
        };

        match self.host.unsubscribe_from_system_event(self.id) {
            Ok(()) => {
                *self.system_event.borrow_mut() = None;
                debug!(event = %self.name, %system_event, "Unsubscribed from system event");
                true
            }
            Err(err) => {
                error!(event = %self.name, %system_event, %err, "Failed to unsubscribe from system event");
                false
            }
        }
    }

    /// Turns the reporting of the subscribed system event on or off.
    pub fn set_system_event_state(&self, enabled: bool) -> bool {
        match self.host.set_system_event_state(self.id, enabled) {
            Ok(()) => {
                debug!(event = %self.name, enabled, "Set system event state");
                true
            }
            Err(err) => {
                error!(event = %self.name, enabled, %err, "Failed to set system event state");
                false
            }
        }
    }

    pub fn trigger(&self, data: u32) -> bool {
        if !self.can_trigger() {
            return false;
        }

        match self.host.transmit_client_event(self.id, data) {
            Ok(()) => true,
            Err(err) => {
                error!(event = %self.name, %err, "Failed to trigger event");
                false
            }
        }
    }

    pub fn trigger_ex1(&self, data: [u32; 5]) -> bool {
        if !self.can_trigger() {
            return false;
        }

        match self.host.transmit_client_event_ex1(self.id, data) {
            Ok(()) => true,
            Err(err) => {
                error!(event = %self.name, %err, "Failed to trigger event");
                false
            }
        }
    }

    fn can_trigger(&self) -> bool {
        if !self.registered_to_sim.get() {
            error!(event = %self.name, "Cannot trigger an event which is not mapped to a simulator event");
        }
        self.registered_to_sim.get()
    }

    pub fn add_callback(&self, callback: EventCallback) -> CallbackId {
        let id = self.callback_ids.borrow_mut().next_id();
        self.callbacks.borrow_mut().insert(id, callback);

        if !self.subscribed_to_sim.get() && self.notification_group.get().is_some() {
            self.subscribe_to_sim();
        }

        id
    }

    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let removed = self.callbacks.borrow_mut().remove(&id).is_some();
        if !removed {
            warn!(event = %self.name, callback = id, "Cannot remove unknown callback");
            return false;
        }

        if self.callbacks.borrow().is_empty() && self.subscribed_to_sim.get() {
            self.unsubscribe_from_sim();
        }

        true
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Passes the parameter of a plain occurrence of the event to every callback.
    pub fn process_event(&self, data: u32) {
        self.invoke_callbacks(&EventParameters::single(data));
    }

    /// Passes the parameters of an extended occurrence of the event to every callback.
    pub fn process_event_ex1(&self, data: [u32; 5]) {
        self.invoke_callbacks(&EventParameters::extended(data));
    }

    fn invoke_callbacks(&self, parameters: &EventParameters) {
        let callbacks: Vec<EventCallback> = self.callbacks.borrow().values().cloned().collect();
        trace!(event = %self.name, ?parameters, count = callbacks.len(), "Processing event");
        callbacks.iter().for_each(|callback| callback(parameters));
    }

    /// Adds the event to its notification group, so the simulator notifies this
    /// client of its occurrences.
    pub fn subscribe_to_sim(&self) -> bool {
        if self.subscribed_to_sim.get() {
            error!(event = %self.name, "Event is already subscribed to the simulator");
            return false;
        }

        let group = match self.notification_group.get() {
            Some(group) => group,
            None => {
                error!(event = %self.name, "Cannot subscribe an event without notification group");
                return false;
            }
        };

        if let Err(err) = self.host.add_client_event_to_notification_group(
            group,
            self.id,
            self.mask_event.get(),
        ) {
            error!(event = %self.name, group, %err, "Failed to add event to notification group");
            return false;
        }

        self.subscribed_to_sim.set(true);
        self.set_notification_group_priority(group, HIGHEST_PRIORITY);
        debug!(event = %self.name, group, "Subscribed event to the simulator");

        true
    }

    pub fn unsubscribe_from_sim(&self) -> bool {
        if !self.subscribed_to_sim.get() {
            warn!(event = %self.name, "Event is not subscribed to the simulator");
            return false;
        }

        let group = self
            .notification_group
            .get()
            .unwrap_or(DEFAULT_NOTIFICATION_GROUP);
        if let Err(err) = self.host.remove_client_event(group, self.id) {
            error!(event = %self.name, group, %err, "Failed to remove event from notification group");
            return false;
        }

        self.subscribed_to_sim.set(false);
        debug!(event = %self.name, group, "Unsubscribed event from the simulator");

        true
    }

    pub fn add_to_notification_group(&self, group: NotificationGroupId, mask_event: bool) -> bool {
        if self.subscribed_to_sim.get() {
            error!(event = %self.name, "Event is already subscribed to the simulator");
            return false;
        }

        self.notification_group.set(Some(group));
        self.mask_event.set(mask_event);
        self.subscribe_to_sim()
    }

    pub fn remove_from_notification_group(&self) -> bool {
        self.unsubscribe_from_sim()
    }

    /// Removes all events from the given notification group. Events of this
    /// client in the group are no longer subscribed afterwards.
    pub fn clear_notification_group(&self, group: NotificationGroupId) -> bool {
        match self.host.clear_notification_group(group) {
            Ok(()) => {
                if self.notification_group.get() == Some(group) {
                    self.subscribed_to_sim.set(false);
                }
                true
            }
            Err(err) => {
                error!(event = %self.name, group, %err, "Failed to clear notification group");
                false
            }
        }
    }

    pub fn set_notification_group_priority(&self, group: NotificationGroupId, priority: u32) -> bool {
        match self.host.set_notification_group_priority(group, priority) {
            Ok(()) => true,
            Err(err) => {
                error!(event = %self.name, group, priority, %err, "Failed to set notification group priority");
                false
            }
        }
    }

    /// Maps an input (e.g. "VK_LCONTROL+A") to this event for both its down and up transition.
    pub fn map_input_down_up_event(
        &self,
        input_group: InputGroupId,
        input_definition: &str,
        down_value: u32,
        up_value: u32,
        maskable: bool,
    ) -> bool {
        self.map_input_event(
            input_group,
            input_definition,
            Some(down_value),
            Some(up_value),
            maskable,
        )
    }

    pub fn map_input_down_event(
        &self,
        input_group: InputGroupId,
        input_definition: &str,
        value: u32,
        maskable: bool,
    ) -> bool {
        self.map_input_event(input_group, input_definition, Some(value), None, maskable)
    }

    pub fn map_input_up_event(
        &self,
        input_group: InputGroupId,
        input_definition: &str,
        value: u32,
        maskable: bool,
    ) -> bool {
        self.map_input_event(input_group, input_definition, None, Some(value), maskable)
    }

    fn map_input_event(
        &self,
        input_group: InputGroupId,
        input_definition: &str,
        down_value: Option<u32>,
        up_value: Option<u32>,
        maskable: bool,
    ) -> bool {
        let action = |value| InputEventAction {
            event_id: self.id,
            value,
        };

        match self.host.map_input_event_to_client_event(
            input_group,
            input_definition,
            down_value.map(action),
            up_value.map(action),
            maskable,
        ) {
            Ok(()) => {
                self.input_definitions
                    .borrow_mut()
                    .push((input_group, input_definition.to_owned()));
                debug!(event = %self.name, input_group, input_definition, "Mapped input to event");
                true
            }
            Err(err) => {
                error!(event = %self.name, input_group, input_definition, %err, "Failed to map input to event");
                false
            }
        }
    }

    pub fn unmap_input_event(&self, input_group: InputGroupId, input_definition: &str) -> bool {
        match self.host.remove_input_event(input_group, input_definition) {
            Ok(()) => {
                self.input_definitions
                    .borrow_mut()
                    .retain(|(group, definition)| {
                        !(*group == input_group && definition == input_definition)
                    });
                true
            }
            Err(err) => {
                error!(event = %self.name, input_group, input_definition, %err, "Failed to unmap input from event");
                false
            }
        }
    }

    pub fn clear_input_group(&self, input_group: InputGroupId) -> bool {
        match self.host.clear_input_group(input_group) {
            Ok(()) => {
                self.input_definitions
                    .borrow_mut()
                    .retain(|(group, _)| *group != input_group);
                true
            }
            Err(err) => {
                error!(event = %self.name, input_group, %err, "Failed to clear input group");
                false
            }
        }
    }

    pub fn set_input_group_state(&self, input_group: InputGroupId, enabled: bool) -> bool {
        match self.host.set_input_group_state(input_group, enabled) {
            Ok(()) => true,
            Err(err) => {
                error!(event = %self.name, input_group, enabled, %err, "Failed to set input group state");
                false
            }
        }
    }

    pub fn input_definitions(&self) -> Vec<(InputGroupId, String)> {
        self.input_definitions.borrow().clone()
    }
}
impl Drop for ClientEvent {
    fn drop(&mut self) {
        if self.subscribed_to_sim.get() {
            self.unsubscribe_from_sim();
        }
        if self.system_event.borrow().is_some() {
            self.unsubscribe_from_sim_system_event();
        }
    }
}
impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [id: {}, registered: {}, subscribed: {}, callbacks: {}",
            self.name,
            self.id,
            self.registered_to_sim.get(),
            self.subscribed_to_sim.get(),
            self.callbacks.borrow().len()
        )?;

        if let Some(system_event) = self.system_event.borrow().as_deref() {
            write!(f, ", system event: {}", system_event)?;
        }

        let inputs = self.input_definitions.borrow();
        if !inputs.is_empty() {
            write!(
                f,
                ", inputs: {}",
                inputs
                    .iter()
                    .map(|(group, definition)| format!("{}/{}", group, definition))
                    .join(", ")
            )?;
        }

        write!(f, "]")
    }
}
