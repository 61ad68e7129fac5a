use crate::shared::{CallbackId, IdGenerator, UpdateMode};
use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    rc::Rc,
};
use tracing::trace;
use uom::si::{f64::*, time::second};

/// Invoked whenever a managed object reports a change.
pub type ChangeCallback = Rc<dyn Fn()>;

/// The simulation time and tick at which data was last taken from the simulator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateStamp {
    pub time: Time,
    pub tick: u64,
}

/// Staleness bookkeeping, the change signal and the change listeners shared by
/// every kind of managed data.
///
/// All methods take `&self`, so a callback may freely inspect (and even modify)
/// the object which invoked it.
pub struct ManagedDataObject {
    name: String,
    update_mode: Cell<UpdateMode>,
    max_age_time: Cell<Time>,
    max_age_ticks: Cell<u64>,
    stamp: Cell<Option<UpdateStamp>>,
    changed: Cell<bool>,
    skip_change_check: Cell<bool>,
    callback_ids: RefCell<IdGenerator<CallbackId>>,
    callbacks: RefCell<BTreeMap<CallbackId, ChangeCallback>>,
}
impl ManagedDataObject {
    pub fn new(
        name: impl Into<String>,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Self {
        Self {
            name: name.into(),
            update_mode: Cell::new(update_mode),
            max_age_time: Cell::new(max_age_time),
            max_age_ticks: Cell::new(max_age_ticks),
            stamp: Cell::new(None),
            changed: Cell::new(false),
            skip_change_check: Cell::new(false),
            callback_ids: RefCell::new(IdGenerator::new()),
            callbacks: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stale when never updated, or when both the time and the tick stamp
    /// are older than their maximum age.
    pub fn needs_update_from_sim(&self, time: Time, tick: u64) -> bool {
        match self.stamp.get() {
            None => true,
            Some(stamp) => {
                stamp.time + self.max_age_time.get() < time
                    && stamp.tick + self.max_age_ticks.get() < tick
            }
        }
    }

    pub fn update_stamps(&self, time: Time, tick: u64) {
        self.stamp.set(Some(UpdateStamp { time, tick }));
    }

    pub fn stamp(&self) -> Option<UpdateStamp> {
        self.stamp.get()
    }

    pub fn time_stamp(&self) -> Option<Time> {
        self.stamp.get().map(|stamp| stamp.time)
    }

    pub fn tick_stamp(&self) -> Option<u64> {
        self.stamp.get().map(|stamp| stamp.tick)
    }

    pub fn has_changed(&self) -> bool {
        self.changed.get()
    }

    /// Setting the changed flag invokes every callback in registration order.
    /// The callbacks registered at the moment of the call are the ones invoked.
    pub fn set_changed(&self, changed: bool) {
        self.changed.set(changed);

        if changed {
            let callbacks: Vec<ChangeCallback> =
                self.callbacks.borrow().values().cloned().collect();
            trace!(variable = %self.name, count = callbacks.len(), "Invoking change callbacks");
            callbacks.iter().for_each(|callback| callback());
        }
    }

    pub fn add_callback(&self, callback: ChangeCallback) -> CallbackId {
        let id = self.callback_ids.borrow_mut().next_id();
        self.callbacks.borrow_mut().insert(id, callback);
        id
    }

    pub fn remove_callback(&self, id: CallbackId) -> bool {
        self.callbacks.borrow_mut().remove(&id).is_some()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode.get()
    }

    pub fn is_auto_read(&self) -> bool {
        self.update_mode.get().auto_read
    }

    pub fn set_auto_read(&self, auto_read: bool) {
        let mode = self.update_mode.get();
        self.update_mode.set(UpdateMode::new(auto_read, mode.auto_write));
    }

    pub fn is_auto_write(&self) -> bool {
        self.update_mode.get().auto_write
    }

    pub fn set_auto_write(&self, auto_write: bool) {
        let mode = self.update_mode.get();
        self.update_mode.set(UpdateMode::new(mode.auto_read, auto_write));
    }

    pub fn max_age_time(&self) -> Time {
        self.max_age_time.get()
    }

    pub fn set_max_age_time(&self, max_age_time: Time) {
        self.max_age_time.set(max_age_time);
    }

    pub fn max_age_ticks(&self) -> u64 {
        self.max_age_ticks.get()
    }

    pub fn set_max_age_ticks(&self, max_age_ticks: u64) {
        self.max_age_ticks.set(max_age_ticks);
    }

    pub fn skip_change_check(&self) -> bool {
        self.skip_change_check.get()
    }

    pub fn set_skip_change_check(&self, skip_change_check: bool) {
        self.skip_change_check.set(skip_change_check);
    }
}
impl fmt::Display for ManagedDataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, max age {}s/{} ticks, changed: {}",
            self.name,
            self.update_mode.get(),
            self.max_age_time.get().get::<second>(),
            self.max_age_ticks.get(),
            self.changed.get(),
        )?;

        match self.stamp.get() {
            Some(stamp) => write!(
                f,
                ", stamped at {}s/tick {}]",
                stamp.time.get::<second>(),
                stamp.tick
            ),
            None => write!(f, ", never updated]"),
        }
    }
}

/// Gives access to the [`ManagedDataObject`] every managed variable is composed of.
///
/// Implementors override the provided methods when a setting is restricted,
/// e.g. a read-only variable refusing to be written automatically.
pub trait ManagedData {
    fn managed(&self) -> &ManagedDataObject;

    fn name(&self) -> &str {
        self.managed().name()
    }

    fn has_changed(&self) -> bool {
        self.managed().has_changed()
    }

    fn needs_update_from_sim(&self, time: Time, tick: u64) -> bool {
        self.managed().needs_update_from_sim(time, tick)
    }

    fn add_callback(&self, callback: ChangeCallback) -> CallbackId {
        self.managed().add_callback(callback)
    }

    fn remove_callback(&self, id: CallbackId) -> bool {
        self.managed().remove_callback(id)
    }

    fn is_auto_read(&self) -> bool {
        self.managed().is_auto_read()
    }

    fn set_auto_read(&self, auto_read: bool) {
        self.managed().set_auto_read(auto_read);
    }

    fn is_auto_write(&self) -> bool {
        self.managed().is_auto_write()
    }

    fn set_auto_write(&self, auto_write: bool) {
        self.managed().set_auto_write(auto_write);
    }

    fn max_age_time(&self) -> Time {
        self.managed().max_age_time()
    }

    fn set_max_age_time(&self, max_age_time: Time) {
        self.managed().set_max_age_time(max_age_time);
    }

    fn max_age_ticks(&self) -> u64 {
        self.managed().max_age_ticks()
    }

    fn set_max_age_ticks(&self, max_age_ticks: u64) {
        self.managed().set_max_age_ticks(max_age_ticks);
    }

    fn skip_change_check(&self) -> bool {
        self.managed().skip_change_check()
    }

    fn set_skip_change_check(&self, skip_change_check: bool) {
        self.managed().set_skip_change_check(skip_change_check);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seconds(value: f64) -> Time {
        Time::new::<second>(value)
    }

    fn managed(max_age_time: f64, max_age_ticks: u64) -> ManagedDataObject {
        ManagedDataObject::new(
            "TEST",
            UpdateMode::NO_AUTO_UPDATE,
            seconds(max_age_time),
            max_age_ticks,
        )
    }

    #[test]
    fn never_updated_object_needs_update() {
        let object = managed(100., 100);

        assert!(object.needs_update_from_sim(seconds(0.), 0));
    }

    #[test]
    fn zero_max_age_needs_no_update_within_the_same_tick() {
        let object = managed(0., 0);
        object.update_stamps(seconds(1.), 1);

        assert!(!object.needs_update_from_sim(seconds(1.), 1));
        assert!(object.needs_update_from_sim(seconds(1.1), 2));
    }

    #[test]
    fn only_time_being_stale_is_not_enough() {
        let object = managed(0.5, 10);
        object.update_stamps(seconds(1.), 1);

        assert!(!object.needs_update_from_sim(seconds(5.), 2));
    }

    #[test]
    fn only_ticks_being_stale_is_not_enough() {
        let object = managed(10., 0);
        object.update_stamps(seconds(1.), 1);

        assert!(!object.needs_update_from_sim(seconds(2.), 50));
    }

    #[test]
    fn stale_in_both_time_and_ticks_needs_update() {
        let object = managed(0.5, 10);
        object.update_stamps(seconds(1.), 1);

        assert!(object.needs_update_from_sim(seconds(1.6), 12));
    }

    #[test]
    fn set_changed_invokes_callbacks_in_registration_order() {
        let object = managed(0., 0);
        let calls = Rc::new(RefCell::new(vec![]));

        for n in 1..=3 {
            let calls = calls.clone();
            object.add_callback(Rc::new(move || calls.borrow_mut().push(n)));
        }
        object.set_changed(true);

        assert_eq!(*calls.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn clearing_changed_invokes_no_callbacks() {
        let object = managed(0., 0);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        object.add_callback(Rc::new(move || counter.set(counter.get() + 1)));

        object.set_changed(false);

        assert_eq!(calls.get(), 0);
        assert!(!object.has_changed());
    }

    #[test]
    fn removed_callback_is_no_longer_invoked() {
        let object = managed(0., 0);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let id = object.add_callback(Rc::new(move || counter.set(counter.get() + 1)));

        assert!(object.remove_callback(id));
        object.set_changed(true);

        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn removing_unknown_callback_returns_false() {
        let object = managed(0., 0);

        assert!(!object.remove_callback(42));
    }

    #[test]
    fn callback_added_during_invocation_runs_from_the_next_change_on() {
        let object = Rc::new(managed(0., 0));
        let late_calls = Rc::new(Cell::new(0));

        let weak_object = Rc::downgrade(&object);
        let counter = late_calls.clone();
        object.add_callback(Rc::new(move || {
            if let Some(object) = weak_object.upgrade() {
                let counter = counter.clone();
                object.add_callback(Rc::new(move || counter.set(counter.get() + 1)));
            }
        }));

        object.set_changed(true);
        assert_eq!(late_calls.get(), 0);

        object.set_changed(true);
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn callback_removed_during_invocation_still_runs_for_the_current_change() {
        let object = Rc::new(managed(0., 0));
        let second_calls = Rc::new(Cell::new(0));
        let second_id = Rc::new(Cell::new(0));

        let weak_object = Rc::downgrade(&object);
        let id_to_remove = second_id.clone();
        object.add_callback(Rc::new(move || {
            if let Some(object) = weak_object.upgrade() {
                object.remove_callback(id_to_remove.get());
            }
        }));
        let counter = second_calls.clone();
        second_id.set(object.add_callback(Rc::new(move || counter.set(counter.get() + 1))));

        object.set_changed(true);
        object.set_changed(true);

        assert_eq!(second_calls.get(), 1);
    }

    #[test]
    fn callback_can_read_the_object_that_invoked_it() {
        let object = Rc::new(managed(0., 0));
        let observed = Rc::new(Cell::new(false));

        let weak_object = Rc::downgrade(&object);
        let seen = observed.clone();
        object.add_callback(Rc::new(move || {
            if let Some(object) = weak_object.upgrade() {
                seen.set(object.has_changed());
            }
        }));
        object.set_changed(true);

        assert!(observed.get());
    }

    #[test]
    fn auto_flags_can_be_set_independently() {
        let object = managed(0., 0);

        object.set_auto_write(true);
        assert_eq!(object.update_mode(), UpdateMode::AUTO_WRITE);

        object.set_auto_read(true);
        assert_eq!(object.update_mode(), UpdateMode::AUTO_READ_WRITE);
    }
}
