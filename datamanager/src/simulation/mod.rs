//! Provides all the necessary types for running the data manager inside
//! Microsoft Flight Simulator, or against a test double of it.
use crate::{
    events::{ClientEvent, EventParameters},
    managed_data_object::ManagedData,
    shared::{SimUnit, UpdateMode},
    sim_objects::{DataDefinition, DataDefinitionVariable, SimObject, StampPolicy},
    variables::NamedVariable,
    DataManager,
};
use std::{rc::Rc, time::Duration};
use tracing::{debug, error, info, trace};
use uom::si::{f64::*, time::second};

mod host;
pub use host::*;

mod update_context;
#[cfg(test)]
pub use update_context::test_helpers;
pub use update_context::UpdateContext;


/// A unit of aircraft logic which uses the data manager to read and write the
/// simulator's state.
///
/// Every method returns whether it succeeded.
pub trait Module {
    fn name(&self) -> &str;

    fn initialize(&mut self, data_manager: &mut DataManager) -> bool;

    /// Called after the data manager read the automatically read data.
    fn pre_update(&mut self, _data_manager: &mut DataManager, _context: &UpdateContext) -> bool {
        true
    }

    fn update(&mut self, data_manager: &mut DataManager, context: &UpdateContext) -> bool;

    /// Called after the data manager wrote the automatically written data.
    fn post_update(&mut self, _data_manager: &mut DataManager, _context: &UpdateContext) -> bool {
        true
    }

    fn shutdown(&mut self, _data_manager: &mut DataManager) -> bool {
        true
    }
}

/// The value of the pause system event while active pause is on. The aircraft
/// stands still, but systems keep running.
const ACTIVE_PAUSE: i64 = 4;

pub const PAUSE_SYSTEM_EVENT: &str = "Pause_EX1";

/// What the simulation itself needs from the simulator: the simulation time
/// and whether the simulator is paused.
struct BaseData {
    simulation_time: Rc<DataDefinitionVariable<f64>>,
    pause_detected: Rc<NamedVariable>,
    pause_event: Rc<ClientEvent>,
}
impl BaseData {
    fn new(data_manager: &mut DataManager) -> Option<Self> {
        let simulation_time = data_manager.make_datadefinition_var::<f64>(
            "BASE DATA",
            vec![DataDefinition::new("SIMULATION TIME", 0, SimUnit::SECONDS)],
            UpdateMode::NO_AUTO_UPDATE,
            Time::new::<second>(0.),
            0,
        );
        simulation_time.set_stamp_policy(StampPolicy::OnCompletion);
        if !simulation_time.request_periodic_data_from_sim(SimObjectPeriod::VisualFrame) {
            error!("Failed to request the simulation time");
            return None;
        }

        let pause_detected = data_manager.make_named_var(
            "A32NX_PAUSE_DETECTED",
            SimUnit::NUMBER,
            UpdateMode::NO_AUTO_UPDATE,
            Time::new::<second>(0.),
            0,
        );
        let pause_event = data_manager.make_client_event("A32NX.PAUSE_DETECTED_EVENT", false, None);
        let pause = pause_detected.clone();
        pause_event.add_callback(Rc::new(move |parameters: &EventParameters| {
            info!(pause = parameters.first(), "Pause detected");
            pause.set_and_write_to_sim(parameters.first() as f64);
        }));
        if !pause_event.subscribe_to_sim_system_event(PAUSE_SYSTEM_EVENT) {
            return None;
        }

        Some(Self {
            simulation_time,
            pause_detected,
            pause_event,
        })
    }

    /// All pause states except active pause stop the simulation.
    fn is_paused(&self) -> bool {
        let pause = self.pause_detected.read_from_sim() as i64;
        pause > 0 && pause != ACTIVE_PAUSE
    }

    /// The simulation time last reported by the simulator, if it reported one.
    fn reported_time(&self) -> Option<Time> {
        self.simulation_time
            .managed()
            .stamp()
            .map(|_| Time::new::<second>(*self.simulation_time.data()))
    }
}

/// Orchestrates every tick:
/// 1. Handling of the messages the simulator sent, and pause detection.
/// 2. Reading of data from the simulator.
/// 3. Updating of every module.
/// 4. Writing of changed data to the simulator.
pub struct Simulation {
    data_manager: DataManager,
    modules: Vec<Box<dyn Module>>,
    base_data: Option<BaseData>,
    tick_counter: u64,
    simulation_time: Time,
}
impl Simulation {
    pub fn new(data_manager: DataManager) -> Self {
        Simulation {
            data_manager,
            modules: vec![],
            base_data: None,
            tick_counter: 0,
            simulation_time: Time::new::<second>(0.),
        }
    }

    pub fn register_module(&mut self, module: Box<dyn Module>) {
        debug!(module = module.name(), "Registered module");
        self.modules.push(module);
    }

    pub fn data_manager(&self) -> &DataManager {
        &self.data_manager
    }

    pub fn data_manager_mut(&mut self) -> &mut DataManager {
        &mut self.data_manager
    }

    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }

    pub fn simulation_time(&self) -> Time {
        self.simulation_time
    }

    /// Subscribes to the simulation time and pause state, then initializes
    /// every module. All modules are initialized, even when one of them fails.
    pub fn initialize(&mut self) -> bool {
        self.base_data = BaseData::new(&mut self.data_manager);
        if self.base_data.is_none() {
            error!("Failed to initialize the base data of the simulation");
            return false;
        }

        let mut succeeded = true;
        for module in self.modules.iter_mut() {
            let result = module.initialize(&mut self.data_manager);
            succeeded &= Self::checked(&**module, "initialize", result);
        }

        succeeded
    }

    /// Runs one tick, unless the simulator is paused. The simulation time is
    /// the one reported by the simulator. Until it reported one, the time
    /// advances by `delta`.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.data_manager.get_requested_data();

        if let Some(base_data) = &self.base_data {
            if base_data.is_paused() {
                trace!("Skipping tick while the simulator is paused");
                return true;
            }
        }

        self.tick_counter += 1;
        self.simulation_time = match self.base_data.as_ref().and_then(BaseData::reported_time) {
            Some(simulation_time) => simulation_time,
            None => self.simulation_time + Time::new::<second>(delta.as_secs_f64()),
        };
        let context = UpdateContext::new(delta, self.simulation_time, self.tick_counter);

        if !self.data_manager.pre_update(&context) {
            return false;
        }

        let mut succeeded = true;
        for module in self.modules.iter_mut() {
            let result = module.pre_update(&mut self.data_manager, &context);
            succeeded &= Self::checked(&**module, "pre update", result);
        }

        for module in self.modules.iter_mut() {
            let result = module.update(&mut self.data_manager, &context);
            succeeded &= Self::checked(&**module, "update", result);
        }

        if !self.data_manager.post_update(&context) {
            return false;
        }

        for module in self.modules.iter_mut() {
            let result = module.post_update(&mut self.data_manager, &context);
            succeeded &= Self::checked(&**module, "post update", result);
        }

        succeeded
    }

    /// Shuts down every module and then the data manager.
    pub fn shutdown(&mut self) -> bool {
        let mut succeeded = true;
        for module in self.modules.iter_mut() {
            let result = module.shutdown(&mut self.data_manager);
            succeeded &= Self::checked(&**module, "shutdown", result);
        }
        if let Some(base_data) = self.base_data.take() {
            base_data.pause_event.unsubscribe_from_sim_system_event();
        }
        self.data_manager.shutdown();

        succeeded
    }

    fn checked(module: &dyn Module, step: &str, succeeded: bool) -> bool {
        if !succeeded {
            error!(module = module.name(), step, "Module failed");
        }

        succeeded
    }
}

/// Converts a given `f64` representing a boolean value in the simulator into an actual `bool` value.
pub fn to_bool(value: f64) -> bool {
    (value - 1.).abs() < f64::EPSILON
}

/// Converts a given `bool` value into an `f64` representing that boolean value in the simulator.
pub fn from_bool(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
