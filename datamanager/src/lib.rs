mod data_manager;
pub use data_manager::{DataManager, DataManagerOptions};

pub mod events;
pub mod managed_data_object;
pub mod shared;
pub mod sim_objects;
pub mod simulation;
pub mod variables;
