use std::time::Duration;
use uom::si::f64::*;

/// Provides the timing of the current tick to the data manager and every
/// module handling it.
#[derive(Clone, Copy, Debug)]
pub struct UpdateContext {
    pub delta: Duration,
    pub simulation_time: Time,
    pub tick_counter: u64,
}
impl UpdateContext {
    pub fn new(delta: Duration, simulation_time: Time, tick_counter: u64) -> UpdateContext {
        UpdateContext {
            delta,
            simulation_time,
            tick_counter,
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::UpdateContext;
    use std::time::Duration;
    use uom::si::{f64::*, time::second};

    pub fn context_with() -> UpdateContextBuilder {
        UpdateContextBuilder::new()
    }

    pub fn context() -> UpdateContext {
        context_with().build()
    }

    pub struct UpdateContextBuilder {
        delta: Duration,
        simulation_time: Time,
        tick_counter: u64,
    }
    impl UpdateContextBuilder {
        fn new() -> UpdateContextBuilder {
            UpdateContextBuilder {
                delta: Duration::from_secs(1),
                simulation_time: Time::new::<second>(1.),
                tick_counter: 1,
            }
        }

        pub fn build(&self) -> UpdateContext {
            UpdateContext::new(self.delta, self.simulation_time, self.tick_counter)
        }

        pub fn and(self) -> UpdateContextBuilder {
            self
        }

        pub fn delta(mut self, delta: Duration) -> UpdateContextBuilder {
            self.delta = delta;
            self
        }

        pub fn simulation_time(mut self, simulation_time: Time) -> UpdateContextBuilder {
            self.simulation_time = simulation_time;
            self
        }

        pub fn tick_counter(mut self, tick_counter: u64) -> UpdateContextBuilder {
            self.tick_counter = tick_counter;
            self
        }
    }
}
