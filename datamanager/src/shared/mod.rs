use itertools::Itertools;
use num_derive::FromPrimitive;
use std::{borrow::Cow, fmt};

mod id_generator;
pub use id_generator::{GeneratedId, IdGenerator};

pub type VariableId = i32;
pub type DefinitionId = u32;
pub type RequestId = u32;
pub type ClientDataId = u32;
pub type EventId = u32;
pub type KeyEventId = u32;
pub type NotificationGroupId = u32;
pub type InputGroupId = u32;
pub type CallbackId = u64;

/// Whether a managed object is automatically read before and written after
/// every simulation tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateMode {
    pub auto_read: bool,
    pub auto_write: bool,
}
impl UpdateMode {
    pub const NO_AUTO_UPDATE: UpdateMode = UpdateMode::new(false, false);
    pub const AUTO_READ: UpdateMode = UpdateMode::new(true, false);
    pub const AUTO_WRITE: UpdateMode = UpdateMode::new(false, true);
    pub const AUTO_READ_WRITE: UpdateMode = UpdateMode::new(true, true);

    pub const fn new(auto_read: bool, auto_write: bool) -> Self {
        Self {
            auto_read,
            auto_write,
        }
    }

    /// Both flags of the result are set when set in either of the modes.
    pub fn union(self, other: UpdateMode) -> UpdateMode {
        UpdateMode::new(
            self.auto_read || other.auto_read,
            self.auto_write || other.auto_write,
        )
    }
}
impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            if self.auto_read { Some("read") } else { None },
            if self.auto_write { Some("write") } else { None },
        ];
        let flags = flags.iter().flatten().join("+");

        if flags.is_empty() {
            write!(f, "manual")
        } else {
            write!(f, "auto {}", flags)
        }
    }
}

/// A unit of measure as understood by the simulator. Unit conversion is performed
/// by the simulator, hence the same variable read in two units is two variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimUnit(Cow<'static, str>);
impl SimUnit {
    pub const NUMBER: SimUnit = SimUnit::from_static("Number");
    pub const BOOL: SimUnit = SimUnit::from_static("Bool");
    pub const ENUM: SimUnit = SimUnit::from_static("Enum");
    pub const PERCENT: SimUnit = SimUnit::from_static("Percent");
    pub const PERCENT_OVER_100: SimUnit = SimUnit::from_static("Percent Over 100");
    pub const POSITION: SimUnit = SimUnit::from_static("Position");
    pub const FEET: SimUnit = SimUnit::from_static("Feet");
    pub const FEET_PER_MINUTE: SimUnit = SimUnit::from_static("Feet per minute");
    pub const KNOTS: SimUnit = SimUnit::from_static("Knots");
    pub const DEGREES: SimUnit = SimUnit::from_static("Degrees");
    pub const RADIANS: SimUnit = SimUnit::from_static("Radians");
    pub const SECONDS: SimUnit = SimUnit::from_static("Seconds");
    pub const POUNDS: SimUnit = SimUnit::from_static("Pounds");
    pub const GALLONS: SimUnit = SimUnit::from_static("Gallons");
    pub const CELSIUS: SimUnit = SimUnit::from_static("Celsius");
    pub const MILLIBARS: SimUnit = SimUnit::from_static("Millibars");

    pub const fn from_static(name: &'static str) -> Self {
        SimUnit(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        SimUnit(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for SimUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exception codes the simulator reports through the dispatch queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum SimConnectException {
    None = 0,
    Error = 1,
    SizeMismatch = 2,
    UnrecognizedId = 3,
    Unopened = 4,
    VersionMismatch = 5,
    TooManyGroups = 6,
    NameUnrecognized = 7,
    TooManyEventNames = 8,
    EventIdDuplicate = 9,
    TooManyMaps = 10,
    TooManyObjects = 11,
    TooManyRequests = 12,
    WeatherInvalidPort = 13,
    WeatherInvalidMetar = 14,
    WeatherUnableToGetObservation = 15,
    WeatherUnableToCreateStation = 16,
    WeatherUnableToRemoveStation = 17,
    InvalidDataType = 18,
    InvalidDataSize = 19,
    DataError = 20,
    InvalidArray = 21,
    CreateObjectFailed = 22,
    LoadFlightplanFailed = 23,
    OperationInvalidForObjectType = 24,
    IllegalOperation = 25,
    AlreadySubscribed = 26,
    InvalidEnum = 27,
    DefinitionError = 28,
    DuplicateId = 29,
    DatumId = 30,
    OutOfBounds = 31,
    AlreadyCreated = 32,
    ObjectOutsideRealityBubble = 33,
    ObjectContainer = 34,
    ObjectAi = 35,
    ObjectAtc = 36,
    ObjectSchedule = 37,
}
