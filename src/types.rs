use bitflags::bitflags;
use strum_macros::{Display, EnumIter};

/// Millisecond timestamp of a status refresh.
pub type Timestamp = fugit::Instant<u64, 1, 1000>;

/// Source of status timestamps.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall clock, milliseconds since the Unix epoch.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Timestamp::from_ticks(millis)
    }
}

bitflags! {
    /// Fault conditions reported for a port.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Faults: u16 {
        const POWER_MANAGEMENT = 1 << 0;
        const OVER_TEMPERATURE = 1 << 1;
        const SHORT_CIRCUIT = 1 << 2;
        const RESISTANCE_TOO_LOW = 1 << 3;
        const RESISTANCE_TOO_HIGH = 1 << 4;
        const CAPACITANCE_TOO_HIGH = 1 << 5;
        const OPEN_CIRCUIT = 1 << 6;
        const OVER_CURRENT = 1 << 7;
        const CLASSIFICATION_ERROR = 1 << 8;
        const UNKNOWN = 1 << 9;
    }
}

impl Faults {
    /// Names of the set flags, lowest bit first.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        self.iter_names().map(|(name, _)| name)
    }
}

/// PoE standard of a power input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter)]
pub enum PoeType {
    #[default]
    #[strum(serialize = "unknown")]
    Unknown,
    #[strum(serialize = "802.3af")]
    Af,
    #[strum(serialize = "802.3at")]
    At,
    #[strum(serialize = "802.3bt")]
    Bt,
}

impl PoeType {
    /// Power a powered device may draw under this standard.
    pub const fn max_power_watts(self) -> Option<u16> {
        match self {
            Self::Unknown => None,
            Self::Af => Some(13),
            Self::At => Some(25),
            Self::Bt => Some(51),
        }
    }
}

/// Live state of one port, as last read from the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortStatus {
    pub enabled: bool,
    /// Power good, i.e. a powered device is drawing power.
    pub active: bool,
    pub power_mw: u32,
    pub power_limit_mw: Option<u32>,
    pub poe_class: Option<u8>,
    pub faults: Faults,
    pub last_update: Option<Timestamp>,
}

/// How the board itself is powered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputStatus {
    pub poe_type: PoeType,
    pub last_update: Option<Timestamp>,
}

/// What the board offers to its ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputStatus {
    pub power_budget_mw: u32,
    pub poe_type: PoeType,
    pub last_update: Option<Timestamp>,
}
