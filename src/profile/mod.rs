//! Board profiles.
//!
//! A profile knows which PSE chips a board carries, where they sit on the bus and how the board
//! wants them configured. Profiles own their chip drivers. All switch-level state lives in the
//! [`PoeContext`] passed into every call.

pub mod psx10;
pub mod uswflex;

use core::str::FromStr;

use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    chip::PseChip,
    config::Settings,
    context::PoeContext,
    error::{ConfigError, Result},
    metric::Metric,
    reset::BoardReset,
    transport::{ChipLocation, RegisterBus},
};

pub use psx10::Psx10;
pub use uswflex::UswFlex;

pub trait Profile {
    type BusError: core::fmt::Debug;

    fn name(&self) -> &'static str;

    fn num_ports(&self) -> usize;

    /// Bring the board's chips out of reset. Must not power any port.
    fn init(&mut self, ctx: &mut PoeContext) -> Result<(), Self::BusError>;

    /// Whether every chip identifies as expected.
    fn ready(&mut self, ctx: &PoeContext) -> bool;

    fn enable(&mut self, ctx: &mut PoeContext) -> Result<(), Self::BusError>;

    fn disable(&mut self, ctx: &mut PoeContext) -> Result<(), Self::BusError>;

    /// Program the power budget and port settings held in `ctx`.
    fn apply_config(&mut self, ctx: &mut PoeContext) -> Result<(), Self::BusError>;

    fn update_port_status(
        &mut self,
        ctx: &mut PoeContext,
        port: usize,
    ) -> Result<(), Self::BusError>;

    fn update_input_status(&mut self, ctx: &mut PoeContext) -> Result<(), Self::BusError>;

    fn update_output_status(&mut self, ctx: &mut PoeContext) -> Result<(), Self::BusError>;

    /// Port metric at `index`, or `None` past the last one.
    fn export_port_metric(
        &mut self,
        ctx: &PoeContext,
        port: usize,
        index: usize,
    ) -> Result<Option<Metric>, Self::BusError>;

    fn num_chips(&self) -> usize;

    fn chip(&mut self, index: usize) -> Option<&mut dyn PseChip<BusError = Self::BusError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum ProfileKind {
    #[strum(serialize = "psx10")]
    Psx10,
    #[strum(serialize = "usw-flex")]
    UswFlex,
}

impl ProfileKind {
    /// Profile named in the settings.
    pub fn from_settings(settings: &Settings) -> core::result::Result<Self, ConfigError> {
        Self::from_str(&settings.profile).map_err(|_| ConfigError::UnknownProfile)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Psx10 => psx10::NAME,
            Self::UswFlex => uswflex::NAME,
        }
    }

    pub const fn num_ports(self) -> usize {
        match self {
            Self::Psx10 => psx10::NUM_PORTS,
            Self::UswFlex => uswflex::NUM_PORTS,
        }
    }

    /// Where the board's PSE chip sits.
    pub const fn chip_location(self) -> ChipLocation {
        match self {
            Self::Psx10 => psx10::CHIP_LOCATION,
            Self::UswFlex => uswflex::CHIP_LOCATION,
        }
    }
}

/// One of the supported board profiles.
pub enum BoardProfile<B, R> {
    Psx10(Psx10<B>),
    UswFlex(UswFlex<B, R>),
}

impl<B: RegisterBus, R: BoardReset> BoardProfile<B, R> {
    /// `reset` is only used by boards with a reset line.
    pub fn new(kind: ProfileKind, bus: B, reset: R) -> Self {
        match kind {
            ProfileKind::Psx10 => Self::Psx10(Psx10::new(bus)),
            ProfileKind::UswFlex => Self::UswFlex(UswFlex::new(bus, reset)),
        }
    }

    pub fn kind(&self) -> ProfileKind {
        match self {
            Self::Psx10(_) => ProfileKind::Psx10,
            Self::UswFlex(_) => ProfileKind::UswFlex,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $profile:ident => $body:expr) => {
        match $self {
            BoardProfile::Psx10($profile) => $body,
            BoardProfile::UswFlex($profile) => $body,
        }
    };
}

impl<B: RegisterBus, R: BoardReset> Profile for BoardProfile<B, R> {
    type BusError = B::Error;

    fn name(&self) -> &'static str {
        dispatch!(self, p => p.name())
    }

    fn num_ports(&self) -> usize {
        dispatch!(self, p => p.num_ports())
    }

    fn init(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        dispatch!(self, p => p.init(ctx))
    }

    fn ready(&mut self, ctx: &PoeContext) -> bool {
        dispatch!(self, p => p.ready(ctx))
    }

    fn enable(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        dispatch!(self, p => p.enable(ctx))
    }

    fn disable(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        dispatch!(self, p => p.disable(ctx))
    }

    fn apply_config(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        dispatch!(self, p => p.apply_config(ctx))
    }

    fn update_port_status(&mut self, ctx: &mut PoeContext, port: usize) -> Result<(), B::Error> {
        dispatch!(self, p => p.update_port_status(ctx, port))
    }

    fn update_input_status(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        dispatch!(self, p => p.update_input_status(ctx))
    }

    fn update_output_status(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        dispatch!(self, p => p.update_output_status(ctx))
    }

    fn export_port_metric(
        &mut self,
        ctx: &PoeContext,
        port: usize,
        index: usize,
    ) -> Result<Option<Metric>, B::Error> {
        dispatch!(self, p => p.export_port_metric(ctx, port, index))
    }

    fn num_chips(&self) -> usize {
        dispatch!(self, p => p.num_chips())
    }

    fn chip(&mut self, index: usize) -> Option<&mut dyn PseChip<BusError = B::Error>> {
        dispatch!(self, p => p.chip(index))
    }
}
