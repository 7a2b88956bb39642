//! Switch-level PoE controller.
//!
//! The controller runs one [`Action`] against a board [`Profile`]. Every action that touches the
//! chips first makes sure the board is initialised and its chips identify correctly. If they do
//! not, the action fails with [`Error::NotReady`] before anything is written.

use log::{debug, info, warn};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    config::{MAX_PORTS, Name, PoeConfig},
    context::PoeContext,
    error::{Error, Result},
    metric::{Metric, metrics},
    profile::Profile,
    types::{Clock, InputStatus, OutputStatus, PortStatus},
};

pub const MAX_CHIPS: usize = 2;
pub const MAX_PORT_METRICS: usize = 4;
pub const MAX_CHIP_METRICS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// Refresh and report status.
    Show,
    /// Enable and configure the board if enabled in the settings, otherwise disable it.
    Apply,
    Enable,
    Disable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProfileState {
    Uninitialized,
    Initialized,
    Ready,
    NotReady,
    Enabled,
    Configured,
    StatusRefreshed,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortReport {
    pub index: usize,
    pub name: Option<Name>,
    pub status: PortStatus,
    pub metrics: heapless::Vec<Metric, MAX_PORT_METRICS>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipReport {
    pub model: &'static str,
    pub metrics: heapless::Vec<Metric, MAX_CHIP_METRICS>,
}

/// Snapshot of the whole switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchStatus {
    pub profile: &'static str,
    pub input: InputStatus,
    pub output: OutputStatus,
    pub ports: heapless::Vec<PortReport, MAX_PORTS>,
    pub chips: heapless::Vec<ChipReport, MAX_CHIPS>,
}

pub struct Controller<P, C> {
    profile: P,
    ctx: PoeContext,
    clock: C,
    state: ProfileState,
}

impl<P: Profile, C: Clock> Controller<P, C> {
    pub fn new(profile: P, config: PoeConfig, clock: C) -> Self {
        let ctx = PoeContext::new(config, profile.num_ports());
        Self {
            profile,
            ctx,
            clock,
            state: ProfileState::Uninitialized,
        }
    }

    pub fn state(&self) -> ProfileState {
        self.state
    }

    pub fn context(&self) -> &PoeContext {
        &self.ctx
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut P {
        &mut self.profile
    }

    fn transition(&mut self, state: ProfileState) {
        if self.state != state {
            debug!("{}: {} -> {state}", self.profile.name(), self.state);
        }
        self.state = state;
    }

    pub fn init(&mut self) -> Result<(), P::BusError> {
        self.profile.init(&mut self.ctx)?;
        self.transition(ProfileState::Initialized);
        Ok(())
    }

    /// Check whether the board's chips identify correctly.
    pub fn check_ready(&mut self) -> bool {
        let ready = self.profile.ready(&self.ctx);
        self.transition(match ready {
            true => ProfileState::Ready,
            false => ProfileState::NotReady,
        });
        ready
    }

    fn require_ready(&mut self) -> Result<(), P::BusError> {
        if self.state == ProfileState::Uninitialized {
            self.init()?;
        }
        if !self.check_ready() {
            warn!("{}: PSE chips not ready", self.profile.name());
            return Err(Error::NotReady);
        }
        Ok(())
    }

    pub fn enable(&mut self) -> Result<(), P::BusError> {
        self.require_ready()?;
        self.profile.enable(&mut self.ctx)?;
        self.transition(ProfileState::Enabled);
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), P::BusError> {
        self.require_ready()?;
        self.profile.disable(&mut self.ctx)?;
        self.transition(ProfileState::Disabled);
        Ok(())
    }

    pub fn apply_config(&mut self) -> Result<(), P::BusError> {
        self.require_ready()?;
        self.profile.apply_config(&mut self.ctx)?;
        self.transition(ProfileState::Configured);
        Ok(())
    }

    /// Refresh port, input and output status.
    ///
    /// Ports are read first, as refreshing the output status may clear latched port faults.
    pub fn refresh(&mut self) -> Result<(), P::BusError> {
        self.require_ready()?;
        for port in 0..self.ctx.num_ports() {
            self.profile.update_port_status(&mut self.ctx, port)?;
            let now = self.clock.now();
            if let Some(entry) = self.ctx.port_mut(port) {
                entry.status.last_update = Some(now);
            }
        }

        self.profile.update_input_status(&mut self.ctx)?;
        self.ctx.input_status.last_update = Some(self.clock.now());

        self.profile.update_output_status(&mut self.ctx)?;
        self.ctx.output_status.last_update = Some(self.clock.now());

        self.transition(ProfileState::StatusRefreshed);
        Ok(())
    }

    pub fn run(&mut self, action: Action) -> Result<(), P::BusError> {
        info!("{}: running {action}", self.profile.name());
        match action {
            Action::Show => self.refresh(),
            Action::Apply if self.ctx.settings.enabled => {
                self.enable()?;
                self.apply_config()
            }
            Action::Apply => self.disable(),
            Action::Enable => self.enable(),
            Action::Disable => self.disable(),
        }
    }

    /// Snapshot of the last refreshed status, plus current port and chip metrics.
    ///
    /// Metric lists longer than the report capacity are cut short.
    pub fn status(&mut self) -> Result<SwitchStatus, P::BusError> {
        self.require_ready()?;

        let mut ports = heapless::Vec::new();
        for index in 0..self.ctx.num_ports() {
            let mut port_metrics = heapless::Vec::new();
            for metric in metrics(|i| self.profile.export_port_metric(&self.ctx, index, i)) {
                if port_metrics.push(metric?).is_err() {
                    break;
                }
            }
            let Some(port) = self.ctx.port(index) else {
                continue;
            };
            let report = PortReport {
                index,
                name: port.settings.name.clone(),
                status: port.status,
                metrics: port_metrics,
            };
            if ports.push(report).is_err() {
                break;
            }
        }

        let mut chips = heapless::Vec::new();
        for index in 0..self.profile.num_chips() {
            let Some(chip) = self.profile.chip(index) else {
                continue;
            };
            let model = chip.model();
            let count = chip.metric_count();
            let mut chip_metrics = heapless::Vec::new();
            for metric in metrics(|i| chip.export_metric(i)).take(count) {
                if chip_metrics.push(metric?).is_err() {
                    break;
                }
            }
            let report = ChipReport {
                model,
                metrics: chip_metrics,
            };
            if chips.push(report).is_err() {
                break;
            }
        }

        Ok(SwitchStatus {
            profile: self.profile.name(),
            input: self.ctx.input_status,
            output: self.ctx.output_status,
            ports,
            chips,
        })
    }
}
