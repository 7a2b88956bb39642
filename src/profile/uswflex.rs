//! Board profile for PoE powered 5-port switches with a PD69104 feeding 4 downstream ports.
//!
//! The board is powered over PoE itself. Its budget is whatever the upstream port supplies,
//! minus what the switch uses.

use log::{error, info, warn};

use crate::{
    chip::PseChip,
    context::PoeContext,
    error::{Error, Result},
    metric::Metric,
    pd69104::{OperationMode, Pd69104},
    profile::Profile,
    registers::pd69104::{NUM_POWER_BANKS, PORT_POWER_LIMIT_MASK},
    reset::{BoardReset, ResetOrder},
    scaling::watts_to_mw,
    transport::{ChipLocation, RegisterBus, WireFlavor},
    types::PoeType,
};

pub const NAME: &str = "usw-flex";
pub const NUM_PORTS: usize = 4;
pub const I2C_ADDRESS: u8 = 0x20;
pub const CHIP_LOCATION: ChipLocation = ChipLocation {
    bus: 0,
    address: I2C_ADDRESS,
    flavor: WireFlavor::BlockCommand,
};
/// Power the switch itself draws from its input, in watts.
pub const OWN_POWER_CONSUMPTION_W: u16 = 5;

/// Map the power good pins to the upstream PoE type.
pub fn input_type_from_pins(pins: u8) -> PoeType {
    match pins & 0b111 {
        0b110 => PoeType::Af,
        0b101 => PoeType::At,
        0b011 => PoeType::Bt,
        _ => PoeType::Unknown,
    }
}

/// Budget left for the ports when powered by `input`. Unknown inputs get the 802.3af budget.
pub fn derived_power_budget(input: PoeType) -> u16 {
    let available = input
        .max_power_watts()
        .or(PoeType::Af.max_power_watts())
        .unwrap_or(0);
    available.saturating_sub(OWN_POWER_CONSUMPTION_W)
}

pub struct UswFlex<B, R> {
    chip: Pd69104<B>,
    reset: R,
    reset_order: ResetOrder,
}

impl<B: RegisterBus, R: BoardReset> UswFlex<B, R> {
    pub fn new(bus: B, reset: R) -> Self {
        Self {
            chip: Pd69104::new(bus),
            reset,
            reset_order: ResetOrder::default(),
        }
    }

    pub fn with_reset_order(mut self, order: ResetOrder) -> Self {
        self.reset_order = order;
        self
    }

    pub fn pd69104(&self) -> &Pd69104<B> {
        &self.chip
    }

    pub fn pd69104_mut(&mut self) -> &mut Pd69104<B> {
        &mut self.chip
    }

    pub fn board_reset(&self) -> &R {
        &self.reset
    }

    fn pulse_reset(&mut self) -> Result<(), B::Error> {
        self.reset.reset().map_err(|e| {
            error!("{NAME}: {e}");
            Error::Reset
        })
    }

    fn power_budget(ctx: &PoeContext) -> u16 {
        ctx.power_budget_override()
            .unwrap_or_else(|| derived_power_budget(ctx.input_status.poe_type))
    }

    fn set_all_ports(&mut self, ctx: &PoeContext, mode: OperationMode) -> Result<(), B::Error> {
        for port in 0..ctx.num_ports() {
            self.chip.set_port_operation_mode(port, mode)?;
            self.chip
                .set_detection_classification(port, mode != OperationMode::Shutdown)?;
        }
        Ok(())
    }
}

impl<B: RegisterBus, R: BoardReset> Profile for UswFlex<B, R> {
    type BusError = B::Error;

    fn name(&self) -> &'static str {
        NAME
    }

    fn num_ports(&self) -> usize {
        NUM_PORTS
    }

    fn init(&mut self, _ctx: &mut PoeContext) -> Result<(), B::Error> {
        match self.reset_order {
            ResetOrder::BeforeChipInit => {
                self.pulse_reset()?;
                self.chip.init()?;
            }
            ResetOrder::AfterChipInit => {
                self.chip.init()?;
                self.pulse_reset()?;
            }
        }
        Ok(())
    }

    fn ready(&mut self, _ctx: &PoeContext) -> bool {
        self.chip.device_online()
    }

    fn enable(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        self.set_all_ports(ctx, OperationMode::Auto)
    }

    fn disable(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        self.set_all_ports(ctx, OperationMode::Shutdown)
    }

    fn apply_config(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        if ctx.power_budget_override().is_none() {
            self.update_input_status(ctx)?;
        }
        let budget = Self::power_budget(ctx);
        let Ok(bank_budget) = u8::try_from(budget) else {
            return Err(Error::OutOfRange {
                value: budget.into(),
                bits: 8,
            });
        };
        let port_limit = bank_budget.min(PORT_POWER_LIMIT_MASK);
        info!("Applying {NAME} config with a {budget} W budget");

        for bank in 0..NUM_POWER_BANKS {
            self.chip.set_system_power_budget(bank, bank_budget)?;
        }

        for (index, port) in ctx.ports.iter().enumerate() {
            let mode = match port.settings.is_active() {
                true => OperationMode::Auto,
                false => OperationMode::Shutdown,
            };
            self.chip.set_port_operation_mode(index, mode)?;
            self.chip
                .set_detection_classification(index, mode != OperationMode::Shutdown)?;
            self.chip.set_port_power_limit(index, port_limit)?;
        }
        Ok(())
    }

    fn update_port_status(&mut self, ctx: &mut PoeContext, port: usize) -> Result<(), B::Error> {
        if port >= ctx.num_ports() {
            return Err(Error::InvalidPort(port));
        }
        let enabled = self.chip.get_port_operation_mode(port)? != OperationMode::Shutdown;
        let active = self.chip.get_port_power_good(port)?;
        let power_mw = self.chip.read_port_power_mw(port)?;
        let power_limit_mw = watts_to_mw(self.chip.get_port_power_limit(port)?.into());
        let faults = self.chip.get_port_faults(port)?;
        let poe_class = self.chip.get_port_class(port)?;

        if let Some(entry) = ctx.port_mut(port) {
            let status = &mut entry.status;
            status.enabled = enabled;
            status.active = active;
            status.power_mw = power_mw;
            status.power_limit_mw = Some(power_limit_mw);
            status.poe_class = poe_class;
            status.faults = faults;
        }
        Ok(())
    }

    fn update_input_status(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        let pins = self.chip.get_power_good_pins()?;
        let poe_type = input_type_from_pins(pins);
        if poe_type == PoeType::Unknown {
            warn!("{NAME}: unknown input PoE type (pins {pins:#05b}), assuming 802.3af");
        }
        ctx.input_status.poe_type = poe_type;
        Ok(())
    }

    fn update_output_status(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        ctx.output_status.power_budget_mw = watts_to_mw(Self::power_budget(ctx));
        ctx.output_status.poe_type = PoeType::At;
        Ok(())
    }

    fn export_port_metric(
        &mut self,
        ctx: &PoeContext,
        port: usize,
        _index: usize,
    ) -> Result<Option<Metric>, B::Error> {
        if port >= ctx.num_ports() {
            return Err(Error::InvalidPort(port));
        }
        Ok(None)
    }

    fn num_chips(&self) -> usize {
        1
    }

    fn chip(&mut self, index: usize) -> Option<&mut dyn PseChip<BusError = B::Error>> {
        match index {
            0 => Some(&mut self.chip),
            _ => None,
        }
    }
}
