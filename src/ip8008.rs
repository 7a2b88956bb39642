//! Driver for the IP8008 8-port PSE controller.
//!
//! The IP8008 has a paged register map. The page is selected before every single register access,
//! and never cached, since other accessors may leave the chip on another page.

use log::{debug, warn};
use strum_macros::IntoStaticStr;

use crate::{
    chip::{PseChip, check_port},
    error::{Error, Result},
    metric::Metric,
    registers::ip8008::*,
    scaling::decode_bytes_milli,
    transport::RegisterBus,
    types::Faults,
};

pub const MODEL: &str = "IP8008";
pub const NUM_PORTS: usize = 8;
pub const NUM_METRICS: usize = 14;
pub const NUM_PORT_METRICS: usize = 3;
pub const DEVICE_ID: u16 = 0x3801;
/// Largest budget the 12-bit power registers hold.
pub const MAX_POWER_BUDGET_W: u16 = 0x0FFF;

/// Allocation mode set when the device is enabled.
const ALLOCATION_CLASS_POWER: u8 = 0b01;
const POLL_INTERVAL_FASTEST: u8 = 0b1111;

const FAULT_BITS: [(u8, Faults); 8] = [
    (0, Faults::OVER_CURRENT),
    (1, Faults::SHORT_CIRCUIT),
    (2, Faults::UNKNOWN),
    (3, Faults::UNKNOWN),
    (4, Faults::OVER_TEMPERATURE),
    (5, Faults::SHORT_CIRCUIT),
    (6, Faults::UNKNOWN),
    (7, Faults::POWER_MANAGEMENT),
];

/// Map a port status register to faults.
pub fn decode_port_faults(status: u8) -> Faults {
    FAULT_BITS
        .iter()
        .filter(|(bit, _)| status & (1 << bit) != 0)
        .fold(Faults::empty(), |faults, (_, fault)| faults | *fault)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum EstimationMode {
    #[strum(serialize = "Ideal Class Power")]
    IdealClassPower,
    #[strum(serialize = "Real Consumed Power")]
    RealConsumedPower,
    #[strum(serialize = "Max Consumed Power")]
    MaxConsumedPower,
    #[strum(serialize = "Real Consumed Power and Auto Class Power")]
    RealConsumedAndAutoClassPower,
}

impl From<u8> for EstimationMode {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::IdealClassPower,
            0b01 => Self::RealConsumedPower,
            0b10 => Self::MaxConsumedPower,
            _ => Self::RealConsumedAndAutoClassPower,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum AllocationMode {
    #[strum(serialize = "Host Defined Power")]
    HostDefined,
    #[strum(serialize = "Class Power")]
    ClassPower,
    #[strum(serialize = "Highest Possible Power")]
    HighestPossible,
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl From<u8> for AllocationMode {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::HostDefined,
            0b01 => Self::ClassPower,
            0b10 => Self::HighestPossible,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum VictimStrategy {
    #[strum(serialize = "Last port powered")]
    LastPortPowered,
    #[strum(serialize = "First port powered")]
    FirstPortPowered,
    #[strum(serialize = "Port with Lowest current")]
    LowestCurrent,
    #[strum(serialize = "Port with Highest current")]
    HighestCurrent,
    #[strum(serialize = "Priority")]
    Priority,
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl From<u8> for VictimStrategy {
    fn from(value: u8) -> Self {
        match value & 0b111 {
            0 => Self::LastPortPowered,
            1 => Self::FirstPortPowered,
            2 => Self::LowestCurrent,
            3 => Self::HighestCurrent,
            4 => Self::Priority,
            _ => Self::Unknown,
        }
    }
}

pub struct Ip8008<B> {
    bus: B,
}

impl<B: RegisterBus> Ip8008<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn release(self) -> B {
        self.bus
    }

    fn check_port(port: usize) -> Result<u8, B::Error> {
        check_port(port, NUM_PORTS)
    }

    fn read_raw(&mut self, register: u8) -> Result<u8, B::Error> {
        self.bus.read_register(register).map_err(Error::Bus)
    }

    fn write_raw(&mut self, register: u8, value: u8) -> Result<(), B::Error> {
        self.bus.write_register(register, value).map_err(Error::Bus)
    }

    fn masked_write_raw(&mut self, register: u8, mask: u8, value: u8) -> Result<(), B::Error> {
        let current = self.read_raw(register)?;
        let updated = (current & !mask) | value;
        self.write_raw(register, updated)
    }

    /// Select the register page for the next access.
    pub fn switch_page(&mut self, page: u8) -> Result<(), B::Error> {
        let select = PageSelect::new().with_apply(true).with_page(page & 0b11);
        self.masked_write_raw(
            Ip8008Register::SetPage.addr(),
            PAGE_MASK,
            select.into_bytes()[0],
        )
    }

    pub fn paged_read(&mut self, page: u8, register: u8) -> Result<u8, B::Error> {
        self.switch_page(page)?;
        self.read_raw(register)
    }

    pub fn paged_write(&mut self, page: u8, register: u8, value: u8) -> Result<(), B::Error> {
        self.switch_page(page)?;
        self.write_raw(register, value)
    }

    /// Replace the bits selected by `mask` with `value`.
    ///
    /// Bits of `value` outside of `mask` are written as well.
    pub fn masked_paged_write(
        &mut self,
        page: u8,
        register: u8,
        mask: u8,
        value: u8,
    ) -> Result<(), B::Error> {
        self.switch_page(page)?;
        self.masked_write_raw(register, mask, value)
    }

    fn read_pair(&mut self, page: u8, register: u8) -> Result<(u8, u8), B::Error> {
        let msb = self.paged_read(page, register)?;
        let lsb = self.paged_read(page, register.wrapping_add(1))?;
        Ok((msb, lsb))
    }

    fn read_pair_milli(
        &mut self,
        page: u8,
        register: u8,
        fraction_bits: u8,
    ) -> Result<u32, B::Error> {
        let (msb, lsb) = self.read_pair(page, register)?;
        Ok(decode_bytes_milli(msb, lsb, fraction_bits)?)
    }

    pub fn read_device_id(&mut self) -> Result<u16, B::Error> {
        let msb = self.paged_read(PAGE_0, Ip8008Register::DeviceIdMsb.addr())?;
        let lsb = self.paged_read(PAGE_0, Ip8008Register::DeviceIdLsb.addr())?;
        Ok(u16::from_be_bytes([msb, lsb]))
    }

    pub fn device_online(&mut self) -> bool {
        match self.read_device_id() {
            Ok(DEVICE_ID) => true,
            Ok(id) => {
                warn!("Unexpected {MODEL} device id {id:#06x}");
                false
            }
            Err(e) => {
                warn!("Failed to read {MODEL} device id: {e}");
                false
            }
        }
    }

    /// Turn telemetry polling, class power allocation and 802.3bt mode on or off.
    pub fn set_device_enabled(&mut self, enabled: bool) -> Result<(), B::Error> {
        debug!("{} {MODEL}", if enabled { "Enabling" } else { "Disabling" });
        let poll = match enabled {
            true => IvtPoll::new()
                .with_auto_poll(true)
                .with_poll_interval(POLL_INTERVAL_FASTEST),
            false => IvtPoll::new(),
        };
        self.masked_paged_write(
            PAGE_0,
            Ip8008Register::IvtPoll.addr(),
            IVT_POLL_MASK,
            poll.into_bytes()[0],
        )?;

        let alloc = match enabled {
            true => PowerAllocMode::new().with_allocation(ALLOCATION_CLASS_POWER),
            false => PowerAllocMode::new(),
        };
        self.masked_paged_write(
            PAGE_0,
            Ip8008Register::PowerAllocMode.addr(),
            POWER_ALLOC_MODE_MASK,
            alloc.into_bytes()[0],
        )?;

        let bt_mode = if enabled { BT_MODE_ENABLED } else { 0 };
        self.paged_write(PAGE_0, Ip8008Register::BtMode.addr(), bt_mode)
    }

    pub fn set_port_enabled(&mut self, port: usize, enabled: bool) -> Result<(), B::Error> {
        let port = Self::check_port(port)?;
        let control = PowerControl::new().with_pse_enable(u8::from(enabled));
        self.paged_write(
            PAGE_0,
            Ip8008Register::PowerControl.port(port),
            control.into_bytes()[0],
        )
    }

    pub fn get_port_enabled(&mut self, port: usize) -> Result<bool, B::Error> {
        let port = Self::check_port(port)?;
        let raw = self.paged_read(PAGE_0, Ip8008Register::PowerControl.port(port))?;
        Ok(PowerControl::from_bytes([raw]).pse_enable() == 0b01)
    }

    /// Program the same budget into both trunks and the available power registers.
    ///
    /// Fails without touching the chip if `watts` does not fit the 12-bit registers.
    pub fn set_power_budget(&mut self, watts: u16) -> Result<(), B::Error> {
        if watts > MAX_POWER_BUDGET_W {
            return Err(Error::OutOfRange {
                value: watts.into(),
                bits: 12,
            });
        }
        debug!("Setting {MODEL} power budget to {watts} W");
        let [msb, lsb] = watts.to_be_bytes();

        let limit = PowerRegister::new().with_limit_enabled(true);
        self.masked_paged_write(
            PAGE_0,
            Ip8008Register::PowerRegister.addr(),
            POWER_REGISTER_MASK,
            limit.into_bytes()[0],
        )?;

        self.paged_write(PAGE_0, Ip8008Register::TrunkSelect.addr(), 0)?;
        self.paged_write(PAGE_0, Ip8008Register::Trunk0Limit.addr(), msb)?;
        self.paged_write(PAGE_0, Ip8008Register::Trunk0Limit.lsb(), lsb)?;

        self.paged_write(PAGE_0, Ip8008Register::TrunkSelect.addr(), 1)?;
        self.paged_write(PAGE_0, Ip8008Register::Trunk1Limit.addr(), msb)?;
        self.paged_write(PAGE_0, Ip8008Register::Trunk1Limit.lsb(), lsb)?;

        self.paged_write(PAGE_0, Ip8008Register::VictimStrategy.addr(), 0)?;

        // Available current carries 2 fraction bits.
        let [current_msb, current_lsb] = (watts << 2).to_be_bytes();
        self.paged_write(PAGE_0, Ip8008Register::AvailableCurrent.addr(), current_msb)?;
        self.paged_write(PAGE_0, Ip8008Register::AvailableCurrent.lsb(), current_lsb)?;

        self.paged_write(PAGE_0, Ip8008Register::MirroredPower.addr(), msb)?;
        self.paged_write(PAGE_0, Ip8008Register::MirroredPower.lsb(), lsb)
    }

    /// Power consumed on `port`, in milliwatts.
    pub fn read_port_power_mw(&mut self, port: usize) -> Result<u32, B::Error> {
        let port = Self::check_port(port)?;
        let (msb, lsb) = self.read_pair(PAGE_0, Ip8008Register::ConsumedPower.port(port))?;
        Ok(decode_bytes_milli(msb & CONSUMED_POWER_MSB_MASK, lsb, 4)?)
    }

    pub fn get_port_power_good(&mut self, port: usize) -> Result<bool, B::Error> {
        let port = Self::check_port(port)?;
        let status = self.paged_read(PAGE_0, Ip8008Register::PortPowerStatus.addr())?;
        Ok(status & (1 << port) != 0)
    }

    pub fn get_port_faults(&mut self, port: usize) -> Result<Faults, B::Error> {
        let port = Self::check_port(port)?;
        let status = self.paged_read(PAGE_0, Ip8008Register::Status.port(port))?;
        Ok(decode_port_faults(status))
    }

    /// Clear the latched port events of the first `num_ports` ports, then pulse the global
    /// clear register.
    pub fn clear_faults(&mut self, num_ports: usize) -> Result<(), B::Error> {
        if num_ports > NUM_PORTS {
            return Err(Error::InvalidPort(num_ports - 1));
        }
        for port in 0..num_ports as u8 {
            let register = Ip8008Register::Status.port(port);
            self.paged_write(PAGE_0, register, 0xFF)?;
            self.paged_write(PAGE_0, register + 1, 0xFF)?;
        }
        self.paged_write(PAGE_0, Ip8008Register::GlobalClear.addr(), GLOBAL_CLEAR_ALL)?;
        self.paged_write(PAGE_0, Ip8008Register::GlobalClear.addr(), 0)
    }

    /// Raw requested class code of `port`.
    pub fn get_port_class(&mut self, port: usize) -> Result<u8, B::Error> {
        let port = Self::check_port(port)?;
        let raw = self.paged_read(PAGE_0, Ip8008Register::ReqClassStatus.port(port))?;
        Ok(raw & CLASS_MASK)
    }

    pub fn export_port_metric(
        &mut self,
        port: usize,
        index: usize,
    ) -> Result<Option<Metric>, B::Error> {
        use Ip8008Register as Reg;

        let port = Self::check_port(port)?;
        let metric = match index {
            0 => {
                let current = self.read_pair_milli(PAGE_0, Reg::CurrentStatus.port(port), 2)?;
                Metric::uint("Current", current / 1000)
            }
            1 => {
                let supply = self.read_pair_milli(PAGE_0, Reg::SupplyVoltage.addr(), 4)?;
                let drop = self.read_pair_milli(PAGE_0, Reg::VoltageStatus.port(port), 4)?;
                Metric::uint("Voltage", supply.saturating_sub(drop))
            }
            2 => {
                let temperature = self.read_pair_milli(PAGE_0, Reg::TempStatus.port(port), 4)?;
                Metric::uint("Temperature", temperature)
            }
            _ => return Ok(None),
        };
        Ok(Some(metric))
    }

    pub fn export_chip_metric(&mut self, index: usize) -> Result<Option<Metric>, B::Error> {
        use Ip8008Page1Register as Page1Reg;
        use Ip8008Register as Reg;

        let metric = match index {
            0 => {
                let trunk = self.paged_read(PAGE_0, Reg::TrunkSelect.addr())?;
                Metric::int("Trunk", trunk.into())
            }
            1 => {
                let (msb, lsb) = self.read_pair(PAGE_0, Reg::Trunk0Limit.addr())?;
                let watts = u16::from_be_bytes([msb, lsb]);
                Metric::uint("Trunk 0 Power Limit", u32::from(watts) * 1000)
            }
            2 => {
                let (msb, lsb) = self.read_pair(PAGE_0, Reg::Trunk1Limit.addr())?;
                let watts = u16::from_be_bytes([msb, lsb]);
                Metric::uint("Trunk 1 Power Limit", u32::from(watts) * 1000)
            }
            3 => {
                let raw = self.paged_read(PAGE_0, Reg::PowerAllocMode.addr())?;
                let mode = EstimationMode::from(PowerAllocMode::from_bytes([raw]).estimation());
                Metric::text("Estimation mode", mode.into())
            }
            4 => {
                let raw = self.paged_read(PAGE_0, Reg::PowerAllocMode.addr())?;
                let mode = AllocationMode::from(PowerAllocMode::from_bytes([raw]).allocation());
                Metric::text("Allocation mode", mode.into())
            }
            5 => {
                let voltage = self.read_pair_milli(PAGE_0, Reg::SupplyVoltage.addr(), 4)?;
                Metric::uint("Supply Voltage", voltage)
            }
            6 => {
                let register = Page1Reg::SupplyVoltageUpperLimit.addr();
                let limit = self.read_pair_milli(PAGE_1, register, 4)?;
                Metric::uint("Supply voltage upper limit", limit)
            }
            7 => {
                let register = Page1Reg::SupplyVoltageLowerLimit.addr();
                let limit = self.read_pair_milli(PAGE_1, register, 4)?;
                Metric::uint("Supply voltage lower limit", limit)
            }
            8 => {
                let raw = self.paged_read(PAGE_0, Reg::PowerRegister.addr())?;
                let limit = PowerRegister::from_bytes([raw]);
                let text = match (limit.current_limit(), limit.limit_enabled()) {
                    (true, true) => "Current Enabled",
                    (true, false) => "Current Disabled",
                    (false, true) => "Power Enabled",
                    (false, false) => "Power Disabled",
                };
                Metric::text("Limit Type", text)
            }
            9 => {
                let raw = self.paged_read(PAGE_0, Reg::VictimStrategy.addr())?;
                Metric::text("Victim Strategy", VictimStrategy::from(raw).into())
            }
            10 => {
                let raw = self.paged_read(PAGE_0, Reg::PowerRegister.addr())?;
                let limit = PowerRegister::from_bytes([raw]);
                if limit.current_limit() {
                    let (msb, lsb) = self.read_pair(PAGE_0, Reg::AvailableCurrent.addr())?;
                    Metric::uint("Available Current", u16::from_be_bytes([msb, lsb]).into())
                } else {
                    let available = self.read_pair_milli(PAGE_0, Reg::AvailableCurrent.addr(), 2)?;
                    let consumed =
                        self.read_pair_milli(PAGE_0, Reg::ConsumedPowerTotal.addr(), 4)?;
                    Metric::uint("Available Power", available.saturating_sub(consumed))
                }
            }
            11 => {
                let current = self.read_pair_milli(PAGE_0, Reg::ConsumedCurrent.addr(), 2)?;
                Metric::uint("Consumed Current", current / 1000)
            }
            12 => {
                let power = self.read_pair_milli(PAGE_0, Reg::ConsumedPowerTotal.addr(), 4)?;
                Metric::uint("Consumed Power", power)
            }
            13 => {
                let status = self.paged_read(PAGE_0, Reg::PortPowerStatus.addr())?;
                Metric::uint("Port Power Status", status.into())
            }
            _ => return Ok(None),
        };
        Ok(Some(metric))
    }
}

impl<B: RegisterBus> PseChip for Ip8008<B> {
    type BusError = B::Error;

    fn model(&self) -> &'static str {
        MODEL
    }

    fn num_ports(&self) -> usize {
        NUM_PORTS
    }

    fn metric_count(&self) -> usize {
        NUM_METRICS
    }

    fn device_online(&mut self) -> bool {
        Ip8008::device_online(self)
    }

    fn export_metric(&mut self, index: usize) -> Result<Option<Metric>, B::Error> {
        self.export_chip_metric(index)
    }
}
