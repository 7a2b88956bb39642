//! Driver for the PD69104 4-port PSE controller.

use log::{debug, info, warn};
use strum_macros::{Display, EnumIter};

use crate::{
    chip::{PseChip, check_port},
    error::{Error, Result},
    metric::Metric,
    registers::pd69104::*,
    transport::RegisterBus,
    types::Faults,
};

pub const MODEL: &str = "PD69104";
pub const NUM_PORTS: usize = 4;
pub const NUM_METRICS: usize = 1;

/// Port operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum OperationMode {
    Shutdown = 0b00,
    Manual = 0b01,
    SemiAuto = 0b10,
    Auto = 0b11,
}

impl From<u8> for OperationMode {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Shutdown,
            0b01 => Self::Manual,
            0b10 => Self::SemiAuto,
            _ => Self::Auto,
        }
    }
}

/// Map a port's fault nibble and detection/classification result to faults.
pub fn decode_port_faults(fault_nibble: u8, status: PortStatus) -> Faults {
    let mut faults = Faults::empty();
    if fault_nibble & FAULT_OVER_TEMPERATURE != 0 {
        faults |= Faults::OVER_TEMPERATURE;
    }
    if fault_nibble & FAULT_POWER_MANAGEMENT != 0 {
        faults |= Faults::POWER_MANAGEMENT;
    }
    faults |= match status.detect() {
        detect::SHORT_CIRCUIT => Faults::SHORT_CIRCUIT,
        detect::CAPACITANCE_TOO_HIGH => Faults::CAPACITANCE_TOO_HIGH,
        detect::RESISTANCE_TOO_LOW => Faults::RESISTANCE_TOO_LOW,
        detect::RESISTANCE_TOO_HIGH => Faults::RESISTANCE_TOO_HIGH,
        detect::OPEN_CIRCUIT => Faults::OPEN_CIRCUIT,
        _ => Faults::empty(),
    };
    if status.class() == class::OVER_CURRENT {
        faults |= Faults::OVER_CURRENT;
    }
    faults
}

/// Map a classification result to a PoE class.
pub fn decode_port_class(status: PortStatus) -> Option<u8> {
    match status.class() {
        code @ 1..=4 => Some(code),
        class::CLASS_0 => Some(0),
        _ => None,
    }
}

pub struct Pd69104<B> {
    bus: B,
}

impl<B: RegisterBus> Pd69104<B> {
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

    fn read(&mut self, register: u8) -> Result<u8, B::Error> {
        self.bus.read_register(register).map_err(Error::Bus)
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), B::Error> {
        self.bus.write_register(register, value).map_err(Error::Bus)
    }

    fn update(&mut self, register: u8, mask: u8, value: u8) -> Result<(), B::Error> {
        let current = self.read(register)?;
        self.write(register, (current & !mask) | (value & mask))
    }

    /// Read and log the firmware revision.
    pub fn init(&mut self) -> Result<u8, B::Error> {
        let firmware = self.read(Pd69104Register::Firmware.addr())?;
        info!("{MODEL} firmware revision {firmware:#04x}");
        Ok(firmware)
    }

    pub fn device_online(&mut self) -> bool {
        match self.read(Pd69104Register::DeviceId.addr()) {
            Ok(raw) if DeviceId::from_bytes([raw]).device_type() == DEVICE_TYPE => true,
            Ok(raw) => {
                warn!("Unexpected {MODEL} device id {raw:#04x}");
                false
            }
            Err(e) => {
                warn!("Failed to read {MODEL} device id: {e}");
                false
            }
        }
    }

    pub fn get_port_operation_mode(&mut self, port: usize) -> Result<OperationMode, B::Error> {
        let port = Self::check_port(port)?;
        let modes = self.read(Pd69104Register::OperationMode.addr())?;
        Ok(OperationMode::from(modes >> (port * 2)))
    }

    pub fn set_port_operation_mode(
        &mut self,
        port: usize,
        mode: OperationMode,
    ) -> Result<(), B::Error> {
        let port = Self::check_port(port)?;
        debug!("Setting {MODEL} port {port} to {mode}");
        let shift = port * 2;
        self.update(
            Pd69104Register::OperationMode.addr(),
            0b11 << shift,
            (mode as u8) << shift,
        )
    }

    /// Toggle detection and classification of `port` together.
    pub fn set_detection_classification(
        &mut self,
        port: usize,
        enable: bool,
    ) -> Result<(), B::Error> {
        let port = Self::check_port(port)?;
        let bits = DetectClassEnable::new()
            .with_detect(1 << port)
            .with_class(1 << port)
            .into_bytes()[0];
        let value = if enable { bits } else { 0 };
        self.update(Pd69104Register::DetectClassEnable.addr(), bits, value)
    }

    fn read_port_status(&mut self, port: u8) -> Result<PortStatus, B::Error> {
        let raw = self.read(Pd69104Register::PortStatus.port(port))?;
        Ok(PortStatus::from_bytes([raw]))
    }

    /// PoE class of `port`. `None` if the port was not classified.
    pub fn get_port_class(&mut self, port: usize) -> Result<Option<u8>, B::Error> {
        let port = Self::check_port(port)?;
        Ok(decode_port_class(self.read_port_status(port)?))
    }

    pub fn get_port_faults(&mut self, port: usize) -> Result<Faults, B::Error> {
        let port = Self::check_port(port)?;
        let raw = self.read(Pd69104Register::PortFaultStatus.port(port))?;
        let nibble = (raw >> ((port % 2) * 4)) & 0x0F;
        let status = self.read_port_status(port)?;
        Ok(decode_port_faults(nibble, status))
    }

    /// State of the 4 power good input pins. These reflect how the board itself is powered.
    pub fn get_power_good_pins(&mut self) -> Result<u8, B::Error> {
        let raw = self.read(Pd69104Register::PowerGood.addr())?;
        Ok(PowerGood::from_bytes([raw]).pins())
    }

    pub fn get_port_power_good(&mut self, port: usize) -> Result<bool, B::Error> {
        let port = Self::check_port(port)?;
        let raw = self.read(Pd69104Register::PowerStatus.addr())?;
        Ok(PowerStatus::from_bytes([raw]).power_good() & (1 << port) != 0)
    }

    pub fn get_port_enabled(&mut self, port: usize) -> Result<bool, B::Error> {
        let port = Self::check_port(port)?;
        let raw = self.read(Pd69104Register::PowerStatus.addr())?;
        Ok(PowerStatus::from_bytes([raw]).power_enable() & (1 << port) != 0)
    }

    /// Power consumed on `port`, in milliwatts.
    pub fn read_port_power_mw(&mut self, port: usize) -> Result<u32, B::Error> {
        let port = Self::check_port(port)?;
        let watts = self.read(Pd69104Register::PortConsumption.port(port))?;
        Ok(u32::from(watts) * 1000)
    }

    /// Set the per-port power allocation limit. Only 6 bits are kept.
    pub fn set_port_power_limit(&mut self, port: usize, watts: u8) -> Result<(), B::Error> {
        let port = Self::check_port(port)?;
        if watts & !PORT_POWER_LIMIT_MASK != 0 {
            warn!("{MODEL} port {port} power limit {watts} W truncated to 6 bits");
        }
        self.write(
            Pd69104Register::PortPowerLimit.port(port),
            watts & PORT_POWER_LIMIT_MASK,
        )
    }

    pub fn get_port_power_limit(&mut self, port: usize) -> Result<u8, B::Error> {
        let port = Self::check_port(port)?;
        let raw = self.read(Pd69104Register::PortPowerLimit.port(port))?;
        Ok(raw & PORT_POWER_LIMIT_MASK)
    }

    fn check_bank(bank: u8) -> Result<(), B::Error> {
        if bank < NUM_POWER_BANKS {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                value: bank.into(),
                bits: 3,
            })
        }
    }

    pub fn set_system_power_budget(&mut self, bank: u8, watts: u8) -> Result<(), B::Error> {
        Self::check_bank(bank)?;
        self.write(Pd69104Register::PowerBank.port(bank), watts)
    }

    pub fn get_system_power_budget(&mut self, bank: u8) -> Result<u8, B::Error> {
        Self::check_bank(bank)?;
        self.read(Pd69104Register::PowerBank.port(bank))
    }

    /// Die temperature in degrees Celsius.
    pub fn read_temperature_c(&mut self) -> Result<i32, B::Error> {
        let raw = i32::from(self.read(Pd69104Register::Temperature.addr())?);
        Ok((raw * 96 - 2700) / 100)
    }

    pub fn export_chip_metric(&mut self, index: usize) -> Result<Option<Metric>, B::Error> {
        match index {
            0 => Ok(Some(Metric::int("Temperature", self.read_temperature_c()?))),
            _ => Ok(None),
        }
    }
}

impl<B: RegisterBus> PseChip for Pd69104<B> {
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
        Pd69104::device_online(self)
    }

    fn export_metric(&mut self, index: usize) -> Result<Option<Metric>, B::Error> {
        self.export_chip_metric(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mock_bus::MockI2c,
        transport::{I2cTransport, WireFlavor},
    };
    use strum::IntoEnumIterator;

    const ADDRESS: u8 = 0x20;

    fn chip() -> Pd69104<I2cTransport<MockI2c>> {
        let mock = MockI2c::flat(ADDRESS);
        Pd69104::new(I2cTransport::new(mock, ADDRESS, WireFlavor::BlockCommand))
    }

    fn mock(chip: &mut Pd69104<I2cTransport<MockI2c>>) -> &mut MockI2c {
        chip.bus_mut().inner_mut()
    }

    #[test]
    fn device_online_checks_device_type() {
        let mut chip = chip();
        assert!(!chip.device_online());
        mock(&mut chip).set_register(0, 0x43, 0x44);
        assert!(chip.device_online());
        mock(&mut chip).set_register(0, 0x43, 0x54);
        assert!(!chip.device_online());
        mock(&mut chip).set_register(0, 0x43, 0x44);
        mock(&mut chip).set_read_error(true);
        assert!(!chip.device_online());
    }

    #[test]
    fn init_reads_firmware_only() {
        let mut chip = chip();
        mock(&mut chip).set_register(0, 0x41, 0x2A);
        assert_eq!(chip.init().unwrap(), 0x2A);
        assert!(mock(&mut chip).writes().is_empty());
    }

    #[test]
    fn operation_mode_only_touches_its_port() {
        let mut chip = chip();
        mock(&mut chip).set_register(0, 0x12, 0b1001_0110);
        let auto = OperationMode::Auto;
        chip.set_port_operation_mode(2, auto).unwrap();
        assert_eq!(mock(&mut chip).register(0, 0x12), 0b1011_0110);

        for mode in OperationMode::iter() {
            chip.set_port_operation_mode(1, mode).unwrap();
            assert_eq!(chip.get_port_operation_mode(1).unwrap(), mode);
            let neighbour = chip.get_port_operation_mode(2).unwrap();
            assert_eq!(neighbour, OperationMode::Auto);
        }
    }

    #[test]
    fn detection_classification_bits() {
        let mut chip = chip();
        chip.set_detection_classification(1, true).unwrap();
        chip.set_detection_classification(3, true).unwrap();
        assert_eq!(mock(&mut chip).register(0, 0x14), 0b1010_1010);
        chip.set_detection_classification(1, false).unwrap();
        assert_eq!(mock(&mut chip).register(0, 0x14), 0b1000_1000);
    }

    #[test]
    fn port_class() {
        let mut chip = chip();
        let cases = [
            (0, None),
            (1, Some(1)),
            (4, Some(4)),
            (5, None),
            (6, Some(0)),
            (7, None),
        ];
        for (code, expected) in cases {
            mock(&mut chip).set_register(0, 0x0D, code << 4);
            let class = chip.get_port_class(1).unwrap();
            assert_eq!(class, expected, "class code {code}");
        }
    }

    #[test]
    fn port_faults_use_shared_fault_register() {
        let mut chip = chip();
        // Port 3 is the upper nibble of 0x76.
        mock(&mut chip).set_register(0, 0x76, 0b0011_0000);
        assert_eq!(
            chip.get_port_faults(3).unwrap(),
            Faults::OVER_TEMPERATURE | Faults::POWER_MANAGEMENT
        );
        assert_eq!(chip.get_port_faults(2).unwrap(), Faults::empty());

        mock(&mut chip).set_register(0, 0x0E, 0b0111_0001);
        assert_eq!(
            chip.get_port_faults(2).unwrap(),
            Faults::SHORT_CIRCUIT | Faults::OVER_CURRENT
        );
    }

    #[test]
    fn detection_faults() {
        let cases = [
            (detect::UNKNOWN, Faults::empty()),
            (detect::SHORT_CIRCUIT, Faults::SHORT_CIRCUIT),
            (detect::CAPACITANCE_TOO_HIGH, Faults::CAPACITANCE_TOO_HIGH),
            (detect::RESISTANCE_TOO_LOW, Faults::RESISTANCE_TOO_LOW),
            (detect::GOOD, Faults::empty()),
            (detect::RESISTANCE_TOO_HIGH, Faults::RESISTANCE_TOO_HIGH),
            (detect::OPEN_CIRCUIT, Faults::OPEN_CIRCUIT),
        ];
        for (code, expected) in cases {
            let status = PortStatus::new().with_detect(code);
            let faults = decode_port_faults(0, status);
            assert_eq!(faults, expected, "detect code {code}");
        }
    }

    #[test]
    fn power_good() {
        let mut chip = chip();
        mock(&mut chip).set_register(0, 0x91, 0b0010_1000);
        assert_eq!(chip.get_power_good_pins().unwrap(), 0b101);

        mock(&mut chip).set_register(0, 0x10, 0b0100_0110);
        assert!(chip.get_port_power_good(2).unwrap());
        assert!(!chip.get_port_power_good(1).unwrap());
        assert!(chip.get_port_enabled(1).unwrap());
        assert!(!chip.get_port_enabled(0).unwrap());
    }

    #[test]
    fn port_power_and_limit() {
        let mut chip = chip();
        mock(&mut chip).set_register(0, 0x94, 7);
        assert_eq!(chip.read_port_power_mw(2).unwrap(), 7000);

        chip.set_port_power_limit(0, 0xFF).unwrap();
        assert_eq!(mock(&mut chip).register(0, 0x81), 0x3F);
        chip.set_port_power_limit(3, 20).unwrap();
        assert_eq!(chip.get_port_power_limit(3).unwrap(), 20);
        assert!(matches!(chip.set_port_power_limit(4, 20), Err(Error::InvalidPort(4))));
    }

    #[test]
    fn system_power_budget_banks() {
        let mut chip = chip();
        chip.set_system_power_budget(7, 20).unwrap();
        assert_eq!(mock(&mut chip).register(0, 0x90), 20);
        assert_eq!(chip.get_system_power_budget(7).unwrap(), 20);
        assert!(matches!(
            chip.set_system_power_budget(8, 20),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn temperature_metric() {
        let mut chip = chip();
        mock(&mut chip).set_register(0, 0x70, 60);
        assert_eq!(
            chip.export_metric(0).unwrap(),
            Some(Metric::int("Temperature", 30))
        );
        mock(&mut chip).set_register(0, 0x70, 0);
        assert_eq!(
            chip.export_metric(0).unwrap(),
            Some(Metric::int("Temperature", -27))
        );
        assert_eq!(chip.export_metric(1).unwrap(), None);
    }
}
