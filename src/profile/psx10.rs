//! Board profile for 8-port switches built around a single IP8008.

use log::{debug, info};

use crate::{
    chip::PseChip,
    context::PoeContext,
    error::{Error, Result},
    ip8008::{self, Ip8008},
    metric::Metric,
    profile::Profile,
    scaling::watts_to_mw,
    transport::{ChipLocation, RegisterBus, WireFlavor},
    types::{Faults, PoeType},
};

pub const NAME: &str = "psx10";
pub const NUM_PORTS: usize = 8;
pub const I2C_ADDRESS: u8 = 0x64;
pub const CHIP_LOCATION: ChipLocation = ChipLocation {
    bus: 0,
    address: I2C_ADDRESS,
    flavor: WireFlavor::Transaction,
};
/// Budget of the board's own supply, in watts.
pub const OWN_POWER_BUDGET_W: u16 = 130;

/// Largest class code the chip reports for a classified device.
const MAX_CLASS: u8 = 8;
/// Class codes the chip reports for a failed classification.
const CLASS_ERROR_CODES: [u8; 2] = [9, 10];

pub struct Psx10<B> {
    chip: Ip8008<B>,
    report_class_errors: bool,
}

impl<B: RegisterBus> Psx10<B> {
    pub fn new(bus: B) -> Self {
        Self {
            chip: Ip8008::new(bus),
            report_class_errors: false,
        }
    }

    /// Flag classification failures as [`Faults::CLASSIFICATION_ERROR`].
    ///
    /// Off by default, in which case failed classifications only read as class 0.
    pub fn with_class_error_reporting(mut self, enabled: bool) -> Self {
        self.report_class_errors = enabled;
        self
    }

    pub fn ip8008(&self) -> &Ip8008<B> {
        &self.chip
    }

    pub fn ip8008_mut(&mut self) -> &mut Ip8008<B> {
        &mut self.chip
    }

    fn power_budget(ctx: &PoeContext) -> u16 {
        ctx.power_budget_override().unwrap_or(OWN_POWER_BUDGET_W)
    }

    fn remap_class(&self, class: u8, faults: Faults) -> (u8, Faults) {
        if class <= MAX_CLASS {
            return (class, faults);
        }
        if self.report_class_errors && CLASS_ERROR_CODES.contains(&class) {
            (0, faults | Faults::CLASSIFICATION_ERROR)
        } else {
            (0, faults)
        }
    }

    fn set_all_ports(&mut self, ctx: &PoeContext, enabled: bool) -> Result<(), B::Error> {
        for port in 0..ctx.num_ports() {
            self.chip.set_port_enabled(port, enabled)?;
        }
        Ok(())
    }
}

impl<B: RegisterBus> Profile for Psx10<B> {
    type BusError = B::Error;

    fn name(&self) -> &'static str {
        NAME
    }

    fn num_ports(&self) -> usize {
        NUM_PORTS
    }

    fn init(&mut self, _ctx: &mut PoeContext) -> Result<(), B::Error> {
        Ok(())
    }

    fn ready(&mut self, _ctx: &PoeContext) -> bool {
        self.chip.device_online()
    }

    fn enable(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        self.chip.set_device_enabled(true)?;
        self.set_all_ports(ctx, true)
    }

    fn disable(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        self.chip.set_device_enabled(false)?;
        self.set_all_ports(ctx, false)
    }

    fn apply_config(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        let budget = Self::power_budget(ctx);
        info!("Applying {NAME} config with a {budget} W budget");
        self.chip.set_power_budget(budget)?;

        for (index, port) in ctx.ports.iter().enumerate() {
            let active = port.settings.is_active();
            let state = if active { "enabled" } else { "disabled" };
            debug!("Port {index} {state}");
            self.chip.set_port_enabled(index, active)?;
        }
        Ok(())
    }

    fn update_port_status(&mut self, ctx: &mut PoeContext, port: usize) -> Result<(), B::Error> {
        if port >= ctx.num_ports() {
            return Err(Error::InvalidPort(port));
        }
        let enabled = self.chip.get_port_enabled(port)?;
        let active = self.chip.get_port_power_good(port)?;
        let power_mw = self.chip.read_port_power_mw(port)?;
        let faults = self.chip.get_port_faults(port)?;
        let class = self.chip.get_port_class(port)?;
        let (class, faults) = self.remap_class(class, faults);

        if let Some(entry) = ctx.port_mut(port) {
            let status = &mut entry.status;
            status.enabled = enabled;
            status.active = active;
            status.power_mw = power_mw;
            // @TODO: Read the page 1 per-port current limits once their scaling is known.
            status.power_limit_mw = None;
            status.poe_class = Some(class);
            status.faults = faults;
        }
        Ok(())
    }

    fn update_input_status(&mut self, _ctx: &mut PoeContext) -> Result<(), B::Error> {
        Ok(())
    }

    /// Also clears the latched port faults, so they are reported once.
    fn update_output_status(&mut self, ctx: &mut PoeContext) -> Result<(), B::Error> {
        ctx.output_status.power_budget_mw = watts_to_mw(Self::power_budget(ctx));
        ctx.output_status.poe_type = PoeType::At;
        self.chip.clear_faults(ip8008::NUM_PORTS)
    }

    fn export_port_metric(
        &mut self,
        ctx: &PoeContext,
        port: usize,
        index: usize,
    ) -> Result<Option<Metric>, B::Error> {
        if port >= ctx.num_ports() {
            return Err(Error::InvalidPort(port));
        }
        self.chip.export_port_metric(port, index)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ConfigBuilder, mock_bus::MockI2c, transport::I2cTransport};

    type TestProfile = Psx10<I2cTransport<MockI2c>>;

    fn profile() -> TestProfile {
        let mock = MockI2c::paged(I2C_ADDRESS);
        Psx10::new(I2cTransport::new(mock, I2C_ADDRESS, WireFlavor::Transaction))
    }

    fn mock(profile: &mut TestProfile) -> &mut MockI2c {
        profile.ip8008_mut().bus_mut().inner_mut()
    }

    fn context(builder: ConfigBuilder<'_>) -> PoeContext {
        PoeContext::new(builder.build().unwrap(), NUM_PORTS)
    }

    #[test]
    fn apply_config_uses_own_budget() {
        let mut profile = profile();
        let mut ctx = context(
            ConfigBuilder::new(NAME)
                .with_enabled(true)
                .with_port(0, "uplink")
                .with_port(5, "camera")
                .with_disabled_port(6, "spare"),
        );
        profile.apply_config(&mut ctx).unwrap();

        let m = mock(&mut profile);
        assert_eq!(m.register(0, 0xDA), 130);
        assert_eq!(m.register(0, 0xEB), 130);
        for port in 0..NUM_PORTS as u8 {
            let expected = u8::from(port == 0 || port == 5);
            assert_eq!(m.register(0, 0x10 + port), expected, "port {port}");
        }
    }

    #[test]
    fn apply_config_with_every_port_named() {
        let mut profile = profile();
        let builder = (0..NUM_PORTS).fold(
            ConfigBuilder::new(NAME).with_enabled(true),
            |builder, port| builder.with_port(port, "lan"),
        );
        let mut ctx = context(builder);
        profile.apply_config(&mut ctx).unwrap();

        let m = mock(&mut profile);
        assert!((0x10..=0x17).all(|reg| m.register(0, reg) == 0x01));
        // Trunk 0, trunk 1 and mirrored power hold 130 W, available current 130 W << 2.
        for (msb, lsb, expected) in [
            (0xD9, 0xDA, 130u16),
            (0xDB, 0xDC, 130),
            (0xEA, 0xEB, 130),
            (0xE8, 0xE9, 520),
        ] {
            let value = u16::from_be_bytes([m.register(0, msb), m.register(0, lsb)]);
            assert_eq!(value, expected, "registers {msb:#04x}/{lsb:#04x}");
        }
    }

    #[test]
    fn apply_config_uses_override() {
        let mut profile = profile();
        let mut ctx = context(ConfigBuilder::new(NAME).with_power_budget(60));
        profile.apply_config(&mut ctx).unwrap();
        assert_eq!(mock(&mut profile).register(0, 0xDA), 60);
    }

    #[test]
    fn oversized_override_programs_nothing() {
        let mut profile = profile();
        let mut ctx = context(
            ConfigBuilder::new(NAME)
                .with_power_budget(5000)
                .with_port(0, "uplink"),
        );
        assert!(matches!(
            profile.apply_config(&mut ctx),
            Err(Error::OutOfRange { bits: 12, .. })
        ));
        assert!(mock(&mut profile).writes().is_empty());
    }

    #[test]
    fn enable_powers_chip_then_ports() {
        let mut profile = profile();
        let mut ctx = context(ConfigBuilder::new(NAME));
        profile.enable(&mut ctx).unwrap();

        let m = mock(&mut profile);
        assert_eq!(m.register(0, 0x07), 0xF0);
        assert!((0x10..0x18).all(|reg| m.register(0, reg) == 1));
        let first_port_write = m.data_writes().iter().position(|w| w.register == 0x10);
        let bt_mode_write = m.data_writes().iter().position(|w| w.register == 0x07);
        assert!(bt_mode_write < first_port_write);
    }

    #[test]
    fn disable_turns_chip_off_before_ports() {
        let mut profile = profile();
        let mut ctx = context(ConfigBuilder::new(NAME));
        profile.enable(&mut ctx).unwrap();
        mock(&mut profile).clear_log();

        profile.disable(&mut ctx).unwrap();
        let m = mock(&mut profile);
        assert_eq!(m.register(0, 0x07), 0x00);
        assert!((0x10..0x18).all(|reg| m.register(0, reg) == 0));
        let first_port_write = m.data_writes().iter().position(|w| w.register == 0x10);
        let bt_mode_write = m.data_writes().iter().position(|w| w.register == 0x07);
        assert!(bt_mode_write.is_some());
        assert!(bt_mode_write < first_port_write);
    }

    #[test]
    fn port_status() {
        let mut profile = profile();
        let mut ctx = context(ConfigBuilder::new(NAME));
        let m = mock(&mut profile);
        m.set_register(0, 0x12, 0x01);
        m.set_register(0, 0x60, 0b0000_0100);
        m.set_register(0, 0xC4, 0x03);
        m.set_register(0, 0xC5, 0x56);
        m.set_register(0, 0x74, 0b0000_0001);
        m.set_register(0, 0x2A, 0x03);

        profile.update_port_status(&mut ctx, 2).unwrap();
        let status = ctx.port(2).unwrap().status;
        assert!(status.enabled);
        assert!(status.active);
        assert_eq!(status.power_mw, 53375);
        assert_eq!(status.power_limit_mw, None);
        assert_eq!(status.poe_class, Some(3));
        assert_eq!(status.faults, Faults::OVER_CURRENT);

        assert!(matches!(
            profile.update_port_status(&mut ctx, NUM_PORTS),
            Err(Error::InvalidPort(8))
        ));
    }

    #[test]
    fn failed_classification_reads_as_class_0() {
        let mut profile = profile();
        let mut ctx = context(ConfigBuilder::new(NAME));
        mock(&mut profile).set_register(0, 0x28, 0x09);
        profile.update_port_status(&mut ctx, 0).unwrap();
        let status = ctx.port(0).unwrap().status;
        assert_eq!(status.poe_class, Some(0));
        assert_eq!(status.faults, Faults::empty());
    }

    #[test]
    fn class_error_reporting() {
        let mut profile = profile().with_class_error_reporting(true);
        let mut ctx = context(ConfigBuilder::new(NAME));
        let cases = [
            (9, Faults::CLASSIFICATION_ERROR),
            (10, Faults::CLASSIFICATION_ERROR),
            (12, Faults::empty()),
        ];
        for (code, expected) in cases {
            mock(&mut profile).set_register(0, 0x28, code);
            profile.update_port_status(&mut ctx, 0).unwrap();
            let status = ctx.port(0).unwrap().status;
            assert_eq!(status.poe_class, Some(0), "class code {code}");
            assert_eq!(status.faults, expected, "class code {code}");
        }
    }

    #[test]
    fn output_status_clears_faults() {
        let mut profile = profile();
        let mut ctx = context(ConfigBuilder::new(NAME));
        mock(&mut profile).set_register(0, 0x70, 0x11);
        profile.update_output_status(&mut ctx).unwrap();

        assert_eq!(ctx.output_status.power_budget_mw, 130_000);
        assert_eq!(ctx.output_status.poe_type, PoeType::At);
        let m = mock(&mut profile);
        assert_eq!(m.last_write(0, 0x70), Some(0xFF));
        assert_eq!(m.last_write(0, 0x7F), Some(0xFF));
        assert_eq!(m.last_write(0, 0x0F), Some(0x00));
    }

    #[test]
    fn port_metrics_stop_after_three() {
        let mut profile = profile();
        let ctx = context(ConfigBuilder::new(NAME));
        assert!(profile.export_port_metric(&ctx, 0, 2).unwrap().is_some());
        assert!(profile.export_port_metric(&ctx, 0, 3).unwrap().is_none());
    }
}
