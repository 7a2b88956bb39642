//! This module is used to define the registers on the supported PSE chips.
//!
//! Per-port registers are declared by their port 0 address. Use the `port` helpers to get the
//! address for a specific port.

pub mod ip8008 {
    //! IP8008 register map.
    //!
    //! Unless noted otherwise, registers live on page 0. Telemetry is stored in register pairs,
    //! most significant byte first.

    use modular_bitfield::prelude::*;

    pub const PAGE_0: u8 = 0;
    pub const PAGE_1: u8 = 1;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[repr(u8)]
    pub enum Ip8008Register {
        /// __R/W__ - Page select. Shared across all pages.
        ///
        /// See [`PageSelect`].
        SetPage = 0x00,
        /// __R__ - Device ID, high byte.
        DeviceIdMsb = 0x01,
        /// __R__ - Device ID, low byte.
        DeviceIdLsb = 0x02,
        /// __R/W__ - 802.3bt mode.
        BtMode = 0x07,
        /// __W__ - Global event clear.
        GlobalClear = 0x0F,
        /// __R/W__ - Power control, one register per port.
        ///
        /// See [`PowerControl`].
        PowerControl = 0x10,
        /// __R__ - Requested class status, one register per port.
        ReqClassStatus = 0x28,
        /// __R__ - Port power good bitmap, bit N => port N.
        PortPowerStatus = 0x60,
        /// __R/W__ - Power estimation and allocation mode.
        ///
        /// See [`PowerAllocMode`].
        PowerAllocMode = 0x6C,
        /// __R/W1C__ - Port event status, one register pair per port.
        Status = 0x70,
        /// __R/W__ - Current/voltage/temperature polling.
        ///
        /// See [`IvtPoll`].
        IvtPoll = 0x81,
        /// __R__ - Supply voltage pair, 4 fraction bits.
        SupplyVoltage = 0x8E,
        /// __R__ - Port current pair, 2 fraction bits.
        CurrentStatus = 0x90,
        /// __R__ - Port voltage drop pair, 4 fraction bits.
        VoltageStatus = 0xA0,
        /// __R__ - Port temperature pair, 4 fraction bits.
        TempStatus = 0xB0,
        /// __R__ - Port consumed power pair, 4 fraction bits. Only bits 2:0 of the high byte
        /// are valid.
        ConsumedPower = 0xC0,
        /// __R__ - Total consumed current pair, 2 fraction bits.
        ConsumedCurrent = 0xD2,
        /// __R__ - Total consumed power pair, 4 fraction bits.
        ConsumedPowerTotal = 0xD4,
        /// __R/W__ - Trunk select.
        TrunkSelect = 0xD8,
        /// __R/W__ - Trunk 0 power limit pair, watts.
        Trunk0Limit = 0xD9,
        /// __R/W__ - Trunk 1 power limit pair, watts.
        Trunk1Limit = 0xDB,
        /// __R/W__ - Limit type.
        ///
        /// See [`PowerRegister`].
        PowerRegister = 0xDE,
        /// __R/W__ - Victim strategy when over budget.
        VictimStrategy = 0xDF,
        /// __R/W__ - Available current pair, 2 fraction bits.
        AvailableCurrent = 0xE8,
        /// __R/W__ - Mirrored power budget pair, watts.
        MirroredPower = 0xEA,
    }

    impl Ip8008Register {
        /// Register address.
        #[inline]
        pub const fn addr(self) -> u8 {
            self as u8
        }

        /// Address of the low byte, for registers stored as a pair.
        #[inline]
        pub const fn lsb(self) -> u8 {
            self as u8 + 1
        }

        /// Address of this register for the given port.
        ///
        /// Telemetry and status registers are pairs, so consecutive ports are two apart.
        #[inline]
        pub const fn port(self, port: u8) -> u8 {
            let stride = match self {
                Self::PowerControl | Self::ReqClassStatus => 1,
                _ => 2,
            };
            self as u8 + port * stride
        }
    }

    /// Registers which are only reachable on page 1.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[repr(u8)]
    pub enum Ip8008Page1Register {
        /// __R/W__ - Supply voltage upper limit pair, 4 fraction bits.
        SupplyVoltageUpperLimit = 0xA0,
        /// __R/W__ - Supply voltage lower limit pair, 4 fraction bits.
        SupplyVoltageLowerLimit = 0xA2,
    }

    impl Ip8008Page1Register {
        #[inline]
        pub const fn addr(self) -> u8 {
            self as u8
        }

        #[inline]
        pub const fn lsb(self) -> u8 {
            self as u8 + 1
        }
    }

    /// Bits of [`Ip8008Register::SetPage`] owned by the page field.
    pub const PAGE_MASK: u8 = 0b1100_0000;
    /// Bits of [`Ip8008Register::PowerControl`] holding the PSE enable state.
    pub const PSE_ENABLE_MASK: u8 = 0b0000_0011;
    /// Auto-poll bit plus poll interval of [`Ip8008Register::IvtPoll`].
    pub const IVT_POLL_MASK: u8 = 0b0001_1111;
    /// Allocation field of [`Ip8008Register::PowerAllocMode`].
    pub const POWER_ALLOC_MODE_MASK: u8 = 0b0000_1100;
    /// Limit type field of [`Ip8008Register::PowerRegister`].
    pub const POWER_REGISTER_MASK: u8 = 0b0000_0011;
    /// Value written to [`Ip8008Register::BtMode`] when the device is enabled.
    pub const BT_MODE_ENABLED: u8 = 0xF0;
    /// Value pulsed into [`Ip8008Register::GlobalClear`] to clear all latched events.
    pub const GLOBAL_CLEAR_ALL: u8 = 0b0111_1111;
    /// Only the low 3 bits of the consumed power high byte are valid.
    pub const CONSUMED_POWER_MSB_MASK: u8 = 0b0000_0111;
    /// Requested class is a 4 bit field.
    pub const CLASS_MASK: u8 = 0b0000_1111;

    /// Page select register.
    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct PageSelect {
        #[skip]
        __: B2,
        /// Must be set for the page change to take effect.
        pub apply: bool,
        #[skip]
        __: B3,
        pub page: B2,
    }

    /// Per-port power control register.
    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct PowerControl {
        /// `0b01` => port enabled.
        pub pse_enable: B2,
        #[skip]
        __: B2,
        pub suspended_power_up: bool,
        #[skip]
        __: B3,
    }

    /// Current/voltage/temperature polling register.
    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct IvtPoll {
        pub poll_interval: B4,
        pub auto_poll: bool,
        #[skip]
        __: B2,
        pub ivt_process: bool,
    }

    /// Power estimation and allocation mode register.
    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct PowerAllocMode {
        pub estimation: B2,
        pub allocation: B2,
        #[skip]
        __: B4,
    }

    /// Power limit type register.
    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct PowerRegister {
        pub limit_enabled: bool,
        /// Set => limit is expressed as current, clear => as power.
        pub current_limit: bool,
        #[skip]
        __: B6,
    }
}

pub mod pd69104 {
    //! PD69104 register map.
    //!
    //! See Microsemi_PoE_PD69104B1_Generic_UG_Reg_Map.pdf

    use modular_bitfield::prelude::*;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[repr(u8)]
    pub enum Pd69104Register {
        /// __R__ - Port detection/classification result, one register per port.
        ///
        /// See [`PortStatus`].
        PortStatus = 0x0C,
        /// __R__ - Power enable and power good bits for all ports.
        ///
        /// See [`PowerStatus`].
        PowerStatus = 0x10,
        /// __R/W__ - Operation mode, 2 bits per port.
        OperationMode = 0x12,
        /// __R/W__ - Detection and classification enable for all ports.
        ///
        /// See [`DetectClassEnable`].
        DetectClassEnable = 0x14,
        /// __R__ - Firmware revision.
        Firmware = 0x41,
        /// __R__ - Device ID.
        ///
        /// See [`DeviceId`].
        DeviceId = 0x43,
        /// __R__ - Ambient temperature, vendor calibrated.
        Temperature = 0x70,
        /// __R__ - Port fault status. Two ports per register, one nibble each.
        PortFaultStatus = 0x75,
        /// __R/W__ - Port power allocation limit in watts, one register per port.
        PortPowerLimit = 0x81,
        /// __R/W__ - System power budget in watts, one register per power bank.
        PowerBank = 0x89,
        /// __R__ - Power good input pins.
        ///
        /// See [`PowerGood`].
        PowerGood = 0x91,
        /// __R__ - Port power consumption in watts, one register per port.
        PortConsumption = 0x92,
    }

    impl Pd69104Register {
        #[inline]
        pub const fn addr(self) -> u8 {
            self as u8
        }

        /// Address of this register for the given port (or power bank).
        #[inline]
        pub const fn port(self, port: u8) -> u8 {
            match self {
                // One nibble per port, so ports 2 and 3 share 0x76. The vendor header's
                // `x < 3` split would put port 2 in 0x75 and is not followed here.
                Self::PortFaultStatus => self as u8 + port / 2,
                _ => self as u8 + port,
            }
        }
    }

    /// Value of [`DeviceId::device_type`] for a PD69104.
    pub const DEVICE_TYPE: u8 = 0x4;
    /// Number of system power banks.
    pub const NUM_POWER_BANKS: u8 = 8;
    /// Valid bits of [`Pd69104Register::PortPowerLimit`].
    pub const PORT_POWER_LIMIT_MASK: u8 = 0b0011_1111;
    /// Over-temperature bit within a port's [`Pd69104Register::PortFaultStatus`] nibble.
    pub const FAULT_OVER_TEMPERATURE: u8 = 0b0001;
    /// Port turned off by power management, within the fault nibble.
    pub const FAULT_POWER_MANAGEMENT: u8 = 0b0010;

    /// Detection result codes of [`PortStatus::detect`].
    pub mod detect {
        pub const UNKNOWN: u8 = 0b000;
        pub const SHORT_CIRCUIT: u8 = 0b001;
        pub const CAPACITANCE_TOO_HIGH: u8 = 0b010;
        pub const RESISTANCE_TOO_LOW: u8 = 0b011;
        pub const GOOD: u8 = 0b100;
        pub const RESISTANCE_TOO_HIGH: u8 = 0b101;
        pub const OPEN_CIRCUIT: u8 = 0b110;
    }

    /// Classification result codes of [`PortStatus::class`].
    pub mod class {
        pub const UNKNOWN: u8 = 0b000;
        pub const CLASS_0: u8 = 0b110;
        pub const OVER_CURRENT: u8 = 0b111;
    }

    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct PortStatus {
        pub detect: B3,
        #[skip]
        __: B1,
        pub class: B3,
        #[skip]
        __: B1,
    }

    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct PowerStatus {
        pub power_enable: B4,
        pub power_good: B4,
    }

    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct DetectClassEnable {
        pub detect: B4,
        pub class: B4,
    }

    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct DeviceId {
        pub revision: B4,
        pub device_type: B4,
    }

    #[bitfield]
    #[derive(Debug, Clone, Copy)]
    pub struct PowerGood {
        #[skip]
        __: B3,
        pub pins: B4,
        #[skip]
        __: B1,
    }
}
