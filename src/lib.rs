//! This crate provides drivers for Power-over-Ethernet PSE (power sourcing equipment) controller
//! chips, and the board profiles which compose them into a switch-level PoE controller.
//!
//! It supports `no-std` environments by disabling the default `linux` feature.
//!
//! Supported PSE chips:
//! * IP8008 - paged register map, 8 ports.
//! * PD69104 - flat register map, 4 ports.
//!
//! Supported board profiles:
//! * `psx10` - one IP8008, 8 ports, fixed 130 W budget.
//! * `usw-flex` - one PD69104, 4 ports, budget derived from the upstream PoE type.
//!
//! Chips are reached over I2C through any [embedded_hal::i2c::I2c] implementation. With the
//! `linux` feature enabled, [linux::LinuxI2c] talks to `/dev/i2c-N` directly.
//!
//! The usual flow is:
//! * Load [config::Settings] from a [config::SettingsSource].
//! * Build a [controller::Controller] for the configured profile.
//! * Run one [controller::Action] per invocation (`show`, `apply`, `enable`, `disable`).

#![cfg_attr(not(feature = "std"), no_std)]

pub mod chip;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod ip8008;
#[cfg(feature = "linux")]
pub mod linux;
pub mod metric;
pub mod pd69104;
pub mod profile;
pub mod registers;
pub mod reset;
pub mod scaling;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_bus;
