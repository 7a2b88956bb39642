//! Settings the controller acts on.
//!
//! Settings come from a key/value [`SettingsSource`]. There is one global section, plus one
//! group per configured port:
//!
//! | Key            | Section | Meaning                                              |
//! |----------------|---------|------------------------------------------------------|
//! | `enabled`      | global  | `1` to power ports, `0` to shut everything down      |
//! | `profile`      | global  | Board profile name, e.g. `psx10`                     |
//! | `power_budget` | global  | Optional budget override in watts. `0` means unset   |
//! | `port`         | port    | Zero based port index                                |
//! | `name`         | port    | Port name. Ports without a name stay unpowered       |
//! | `disabled`     | port    | Optional. `1` keeps a named port unpowered           |

use log::debug;

use crate::error::ConfigError;

/// Most ports any supported board has.
pub const MAX_PORTS: usize = 10;
pub const NAME_LEN: usize = 32;

pub type Name = heapless::String<NAME_LEN>;

/// Read-only key/value store holding the settings.
pub trait SettingsSource {
    /// Value of a global setting.
    fn setting(&self, key: &str) -> Option<&str>;

    /// Number of port groups.
    fn port_group_count(&self) -> usize;

    /// Value of a setting in port group `group`.
    fn port_setting(&self, group: usize, key: &str) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub profile: Name,
    /// Overrides the board's own budget when set.
    pub power_budget: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSettings {
    pub name: Option<Name>,
    pub disabled: bool,
}

impl PortSettings {
    /// Whether the port should be powered.
    pub fn is_active(&self) -> bool {
        self.name.is_some() && !self.disabled
    }
}

/// Everything loaded from a [`SettingsSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoeConfig {
    pub settings: Settings,
    /// Indexed by port.
    pub ports: [PortSettings; MAX_PORTS],
}

fn parse_flag(value: &str, key: &'static str) -> Result<bool, ConfigError> {
    value
        .trim()
        .parse::<i32>()
        .map(|flag| flag != 0)
        .map_err(|_| ConfigError::InvalidValue(key))
}

fn parse_name(value: &str, key: &'static str) -> Result<Name, ConfigError> {
    Name::try_from(value).map_err(|_| ConfigError::InvalidValue(key))
}

impl Settings {
    pub fn load(source: &impl SettingsSource) -> Result<Self, ConfigError> {
        let enabled = source
            .setting("enabled")
            .ok_or(ConfigError::MissingSetting("enabled"))?;
        let profile = source
            .setting("profile")
            .ok_or(ConfigError::MissingSetting("profile"))?;
        let power_budget = source
            .setting("power_budget")
            .map(|value| {
                value
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidValue("power_budget"))
            })
            .transpose()?
            .filter(|&watts| watts != 0);

        Ok(Self {
            enabled: parse_flag(enabled, "enabled")?,
            profile: parse_name(profile, "profile")?,
            power_budget,
        })
    }
}

impl PoeConfig {
    /// Load global settings and all port groups.
    ///
    /// Port groups without a usable `port` index, or with one past [`MAX_PORTS`], are skipped.
    pub fn load(source: &impl SettingsSource) -> Result<Self, ConfigError> {
        let settings = Settings::load(source)?;
        let mut ports: [PortSettings; MAX_PORTS] = Default::default();

        for group in 0..source.port_group_count() {
            let index = source
                .port_setting(group, "port")
                .and_then(|value| value.trim().parse::<usize>().ok());
            let Some(index) = index.filter(|&index| index < MAX_PORTS) else {
                debug!("Ignoring port group {group} without a valid port index");
                continue;
            };

            let name = source
                .port_setting(group, "name")
                .map(|name| parse_name(name, "name"))
                .transpose()?;
            let disabled = source
                .port_setting(group, "disabled")
                .map(|value| parse_flag(value, "disabled"))
                .transpose()?
                .unwrap_or(false);
            ports[index] = PortSettings { name, disabled };
        }

        Ok(Self { settings, ports })
    }
}

/// Build a [`PoeConfig`] without a [`SettingsSource`].
///
/// ```
/// use poe_pse::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new("psx10")
///     .with_enabled(true)
///     .with_power_budget(60)
///     .with_port(0, "uplink")
///     .with_disabled_port(1, "camera")
///     .build()
///     .unwrap();
/// assert!(config.ports[0].is_active());
/// assert!(!config.ports[1].is_active());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder<'a> {
    profile: &'a str,
    enabled: bool,
    power_budget: Option<u16>,
    ports: [Option<(&'a str, bool)>; MAX_PORTS],
}

impl<'a> ConfigBuilder<'a> {
    pub fn new(profile: &'a str) -> Self {
        Self {
            profile,
            enabled: false,
            power_budget: None,
            ports: [None; MAX_PORTS],
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_power_budget(mut self, watts: u16) -> Self {
        self.power_budget = (watts != 0).then_some(watts);
        self
    }

    /// Name a port. Indices past [`MAX_PORTS`] are ignored.
    pub fn with_port(mut self, index: usize, name: &'a str) -> Self {
        if let Some(port) = self.ports.get_mut(index) {
            *port = Some((name, false));
        }
        self
    }

    pub fn with_disabled_port(mut self, index: usize, name: &'a str) -> Self {
        if let Some(port) = self.ports.get_mut(index) {
            *port = Some((name, true));
        }
        self
    }

    pub fn build(self) -> Result<PoeConfig, ConfigError> {
        let mut ports: [PortSettings; MAX_PORTS] = Default::default();
        for (port, entry) in ports.iter_mut().zip(self.ports) {
            if let Some((name, disabled)) = entry {
                *port = PortSettings {
                    name: Some(parse_name(name, "name")?),
                    disabled,
                };
            }
        }
        Ok(PoeConfig {
            settings: Settings {
                enabled: self.enabled,
                profile: parse_name(self.profile, "profile")?,
                power_budget: self.power_budget,
            },
            ports,
        })
    }
}
