use log::warn;

use crate::{
    config::{MAX_PORTS, PoeConfig, PortSettings, Settings},
    types::{InputStatus, OutputStatus, PortStatus},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub settings: PortSettings,
    pub status: PortStatus,
}

/// Shared state between the controller and the active profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoeContext {
    pub settings: Settings,
    pub ports: heapless::Vec<Port, MAX_PORTS>,
    pub input_status: InputStatus,
    pub output_status: OutputStatus,
}

impl PoeContext {
    /// Keep the settings of the first `num_ports` ports. Settings for ports the board does not
    /// have are dropped.
    pub fn new(config: PoeConfig, num_ports: usize) -> Self {
        let PoeConfig { settings, ports } = config;
        let mut kept = heapless::Vec::new();
        for (index, port) in ports.into_iter().enumerate() {
            if index < num_ports {
                // At most MAX_PORTS entries.
                let _ = kept.push(Port {
                    settings: port,
                    status: PortStatus::default(),
                });
            } else if port.name.is_some() {
                warn!("Ignoring settings for port {index}, board only has {num_ports} ports");
            }
        }
        Self {
            settings,
            ports: kept,
            input_status: InputStatus::default(),
            output_status: OutputStatus::default(),
        }
    }

    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    pub fn power_budget_override(&self) -> Option<u16> {
        self.settings.power_budget
    }

    pub fn port(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    pub fn port_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.ports.get_mut(index)
    }
}
