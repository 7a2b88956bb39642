use std::{env, str::FromStr};

use inquire::Select;
use poe_pse::{
    config::ConfigBuilder,
    controller::{Action, Controller},
    linux::LinuxI2c,
    metric::MetricValue,
    profile::{BoardProfile, ProfileKind},
    reset::NoReset,
    transport::I2cTransport,
    types::SystemClock,
};
use strum::IntoEnumIterator;

// Applied when running `apply`. Adjust for your setup.
const POWER_BUDGET_W: u16 = 0; // 0 => use the board's own budget

fn main() {
    env_logger::init();

    // Action from the first argument, defaults to showing status
    let action = env::args()
        .nth(1)
        .map(|arg| Action::from_str(&arg).expect("Unknown action"))
        .unwrap_or(Action::Show);

    // Profile from the second argument or interactive selection
    let kind = env::args()
        .nth(2)
        .map(|arg| ProfileKind::from_str(&arg).expect("Unknown profile"))
        .unwrap_or_else(|| {
            Select::new("Select a board profile:", ProfileKind::iter().collect())
                .prompt()
                .expect("Failed to select profile")
        });

    let location = kind.chip_location();
    println!(
        "Using {kind} on /dev/i2c-{} address {:#04x}",
        location.bus, location.address
    );

    let i2c = LinuxI2c::open(location.bus).expect("Failed to open I2C bus");
    let bus = I2cTransport::new(i2c, location.address, location.flavor);

    // Name every port so `apply` powers all of them
    let names: Vec<String> = (0..kind.num_ports())
        .map(|port| format!("lan{}", port + 1))
        .collect();
    let config = names
        .iter()
        .enumerate()
        .fold(
            ConfigBuilder::new(kind.name())
                .with_enabled(true)
                .with_power_budget(POWER_BUDGET_W),
            |builder, (port, name)| builder.with_port(port, name),
        )
        .build()
        .expect("Invalid config");

    let profile = BoardProfile::new(kind, bus, NoReset);
    let mut controller = Controller::new(profile, config, SystemClock);

    controller.run(action).expect("Action failed");
    println!("{action}: done");

    if action != Action::Show {
        return;
    }

    let status = controller.status().expect("Failed to collect status");
    println!("\n--- {} ---", status.profile);
    println!("Input:  {}", status.input.poe_type);
    println!(
        "Output: {} ({:.1} W budget)",
        status.output.poe_type,
        status.output.power_budget_mw as f32 / 1000.0
    );

    for port in &status.ports {
        let faults: Vec<_> = port.status.faults.names().collect();
        println!(
            "Port {} {:<8} enabled={} active={} power={:.1}W class={:?} faults={:?}",
            port.index + 1,
            port.name.as_deref().unwrap_or("-"),
            port.status.enabled,
            port.status.active,
            port.status.power_mw as f32 / 1000.0,
            port.status.poe_class,
            faults,
        );
        for metric in &port.metrics {
            println!("    {}: {}", metric.name, metric.value);
        }
    }

    for chip in &status.chips {
        println!("\n--- {} ---", chip.model);
        for metric in &chip.metrics {
            match &metric.value {
                MetricValue::Text(text) => println!("{}: \"{}\"", metric.name, text),
                value => println!("{}: {}", metric.name, value),
            }
        }
    }
}
