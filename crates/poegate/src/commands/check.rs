//! `poegate check`: validate config, list ports, probe the switch.

use poegate_config::{Settings, config_path, load_settings};
use poegate_core::UnifiActuator;

use crate::cli::{CheckArgs, GlobalOpts};
use crate::error::CliError;

pub async fn handle(args: &CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config_path(global.config.as_deref());
    let settings = load_settings(&path)?;

    println!("Config: {}", path.display());
    println!("Listen: {}", settings.server.bind_addr()?);
    println!(
        "Auth:   {}",
        if settings.server.auth_token.is_some() {
            "token required"
        } else {
            "disabled"
        }
    );
    println!();
    print_ports(&settings);

    if args.offline {
        return Ok(());
    }

    let actuator = UnifiActuator::from_config(&settings.switch)?;
    let device = actuator.device().await?;
    println!();
    println!(
        "Switch: {} ({}) state={} ip={}",
        device.name,
        device.model,
        device.state,
        device.ip_address.as_deref().unwrap_or("-")
    );
    if !device.is_switch() {
        tracing::warn!(device = %device.name, "device does not advertise switching features");
    }
    Ok(())
}

fn print_ports(settings: &Settings) {
    let width = settings
        .registry
        .iter()
        .map(|p| p.label.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    println!("{:<6} {:<width$} {:<6} IP", "PORT", "NAME", "SWITCH");
    for port in settings.registry.iter() {
        let ip = port.ip.map_or_else(|| "-".to_owned(), |ip| ip.to_string());
        println!(
            "{:<6} {:<width$} {:<6} {ip}",
            port.id.as_str(),
            port.label,
            port.switch_port
        );
    }
}
