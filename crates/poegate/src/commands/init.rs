use poegate_config::{config_path, write_default_config};

use crate::cli::{GlobalOpts, InitArgs};
use crate::error::CliError;

pub fn handle(args: &InitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config_path(global.config.as_deref());
    write_default_config(&path, args.force)?;

    println!("Wrote {}", path.display());
    println!("Fill in unifi.site_id and unifi.device_id, then run: poegate check");
    Ok(())
}
