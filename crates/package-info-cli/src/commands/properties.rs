use crate::errors::PackageInfoError;
use crate::plugin::PackageInfoPlugin;
use crate::GlobalOpts;
use colored::Colorize;

/// Print the configured properties, or every property the generators offer
pub fn handle_properties(available: bool, opts: &GlobalOpts) -> Result<(), PackageInfoError> {
    let plugin = PackageInfoPlugin::discover(opts.project_dir())?;
    let config = plugin.configuration()?;

    if available {
        for (key, generator) in &config.generators {
            println!("{}", key.bold());
            for property in generator.supported_properties() {
                println!("  {}-{}", key, property);
            }
        }
        return Ok(());
    }

    for request in &config.requests {
        println!(
            "{}-{} -> {}",
            request.generator, request.property_name, request.variable_name
        );
    }
    Ok(())
}
