use crate::errors::PackageInfoError;
use crate::logger;
use crate::plugin::PackageInfoPlugin;
use crate::GlobalOpts;
use std::io::{self, Write};

/// Generate package_info.py, or print it to stdout with `dry_run`
pub fn handle_generate(dry_run: bool, opts: &GlobalOpts) -> Result<(), PackageInfoError> {
    let plugin = PackageInfoPlugin::discover(opts.project_dir())?;
    logger::step(&format!(
        "Generating package info for {}",
        plugin.pyproject().path.display()
    ));

    let generated = plugin.generate_package_info(dry_run)?;
    if dry_run {
        let mut stdout = io::stdout().lock();
        stdout.write_all(generated.content.as_bytes())?;
        stdout.flush()?;
        logger::debug(&format!(
            "Dry run, {} was not written",
            generated.path.display()
        ));
    }
    Ok(())
}
