use crate::errors::PackageInfoError;
use crate::logger;
use crate::plugin::{HostCommand, PackageInfoPlugin, TerminateEvent};
use crate::GlobalOpts;
use clap::Args;
use std::path::PathBuf;

/// Arguments of the post-command hook
#[derive(Args, Debug, Clone)]
pub struct HookCommand {
    /// Name of the host command that just finished (e.g. build)
    pub command: String,
    /// Format passed to `build --format` (wheel, sdist); all formats when omitted
    #[arg(long)]
    pub format: Option<String>,
    /// Directory holding the built artifacts, relative to the project root
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<PathBuf>,
}

impl HookCommand {
    pub fn event(&self) -> TerminateEvent {
        TerminateEvent {
            command: HostCommand::from_parts(
                &self.command,
                self.format.clone(),
                self.dist_dir.clone(),
            ),
        }
    }
}

pub fn handle_hook(cmd: &HookCommand, opts: &GlobalOpts) -> Result<(), PackageInfoError> {
    let event = cmd.event();
    if let HostCommand::Other(name) = &event.command {
        logger::debug(&format!("Nothing to do after '{}'", name));
        return Ok(());
    }

    let plugin = PackageInfoPlugin::discover(opts.project_dir())?;
    let patched = plugin.on_terminate(&event)?;
    for artifact in &patched {
        logger::debug(&format!(
            "{}: {:?} ({})",
            artifact.archive.display(),
            artifact.outcome,
            artifact.format
        ));
    }
    if !patched.is_empty() {
        logger::success(&format!("Patched {} distribution file(s)", patched.len()));
    }
    Ok(())
}
