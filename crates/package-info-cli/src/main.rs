use clap::{Parser, Subcommand};
use package_info::{
    commands::{
        generate,
        hook::{self, HookCommand},
        properties,
    },
    init_tracing, logger, GlobalOpts,
};

#[derive(Parser)]
#[command(name = "package-info")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Generate package_info.py for a Python project",
    long_about = "package-info writes a Python module holding project metadata and git state, \
                  and patches it into built wheels and sdists."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the package info file
    GenerateFile {
        /// Print the content to stdout instead of writing the file
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the post-command hook (regenerate and patch distributions after a build)
    Hook(HookCommand),
    /// List the configured properties and their variable names
    Properties {
        /// List every property the configured generators support
        #[arg(long)]
        available: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(
        cli.global.verbosity_level(),
        cli.global.quiet,
        cli.global.log_file.as_deref(),
    ) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    let result = match &cli.command {
        Commands::GenerateFile { dry_run } => generate::handle_generate(*dry_run, &cli.global)
            .map_err(|e| format!("Failed to generate package info - {}", e)),
        Commands::Hook(cmd) => hook::handle_hook(cmd, &cli.global)
            .map_err(|e| format!("Error encountered while patching distribution files - {}", e)),
        Commands::Properties { available } => {
            properties::handle_properties(*available, &cli.global)
                .map_err(|e| format!("Failed to resolve properties - {}", e))
        }
    };

    if let Err(message) = result {
        logger::error(&message);
        if cli.global.log_file.is_some() {
            logger::show_log_path();
        }
        std::process::exit(1);
    }
}
