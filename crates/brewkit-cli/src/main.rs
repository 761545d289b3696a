mod commands;

use brewkit_core::{BrewfileLocation, BrewkitConfig};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "brewkit",
    version,
    about = "Reconcile a Brewfile with the packages installed on this machine"
)]
struct Cli {
    /// Package manager backend: "system" or "mock".
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct FileArgs {
    /// Read the Brewfile from this path ("-" for standard input).
    #[arg(long)]
    file: Option<String>,
    /// Use the per-user Brewfile instead of ./Brewfile.
    #[arg(long, default_value_t = false)]
    global: bool,
}

impl FileArgs {
    fn location(&self) -> BrewfileLocation {
        BrewfileLocation {
            file: self.file.clone(),
            global: self.global,
            dash_writes_to_stdout: false,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Install and upgrade everything the Brewfile declares, then write the lock file.
    Install {
        #[command(flatten)]
        location: FileArgs,
        /// Do not write Brewfile.lock.json.
        #[arg(long, default_value_t = false)]
        no_lock: bool,
        /// Leave installed but outdated entries alone.
        #[arg(long, default_value_t = false)]
        no_upgrade: bool,
        /// Skip entries in these groups (repeatable, or comma-separated).
        #[arg(long, value_delimiter = ',')]
        without: Vec<String>,
    },
    /// List the entries a Brewfile declares.
    List {
        #[command(flatten)]
        location: FileArgs,
        #[command(flatten)]
        kinds: commands::list::KindFilter,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BREWKIT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Commands::Install {
            location,
            no_lock,
            no_upgrade,
            without,
        } => BrewkitConfig::load_default()
            .map_err(|e| e.to_string())
            .and_then(|config| {
                let mut options = config.install_options();
                options.no_lock |= no_lock;
                options.no_upgrade |= no_upgrade;
                options.verbose = cli.verbose || cli.trace;
                options.without.extend(without);
                let backend = cli
                    .backend
                    .or(config.backend)
                    .unwrap_or_else(|| "system".to_owned());
                commands::install::run(&backend, &location.location(), &options, cli.json)
            }),
        Commands::List { location, kinds } => {
            commands::list::run(&location.location(), &kinds, cli.json)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:") {
                EXIT_MANIFEST_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
