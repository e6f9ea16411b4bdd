use anyhow::Context;
use attractor_sim::SimConfig;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Particle cloud pulled around by a field of moving attractors, simulated on the GPU
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Run offscreen without opening a window
  #[arg(long, default_value_t = false)]
  headless: bool,
  /// Stop after this many rendered frames (headless only; default runs until Ctrl-C)
  #[arg(long, requires = "headless")]
  frames: Option<u64>,
  /// Seed for the initial particle and attractor state
  #[arg(long)]
  seed: Option<u64>,
  /// Alternate integrator kernel (WGSL)
  #[arg(long)]
  kernel: Option<PathBuf>,
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Generate shell completion scripts
  Completions {
    /// The shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
  },
}

fn start(args: Args) -> anyhow::Result<()> {
  let mut config = SimConfig::default();
  if let Some(seed) = args.seed {
    config.seed = seed;
  }
  if let Some(kernel) = args.kernel {
    config.kernel_path = kernel;
  }

  if args.headless {
    attractor_sim::state::run_headless(config, args.frames).context("headless run failed")
  } else {
    attractor_sim::state::run(config).context("simulation failed")
  }
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
  let args = Args::parse();

  if let Some(Commands::Completions { shell }) = args.command {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    return;
  }

  if let Err(err) = start(args) {
    log::error!("{err:#}");
    std::process::exit(1);
  }
}
