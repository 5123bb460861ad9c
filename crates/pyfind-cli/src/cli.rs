use std::path::PathBuf;

use clap::{value_parser, ArgAction, Args, Parser, Subcommand};

pub const PYFIND_AFTER_HELP: &str = concat!(
    "Without a command, pyfind runs `list`.\n\n",
    "Environment:\n",
    "  PYFIND_TIMEOUT_MS         Per-process timeout (default 10000)\n",
    "  PYFIND_JOBS               Probe workers (default: available CPUs)\n",
    "  PYFIND_CONDA              Environment manager to query, or `off`\n",
    "  PYFIND_PATH_FROM_SHELL    Set to 1 to read PATH from the login shell\n",
    "  PYFIND_MAX_CAPTURE_BYTES  Output captured per process (default 1 MiB)\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "pyfind",
    author,
    version,
    about = "Discover the Python interpreters installed on this machine",
    disable_help_subcommand = true,
    after_help = PYFIND_AFTER_HELP
)]
#[allow(clippy::struct_excessive_bools)]
pub struct PyfindCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[arg(
        long,
        value_name = "MS",
        value_parser = value_parser!(u64).range(1..),
        help = "Kill probes that run longer than this (overrides PYFIND_TIMEOUT_MS)",
        global = true
    )]
    pub timeout_ms: Option<u64>,
    #[arg(
        long,
        value_name = "N",
        help = "Number of interpreters probed in parallel (overrides PYFIND_JOBS)",
        global = true
    )]
    pub jobs: Option<usize>,
    #[arg(
        long,
        value_name = "TOOL",
        conflicts_with = "no_conda",
        help = "Environment manager to list environments with (overrides PYFIND_CONDA)",
        global = true
    )]
    pub conda: Option<String>,
    #[arg(long, help = "Do not query an environment manager", global = true)]
    pub no_conda: bool,
    #[arg(
        long,
        help = "Read PATH from the login shell instead of the environment",
        global = true
    )]
    pub shell_path: bool,
    #[command(subcommand)]
    pub command: Option<CommandGroupCli>,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(about = "List the interpreters found on PATH and in conda environments")]
    List(ListArgs),
    #[command(about = "Probe a single path and follow its symlinks")]
    Probe(ProbeArgs),
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    #[arg(long, help = "Only show interpreters found directly, not symlink targets")]
    pub leaves_only: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[arg(value_name = "PATH", help = "Executable to probe")]
    pub path: PathBuf,
}
