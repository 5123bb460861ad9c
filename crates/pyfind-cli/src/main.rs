use std::sync::Arc;

use atty::Stream;
use clap::Parser;
use color_eyre::Result;
use pyfind_core::{
    python_list, python_probe, CommandContext, ExecutionOutcome, GlobalOptions,
    PythonListRequest, PythonProbeRequest, SharedEffects, SystemEffects,
};
use serde_json::{json, Value};

mod cli;
mod output;
mod style;

use cli::{CommandGroupCli, PyfindCli};
use output::{format_installation_table, installation_rows};
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = PyfindCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
        no_color: cli.no_color,
        timeout_ms: cli.timeout_ms,
        jobs: cli.jobs,
        conda: cli.conda.clone(),
        no_conda: cli.no_conda,
        shell_path: cli.shell_path,
    };

    let effects: SharedEffects = Arc::new(SystemEffects::new());
    let outcome = match CommandContext::new(&global, effects) {
        Ok(ctx) => dispatch(&ctx, cli.command.as_ref())?,
        Err(err) => ExecutionOutcome::user_error(
            format!("invalid configuration: {err:#}"),
            json!({ "reason": "invalid_config" }),
        ),
    };
    let code = emit_output(&cli, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn dispatch(ctx: &CommandContext, command: Option<&CommandGroupCli>) -> Result<ExecutionOutcome> {
    let outcome = match command {
        None => python_list(ctx, &PythonListRequest::default()),
        Some(CommandGroupCli::List(args)) => python_list(
            ctx,
            &PythonListRequest {
                leaves_only: args.leaves_only,
            },
        ),
        Some(CommandGroupCli::Probe(args)) => python_probe(
            ctx,
            &PythonProbeRequest {
                path: args.path.clone(),
            },
        ),
    };
    outcome.map_err(|err| color_eyre::eyre::eyre!("{err:?}"))
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("pyfind={level},pyfind_core={level},pyfind_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(cli: &PyfindCli, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.to_json_response())?);
    } else if !cli.quiet {
        println!("{}", style.status(&outcome.status, &outcome.message));
        if let Some(reason) = reason_from_details(&outcome.details) {
            println!("{}", style.info(&format!("Reason: {reason}")));
        }
        if let Some(rows) = installation_rows(&outcome.details).filter(|rows| !rows.is_empty()) {
            println!("{}", format_installation_table(&style, &rows));
        }
    }

    Ok(code)
}

fn reason_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .filter(|map| !map.contains_key("installations"))
        .and_then(|map| map.get("reason"))
        .and_then(Value::as_str)
}
