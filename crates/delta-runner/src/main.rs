//! Command line front end for the live runner

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use delta_diff::{GraphSyncData, Subtree, SubtreeId};
use delta_runner::{LiveRunner, RunnerError, RunnerOptions, TracingEventSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("delta-runner")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Incremental live execution of associative programs")
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .arg(
            Arg::new("options")
                .long("options")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON file with runner options"),
        )
        .subcommand(
            Command::new("run")
                .about("Run a program, one subtree per statement")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Program source"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print globals as JSON"),
                ),
        )
        .subcommand(Command::new("repl").about("Read statements from stdin in interpreter mode"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_options(path: Option<&PathBuf>) -> anyhow::Result<RunnerOptions> {
    let Some(path) = path else {
        return Ok(RunnerOptions::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    RunnerOptions::from_json(&text).with_context(|| format!("parsing options in {}", path.display()))
}

fn print_failure(err: &RunnerError) {
    eprintln!("{err}");
    for diagnostic in err.diagnostics() {
        eprintln!("  {diagnostic}");
    }
}

fn run(path: &Path, json: bool, options: RunnerOptions) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let statements = delta_lang::parse_program(&source).with_context(|| format!("parsing {}", path.display()))?;

    let mut batch = GraphSyncData::builder();
    for statement in statements {
        batch = batch.add(Subtree::new(SubtreeId::new(), vec![statement]));
    }

    let runner = LiveRunner::new(options.with_root_module_path(path), Arc::new(TracingEventSink))?;
    match runner.update_graph(&batch.build()) {
        Ok(report) => {
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
        }
        Err(err) => {
            print_failure(&err);
            std::process::exit(1);
        }
    }

    if json {
        let globals: serde_json::Map<String, serde_json::Value> = runner
            .globals()?
            .into_iter()
            .map(|(name, value)| serde_json::to_value(value).map(|value| (name, value)))
            .collect::<Result<_, _>>()?;
        println!("{}", serde_json::to_string_pretty(&globals)?);
    } else {
        print!("{}", runner.get_core_dump()?);
    }
    Ok(())
}

async fn repl(options: RunnerOptions) -> anyhow::Result<()> {
    let runner = LiveRunner::new(options.with_interpreter_mode(true), Arc::new(TracingEventSink))?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            ":quit" | ":q" => break,
            ":dump" => {
                print!("{}", runner.get_core_dump()?);
                continue;
            }
            _ => {}
        }
        if let Some(name) = line.strip_prefix(":query ") {
            match runner.begin_query_node_value(name.trim())?.wait().await? {
                Some(value) => println!("{value}"),
                None => println!("{} is not defined", name.trim()),
            }
            continue;
        }

        match runner.begin_update_code(line)?.wait().await {
            Ok(report) => {
                for warning in &report.warnings {
                    eprintln!("warning: {warning}");
                }
                for name in &report.modified_symbols {
                    if let Some(value) = runner.begin_query_node_value(name.as_str())?.wait().await? {
                        println!("{name} = {value}");
                    }
                }
            }
            Err(err) => print_failure(&err),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let options = load_options(matches.get_one::<PathBuf>("options"))?;

    match matches.subcommand() {
        Some(("run", args)) => {
            let file = args
                .get_one::<PathBuf>("file")
                .context("missing program file")?;
            let json = args.get_flag("json");
            let file = file.clone();
            tokio::task::spawn_blocking(move || run(&file, json, options)).await??;
        }
        Some(("repl", _)) => repl(options).await?,
        _ => {
            cli().print_help()?;
        }
    }
    Ok(())
}
