use std::fmt::Write as _;
use std::io::Read;
use std::path::PathBuf;
use std::process::exit;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueHint};

use reiz_core::compiler;
use reiz_core::error::{self, Error};
use reiz_core::gqa::{self, Render};
use reiz_core::reizql;
use reiz_core::schema;

/// Entrypoint called by [`crate::main`].
pub fn main() -> Result<()> {
    env_logger::builder().format_timestamp(None).init();
    let cli = Cli::parse();

    if let Err(error) = cli.command.run() {
        eprintln!("{error}");
        exit(1)
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), about, version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a ReizQL pattern into its typed matcher tree
    Parse(IoArgs),

    /// Parse & compile a ReizQL pattern down to the rendered graph query
    Compile {
        #[command(flatten)]
        io_args: IoArgs,

        /// Wrap the query for stats mode (`SELECT count(...)`)
        #[arg(long)]
        stats: bool,

        /// Row limit for the non-stats path
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// List the node kinds the schema knows about
    #[command(name = "list-kinds")]
    ListKinds,
}

#[derive(clap::Args, Debug)]
struct IoArgs {
    /// ReizQL source file, or `-` to read from stdin
    #[arg(value_parser, default_value = "-", value_hint(ValueHint::AnyPath))]
    input: PathBuf,
}

impl IoArgs {
    fn read(&self) -> Result<String> {
        if self.input == PathBuf::from("-") {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            Ok(source)
        } else {
            Ok(std::fs::read_to_string(&self.input)?)
        }
    }
}

impl Command {
    fn run(&self) -> Result<()> {
        match self {
            Command::Parse(io_args) => {
                let source = io_args.read()?;
                let tree = parse_or_report(&source)?;
                println!("{tree:#?}");
                Ok(())
            }
            Command::Compile {
                io_args,
                stats,
                limit,
            } => {
                let source = io_args.read()?;
                let tree = parse_or_report(&source)?;
                let query = compile_or_report(&source, &tree, *stats, *limit)?;
                println!("{query}");
                Ok(())
            }
            Command::ListKinds => {
                let mut out = String::new();
                for kind in schema::ALL_KINDS {
                    writeln!(out, "{}", kind.name())?;
                }
                print!("{out}");
                Ok(())
            }
        }
    }
}

fn parse_or_report(source: &str) -> Result<reizql::Match> {
    reizql::parse(source).map_err(|e| report_and_wrap(source, &e))
}

fn compile_or_report(
    source: &str,
    tree: &reizql::Match,
    stats: bool,
    limit: i64,
) -> Result<String> {
    let inner = || -> Result<String, Error> {
        let mut select = compiler::compile(tree)?;
        if stats {
            let value = compiler::wrap_for_stats(select);
            Ok(format!("SELECT {}", value.rendered()))
        } else {
            compiler::decorate_for_results(&mut select, tree, limit)?;
            Ok(gqa::as_edgeql(&select))
        }
    };
    inner().map_err(|e| report_and_wrap(source, &e))
}

fn report_and_wrap(source: &str, error: &Error) -> anyhow::Error {
    if let Some(report) = error::report("<input>", source, error) {
        anyhow::anyhow!(report)
    } else {
        anyhow::anyhow!(error.to_string())
    }
}
