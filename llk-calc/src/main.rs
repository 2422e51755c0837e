//! Command-line interface (CLI) for llk-calc
//!
//! Evaluates calculator programs, or dumps the generated tables (FIRST/FOLLOW
//! sets, parse table entries and lookahead DFAs) for inspection.

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use llk_calc::{CalcParser, SymTab};
use llk_gen::BuildConfig;
use llk_gen::write::{write_dfas, write_first_follow, write_table};
use std::io::Write;
use std::path::PathBuf;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Global lookahead limit for conflict resolution
    #[arg(long, default_value_t = 4)]
    lookahead: usize,

    /// Maximum conflict nesting while resolving a conflict
    #[arg(long, default_value_t = 8)]
    conflict_depth: usize,

    /// Command
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluates a program and prints the value of every statement
    Eval {
        /// Input file with llk-calc statements
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Prints the generated tables
    Dump,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = BuildConfig::new()
        .with_lookahead(args.lookahead)
        .with_conflict_depth(args.conflict_depth);
    let calc = CalcParser::new(&config).context("can't build calculator tables")?;

    match args.command {
        Commands::Eval { input } => {
            let source = std::fs::read_to_string(&input)
                .with_context(|| format!("can't open {:?}", input))?;
            let mut symtab = SymTab::new();
            let values = calc
                .eval(&source, &mut symtab)
                .with_context(|| format!("error in {:?}", input))?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for value in values {
                writeln!(out, "{value}")?;
            }
            log::info!("{} variables defined", symtab.len());
        }
        Commands::Dump => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write_first_follow(&mut out, calc.tables())?;
            writeln!(out)?;
            write_table(&mut out, calc.tables())?;
            writeln!(out)?;
            write_dfas(&mut out, calc.tables())?;
        }
    }
    Ok(())
}
