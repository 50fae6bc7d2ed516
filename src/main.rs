use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use emu86::io::TerminalConsole;
use emu86::output::{Condition, Output};
use emu86::{error, AsmParser, Emulator, Program, RunResult, Span};

/// emu86 runs small 8086 assembly programs written for classroom exercises.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load a `.asm` file and run it against the terminal
    Run {
        /// `.asm` file to run
        name: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
        /// Print each instruction before it executes
        #[arg(short, long)]
        trace: bool,
        /// Print registers, flags and variable memory once execution stops
        #[arg(short, long)]
        dump: bool,
        /// Stop after this many instructions (0 for no limit)
        #[arg(long, value_name = "N")]
        max_steps: Option<u64>,
    },
    /// Load a `.asm` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
}

#[derive(Default)]
struct RunOptions {
    minimal: bool,
    trace: bool,
    dump: bool,
    max_steps: Option<u64>,
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    emu86::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(emu86::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    match (args.command, args.path) {
        (
            Some(Command::Run {
                name,
                minimal,
                trace,
                dump,
                max_steps,
            }),
            _,
        ) => run(
            &name,
            RunOptions {
                minimal,
                trace,
                dump,
                max_steps,
            },
        ),
        (Some(Command::Check { name }), _) => {
            file_message(Green, "Checking", &name);
            let src = read_source(&name)?;
            let program = load(&src)?;
            let summary = format!(
                "{} variables, {} instructions, {} labels",
                program.data().len(),
                program.len(),
                program.labels().count()
            );
            message(Green, "Success", summary.as_str());
            Ok(())
        }
        (None, Some(path)) => run(&path, RunOptions::default()),
        (None, None) => {
            println!("\n~ emu86 v{VERSION} ~");
            println!("{}", LOGO.truecolor(120, 200, 255).bold());
            println!("{SHORT_INFO}");
            std::process::exit(0);
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, right.as_str());
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    // Status lines would pollute program output in blackbox tests
    if Output::is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn read_source(name: &Path) -> Result<String> {
    fs::read_to_string(name).into_diagnostic()
}

/// Parse the source, printing any warnings to stderr.
fn load(src: &str) -> Result<Program> {
    let (program, warnings) = AsmParser::new(src).parse_with_warnings()?;
    for warning in warnings {
        eprintln!("{:?}", warning);
    }
    Ok(program)
}

fn run(name: &Path, opts: RunOptions) -> Result<()> {
    Output::set_minimal(opts.minimal);

    file_message(MsgColor::Green, "Loading", name);
    let src = read_source(name)?;
    let program = load(&src)?;
    let mut emulator = Emulator::new(TerminalConsole::new());
    emulator.set_trace(opts.trace || emu86::env::is_trace_enabled());
    emulator.load_program(program);

    let max_steps = match opts.max_steps {
        Some(0) => None,
        Some(limit) => Some(limit),
        None => emu86::env::max_steps(),
    };

    message(MsgColor::Green, "Running", "loaded program");
    let result = emulator.run(max_steps);
    Output::Normal.start_new_line();

    if opts.dump {
        let out = Output::Trace(Condition::Always);
        out.print_registers(emulator.registers());
        out.print_flags(emulator.raw_flags());
        out.print_memory(emulator.memory());
    }

    let span_at = |index: usize| {
        emulator
            .program()
            .get(index)
            .map(|stmt| stmt.span)
            .unwrap_or_else(Span::dummy)
    };
    match result {
        RunResult::Finished { steps } => {
            let summary = format!("{} after {} instructions", name.display(), steps);
            message(MsgColor::Green, "Completed", summary.as_str());
            Ok(())
        }
        RunResult::Fault { index, error, .. } => {
            Err(error::runtime_fault(&error, span_at(index), &src))
        }
        RunResult::StepLimit { index, steps } => {
            Err(error::runtime_step_limit(steps, span_at(index), &src))
        }
    }
}

const LOGO: &str = r#"
                         ___    __
  ___  ____ ___  __  __ ( _ )  / /_
 / _ \/ __ `__ \/ / / // _ \ / __ \
/  __/ / / / / / /_/ // (_) / /_/ /
\___/_/ /_/ /_/\__,_/ \___/\____/ "#;

const SHORT_INFO: &str = r"
Welcome to emu86, an interpreter for a small subset of 8086 assembly
with the classic DOS `int 21h` console services.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
