use clap::{Parser, ValueEnum};
use rvsim::asm;
use rvsim::views::{c_mirror, disasm, explain};
use std::fs;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    /// Linear disassembly with labels
    Disasm,
    /// C translation unit mirroring the interpreter
    C,
    /// C-like explanation with constant tracking
    Clike,
}

/// Assemble a RISC-V source file and print a view of the program
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the assembly source file
    input: String,

    /// Which view to print
    #[arg(short, long, value_enum, default_value_t = View::Disasm)]
    view: View,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("error reading {}: {error}", args.input);
            return ExitCode::FAILURE;
        }
    };

    let program = match asm::assemble(&source) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("assembly failed: {error}");
            return ExitCode::FAILURE;
        }
    };

    let text = match args.view {
        View::Disasm => disasm::render(&program),
        View::C => c_mirror::translate(&program),
        View::Clike => explain::explain(&program),
    };
    println!("{text}");
    ExitCode::SUCCESS
}
