use clap::Parser;
use clap_num::maybe_hex;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use rvsim::cpu::MAX_STEPS_PER_REQUEST;
use rvsim::sim::Simulator;
use rvsim::views::disasm;
use std::error::Error;
use std::fs;

/// Assemble and run a RISC-V source file
///
/// Without --interactive the program free-runs until it halts or the
/// step budget is exhausted, then the final machine state is printed.
/// With --interactive an inspection prompt opens instead.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the assembly source file
    input: String,

    /// Open an interactive stepping prompt
    #[arg(short, long)]
    interactive: bool,

    /// Stop free-running when the PC reaches this address (use 0x
    /// prefix for hexadecimal)
    #[arg(short, long, value_parser=maybe_hex::<u32>)]
    pc_breakpoint: Option<u32>,

    /// Print every effect of every step while free-running
    #[arg(short, long)]
    trace: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let source = fs::read_to_string(&args.input)?;
    let mut sim = Simulator::new();
    if let Err(error) = sim.assemble(&source) {
        eprintln!("assembly failed: {error}");
        std::process::exit(1);
    }

    if args.interactive {
        interactive(&mut sim)?;
    } else {
        free_run(&mut sim, &args);
    }
    Ok(())
}

fn free_run(sim: &mut Simulator, args: &Args) {
    for _ in 0..MAX_STEPS_PER_REQUEST {
        if let Some(breakpoint) = args.pc_breakpoint {
            if sim.cpu().pc() == breakpoint {
                println!("breakpoint at pc=0x{breakpoint:08x}");
                break;
            }
        }
        let result = sim.step();
        if args.trace {
            if let Some(inst) = &result.inst {
                println!("0x{:08x}: {}", pc_before(&result, sim), disasm::format_instruction(inst, sim.program()));
            }
            for effect in &result.effects {
                println!("    {effect}");
            }
        }
        if result.halted {
            if let Some(trap) = &result.trap {
                println!("trap: {trap} (pc=0x{:08x})", sim.cpu().pc());
            }
            break;
        }
    }
    print_registers(sim);
}

/// The PC the step started from: the before half of its PC effect, or
/// the current PC if the step trapped before advancing
fn pc_before(result: &rvsim::cpu::StepResult, sim: &Simulator) -> u32 {
    result
        .effects
        .iter()
        .find_map(|effect| match effect {
            rvsim::cpu::Effect::Pc { before, .. } => Some(*before),
            _ => None,
        })
        .unwrap_or_else(|| sim.cpu().pc())
}

fn interactive(sim: &mut Simulator) -> Result<(), Box<dyn Error>> {
    println!("interactive simulator; 'help' lists commands");
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("(rvsim) ") {
            Ok(line) => {
                editor.add_history_entry(line.as_str()).ok();
                if !dispatch(sim, line.trim()) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(error) => {
                eprintln!("input error: {error}");
                break;
            }
        }
    }
    Ok(())
}

/// Run one prompt command; false means quit
fn dispatch(sim: &mut Simulator, line: &str) -> bool {
    let mut words = line.split_whitespace();
    match words.next() {
        None => true,
        Some("help") => {
            println!("step [n]   execute n instructions (default 1), printing effects");
            println!("regs       print the register file");
            println!("mem ADDR   print eight words starting at ADDR (0x prefix ok)");
            println!("disasm     print the program disassembly");
            println!("reset      reset the CPU (memory is kept)");
            println!("quit       leave the prompt");
            true
        }
        Some("step") | Some("s") => {
            let count = words
                .next()
                .and_then(|word| parse_u32(word))
                .unwrap_or(1)
                .clamp(1, MAX_STEPS_PER_REQUEST);
            for _ in 0..count {
                let result = sim.step();
                if let Some(inst) = &result.inst {
                    println!("{}", disasm::format_instruction(inst, sim.program()));
                }
                for effect in &result.effects {
                    println!("    {effect}");
                }
                if result.halted {
                    if let Some(trap) = &result.trap {
                        println!("trap: {trap}");
                    }
                    break;
                }
            }
            true
        }
        Some("regs") => {
            print_registers(sim);
            true
        }
        Some("mem") => {
            match words.next().and_then(parse_u32) {
                Some(base) => print_memory(sim, base),
                None => println!("usage: mem ADDR"),
            }
            true
        }
        Some("disasm") => {
            println!("{}", disasm::render(sim.program()));
            true
        }
        Some("reset") => {
            sim.reset();
            println!("cpu reset");
            true
        }
        Some("quit") | Some("q") | Some("exit") => false,
        Some(other) => {
            println!("unknown command '{other}'; try 'help'");
            true
        }
    }
}

fn parse_u32(word: &str) -> Option<u32> {
    if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        word.parse().ok()
    }
}

fn print_registers(sim: &Simulator) {
    println!("pc = 0x{:08x}", sim.cpu().pc());
    for (n, value) in sim.cpu().regs().iter().enumerate() {
        if *value != 0 || n == 2 {
            println!("x{n:<2} = {value} (0x{:08x})", *value as u32);
        }
    }
}

fn print_memory(sim: &Simulator, base: u32) {
    let base = base & !3;
    for n in 0..8 {
        let addr = base.wrapping_add(4 * n);
        match sim.cpu().memory.load_word(addr) {
            Ok(word) => println!("0x{addr:08x}: 0x{:08x}", word as u32),
            Err(error) => {
                println!("0x{addr:08x}: {error}");
                break;
            }
        }
    }
}
