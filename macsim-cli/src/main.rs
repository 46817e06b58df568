use clap::Parser;
use goblin::elf::program_header::PT_LOAD;
use log::info;
use macsim_core::core::{Config, Core, HaltReason};
use macsim_core::simulator::{RunOutcome, Simulator};
use std::fs::File;
use std::io::Read;
use std::process::ExitCode;

/// Headroom added above the highest loadable segment for stack and heap.
const MEMORY_HEADROOM: u32 = 1 << 20;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Stop after this many retired instructions
    #[arg(long)]
    max_instructions: Option<u64>,
    // Elf file to run
    elf: String,
}

fn main() -> std::io::Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    let mut buf = Vec::new();

    let mut file = File::open(&args.elf)?;
    file.read_to_end(&mut buf)?;

    let elf_header = goblin::elf::Elf::parse(&buf).expect("failed to parse elf file");

    let segments: Vec<_> = elf_header
        .program_headers
        .iter()
        .filter(|h| h.p_type == PT_LOAD)
        .collect();

    // Size the flat memory region to cover every loadable segment.
    let memory_base = segments
        .iter()
        .map(|h| h.p_paddr as u32)
        .min()
        .unwrap_or(0)
        & !0xFFF;
    let memory_end = segments
        .iter()
        .map(|h| (h.p_paddr + h.p_memsz) as u32)
        .max()
        .unwrap_or(0);
    let memory_size = memory_end
        .wrapping_sub(memory_base)
        .saturating_add(MEMORY_HEADROOM);

    let mut core = Core::new(Config {
        reset_vector: elf_header.header.e_entry as u32,
        memory_base,
        memory_size,
    })
    .expect("elf file maps a degenerate memory region");

    for h in &segments {
        core.load_image(h.p_paddr as u32, &buf[h.file_range()])
            .expect("elf segment falls outside mapped memory");
    }

    let mut simulator = Simulator::new(core);
    let outcome = simulator.run(args.max_instructions);
    info!(
        "{} instructions retired",
        simulator.instructions_retired()
    );

    match outcome {
        RunOutcome::Halted(HaltReason::Exit(code)) => Ok(ExitCode::from(code as u8)),
        RunOutcome::Halted(HaltReason::Breakpoint) => {
            eprintln!("guest stopped at a breakpoint");
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::Halted(HaltReason::UnsupportedEnvironmentCall(syscall)) => {
            eprintln!("guest issued unsupported environment call {syscall}");
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::Trapped { exception, pc } => {
            eprintln!(
                "guest trapped at {pc:#010x}: {exception} (cause {})",
                exception.code()
            );
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::BudgetExhausted => {
            eprintln!("instruction budget exhausted before the guest halted");
            Ok(ExitCode::FAILURE)
        }
    }
}
