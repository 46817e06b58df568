//! Provides a simulatable RV32I core extended with the custom `mac` instruction.

mod execute;

use crate::disasm::disassemble;
use crate::instruction::Instruction;
use crate::memory::{Memory, MemoryError};
use crate::registers::{Registers, Specifier};
use execute::Executor;
use log::trace;
use thiserror::Error;

/// The syscall number of `exit` in the standard Linux RISC-V syscall table, the one environment
/// call the step loop gives meaning to.
const SYSCALL_EXIT: u32 = 93;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address to which the core's PC register is reset.
    pub reset_vector: u32,
    /// Lowest address of the flat memory region.
    pub memory_base: u32,
    /// Size of the flat memory region in bytes.
    pub memory_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reset_vector: 0x8000_0000,
            memory_base: 0x8000_0000,
            memory_size: 4 << 20,
        }
    }
}

/// A single-hart core implementing the RV32I base ISA plus the custom `mac` extension.
///
/// The core owns its architectural state (the `x` registers, the `pc` register, and a flat main
/// memory). A decoded [`Instruction`] never owns any of this state; it only describes how one
/// [`step`](Self::step) should read and write it. Timing, pipelining, and hazards are not modeled:
/// one step retires one instruction.
#[derive(Debug)]
pub struct Core {
    config: Config,
    registers: Registers,
    memory: Memory,
}

impl Core {
    /// Creates a core in its reset state.
    ///
    /// Returns `None` if `config` describes a degenerate memory region (zero-sized, or wrapping
    /// around the address space).
    pub fn new(config: Config) -> Option<Self> {
        let memory = Memory::new(config.memory_base, config.memory_size)?;
        Some(Self {
            registers: Registers::new(config.reset_vector),
            config,
            memory,
        })
    }

    /// Force this core back to its reset state. Memory contents are preserved.
    pub fn reset(&mut self) {
        self.registers = Registers::new(self.config.reset_vector);
    }

    /// Provide a read-only view of this core's configuration.
    ///
    /// It is not possible to modify the configuration after creation.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Copies a program segment into memory. See [`Memory::load_image`].
    pub fn load_image(&mut self, address: u32, image: &[u8]) -> Result<(), MemoryError> {
        self.memory.load_image(address, image)
    }

    /// Decode and execute a single raw instruction word on this core.
    ///
    /// # Unspecified behavior
    ///
    /// > The behavior upon decoding a reserved instruction is UNSPECIFIED.
    ///
    /// This implementation chooses to raise an [`Exception::IllegalInstruction`] when
    /// `raw_instruction` has a reserved or unsupported encoding.
    pub fn execute_raw_instruction(&mut self, raw_instruction: u32) -> ExecutionResult {
        match Instruction::decode(raw_instruction) {
            Ok(instruction) => self.execute_instruction(instruction),
            Err(_) => ExecutionResult::Exception(Exception::IllegalInstruction),
        }
    }

    /// Execute a single decoded instruction on this core.
    ///
    /// This only performs the instruction-specific operations: updating `x` registers, updating
    /// memory, and updating the `pc` register. Fetching and the halt policy for environment calls
    /// live in [`step`](Self::step).
    pub fn execute_instruction(&mut self, instruction: Instruction) -> ExecutionResult {
        Executor {
            registers: &mut self.registers,
            memory: &mut self.memory,
        }
        .execute(instruction)
    }

    /// Fetch, decode, and execute the instruction the `pc` register points at.
    pub fn step(&mut self) -> StepOutcome {
        let pc = self.registers.pc();

        let raw_instruction = match self.fetch_instruction(pc) {
            Ok(raw_instruction) => raw_instruction,
            Err(exception) => return StepOutcome::Trapped(exception),
        };

        let instruction = match Instruction::decode(raw_instruction) {
            Ok(instruction) => instruction,
            Err(_) => return StepOutcome::Trapped(Exception::IllegalInstruction),
        };

        if log::log_enabled!(log::Level::Trace) {
            trace!("{pc:#010x}: {}", disassemble(&instruction, pc));
        }

        match self.execute_instruction(instruction) {
            ExecutionResult::Ok => StepOutcome::Retired,
            ExecutionResult::Exception(Exception::EnvironmentCall) => {
                let syscall = self.registers.x(Specifier::A7);
                if syscall == SYSCALL_EXIT {
                    StepOutcome::Halted(HaltReason::Exit(self.registers.x(Specifier::A0)))
                } else {
                    StepOutcome::Halted(HaltReason::UnsupportedEnvironmentCall(syscall))
                }
            }
            ExecutionResult::Exception(Exception::Breakpoint) => {
                StepOutcome::Halted(HaltReason::Breakpoint)
            }
            ExecutionResult::Exception(exception) => StepOutcome::Trapped(exception),
        }
    }

    /// "Independent instruction fetch unit"
    ///
    /// > The base RISC-V ISA has fixed-length 32-bit instructions that must be naturally aligned on
    /// > 32-bit boundaries.
    fn fetch_instruction(&self, address: u32) -> Result<u32, Exception> {
        self.memory.read_word(address).map_err(|err| match err {
            MemoryError::MisalignedAccess => Exception::InstructionAddressMisaligned,
            MemoryError::AccessFault => Exception::InstructionAccessFault,
        })
    }
}

/// The instruction-level completion signal: either the instruction's full effect was applied, or
/// it raised an exception and applied no effect.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ExecutionResult {
    /// Execution went normal
    Ok,
    /// Execution triggered an exception
    Exception(Exception),
}

/// Why [`Core::step`] stopped making forward progress.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StepOutcome {
    /// The instruction retired; the core can step again.
    Retired,
    /// The simulated program asked to stop.
    Halted(HaltReason),
    /// An exception was raised. Trap handling is not modeled, so this ends the simulation.
    Trapped(Exception),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum HaltReason {
    /// The program issued an `exit` environment call with the given code in `a0`.
    Exit(u32),
    /// The program hit an `ebreak`.
    Breakpoint,
    /// The program issued an environment call this simulator gives no meaning to; the syscall
    /// number found in `a7` is reported.
    UnsupportedEnvironmentCall(u32),
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Exception {
    /// Instruction address is not on a four-byte aligned boundary in memory.
    #[error("instruction address misaligned")]
    InstructionAddressMisaligned,
    #[error("instruction access fault")]
    InstructionAccessFault,
    /// Raised on any attempt to decode a reserved or unsupported instruction word, including
    /// custom-0 words whose funct bits do not match the `mac` signature.
    #[error("illegal instruction")]
    IllegalInstruction,
    #[error("breakpoint")]
    Breakpoint,
    #[error("load address misaligned")]
    LoadAddressMisaligned,
    #[error("load access fault")]
    LoadAccessFault,
    #[error("store address misaligned")]
    StoreAddressMisaligned,
    #[error("store access fault")]
    StoreAccessFault,
    #[error("environment call")]
    EnvironmentCall,
}

impl Exception {
    /// Returns the exception code (cause) for this exception, as the RISC-V privileged spec
    /// numbers them. Environment calls are reported with the machine-mode cause.
    pub fn code(&self) -> u32 {
        match self {
            Self::InstructionAddressMisaligned => 0,
            Self::InstructionAccessFault => 1,
            Self::IllegalInstruction => 2,
            Self::Breakpoint => 3,
            Self::LoadAddressMisaligned => 4,
            Self::LoadAccessFault => 5,
            Self::StoreAddressMisaligned => 6,
            Self::StoreAccessFault => 7,
            Self::EnvironmentCall => 11,
        }
    }
}
