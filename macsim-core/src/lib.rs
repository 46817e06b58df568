#[macro_use]
extern crate static_assertions;

pub mod core;
pub mod disasm;
pub mod encoding;
pub mod instruction;
pub mod memory;
pub mod registers;
pub mod simulator;

pub mod unit {
    //! Collection of the units in which memory can be addressed (in bytes).

    /// A _byte_ is 8 bits.
    pub const BYTE: u32 = 1;

    /// A _halfword_ is 16 bits (2 bytes).
    pub const HALFWORD: u32 = 2;

    /// A _word_ is 32 bits (4 bytes).
    pub const WORD: u32 = 4;
}

/// The width in bytes of one encoded instruction.
///
/// > The base RISC-V ISA has fixed-length 32-bit instructions that must be naturally aligned on
/// > 32-bit boundaries.
///
/// The `mac` extension only adds another 32-bit encoding, so every instruction this simulator
/// supports occupies exactly one word, and a non-branching instruction advances the program
/// counter by exactly this amount.
pub const INSTRUCTION_WIDTH: u32 = unit::WORD;
