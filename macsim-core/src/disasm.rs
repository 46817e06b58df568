//! Instruction disassembler for trace output.
//!
//! Rendering is a pure function of the decoded instruction (and the address it sits at, used only
//! to resolve pc-relative targets). It exists for tracing and debugging; nothing here feeds back
//! into execution.

use crate::instruction::Instruction;

/// Renders `instruction` in canonical assembly syntax.
///
/// `pc` must be the address the instruction was fetched from; jump and branch targets are shown as
/// absolute addresses computed relative to it. Two instructions with identical operands always
/// render identically.
pub fn disassemble(instruction: &Instruction, pc: u32) -> String {
    let mnemonic = instruction.mnemonic();
    match *instruction {
        Instruction::Mac { dest, src1, src2 } | Instruction::Op { dest, src1, src2, .. } => {
            format!("{mnemonic} {dest}, {src1}, {src2}")
        }
        Instruction::OpImm {
            dest,
            src,
            immediate,
            ..
        } => format!("{mnemonic} {dest}, {src}, {immediate}"),
        Instruction::OpShiftImm {
            dest,
            src,
            shift_amount_u5,
            ..
        } => format!("{mnemonic} {dest}, {src}, {shift_amount_u5}"),
        // The U-immediate is stored with its low 12 bits cleared; assembly syntax shows the raw
        // 20-bit field.
        Instruction::Lui { dest, immediate } | Instruction::Auipc { dest, immediate } => {
            format!("{mnemonic} {dest}, {:#x}", (immediate as u32) >> 12)
        }
        Instruction::Jal { dest, offset } => {
            format!("{mnemonic} {dest}, {:#x}", pc.wrapping_add_signed(offset))
        }
        Instruction::Jalr { dest, base, offset } => {
            format!("{mnemonic} {dest}, {offset}({base})")
        }
        Instruction::Branch {
            src1, src2, offset, ..
        } => format!(
            "{mnemonic} {src1}, {src2}, {:#x}",
            pc.wrapping_add_signed(offset)
        ),
        Instruction::Load {
            dest, base, offset, ..
        } => format!("{mnemonic} {dest}, {offset}({base})"),
        Instruction::Store {
            src, base, offset, ..
        } => format!("{mnemonic} {src}, {offset}({base})"),
        Instruction::Ecall | Instruction::Ebreak => mnemonic.to_owned(),
    }
}
