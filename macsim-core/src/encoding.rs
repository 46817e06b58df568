//! Bit-level layout of the supported instruction encodings.
//!
//! This module owns the encoding contract: which bit ranges of a raw 32-bit instruction word hold
//! the register fields of the three-register arithmetic family, and which opcode/funct values
//! single out the `mac` instruction within it. Field extraction is pure and total over all words;
//! checking that a word actually matches an instruction's signature is the decoder's job
//! ([`crate::instruction::Instruction::decode`]).

use crate::registers::{self, Specifier};

/// The 7-bit major opcodes of the supported encodings, as laid out in the RISC-V opcode map.
#[allow(clippy::unusual_byte_groupings)]
pub mod opcodes {
    pub const LOAD: u32 = 0b00_000_11;
    /// The *custom-0* major opcode, reserved by the spec for non-standard extensions.
    /// The `mac` instruction lives here.
    pub const CUSTOM_0: u32 = 0b00_010_11;
    pub const OP_IMM: u32 = 0b00_100_11;
    pub const AUIPC: u32 = 0b00_101_11;
    pub const STORE: u32 = 0b01_000_11;
    pub const OP: u32 = 0b01_100_11;
    pub const LUI: u32 = 0b01_101_11;
    pub const BRANCH: u32 = 0b11_000_11;
    pub const JALR: u32 = 0b11_001_11;
    pub const JAL: u32 = 0b11_011_11;
    pub const SYSTEM: u32 = 0b11_100_11;
}

/// The *funct3* value that, together with [`MAC_FUNCT7`], distinguishes `mac` from every other
/// instruction sharing the custom-0 major opcode.
pub const MAC_FUNCT3: u8 = 0b000;

/// See [`MAC_FUNCT3`].
pub const MAC_FUNCT7: u8 = 0b0000000;

/// Returns the 7-bit major opcode of an instruction word.
pub fn opcode(raw_instruction: u32) -> u32 {
    raw_instruction & 0x7F
}

/// Returns the 5-bit *rd* field (bits 11:7) for R-type, I-type, U-type, J-type instructions.
pub fn rd(raw_instruction: u32) -> Specifier {
    const_assert_eq!(registers::LEN, 32);
    Specifier::from_u5(((raw_instruction >> 7) & 0x1F) as u8)
}

/// Returns the 5-bit *rs1* field (bits 19:15) for R-type, I-type, S-type, B-type instructions.
pub fn rs1(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 15) & 0x1F) as u8)
}

/// Returns the 5-bit *rs2* field (bits 24:20) for R-type, S-type, B-type instructions.
pub fn rs2(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 20) & 0x1F) as u8)
}

/// Returns the 3-bit *funct3* field (bits 14:12) for R-type, I-type, S-type, B-type instructions.
pub fn funct3(raw_instruction: u32) -> u8 {
    ((raw_instruction >> 12) & 0b111) as u8
}

/// Returns the 7-bit *funct7* field (bits 31:25) for R-type instructions.
pub fn funct7(raw_instruction: u32) -> u8 {
    (raw_instruction >> 25) as u8
}

/// Returns the 5-bit *shamt* field for the immediate-shift instructions.
pub fn shamt(raw_instruction: u32) -> u32 {
    (raw_instruction >> 20) & 0x1F
}

/// Returns the 12-bit I-immediate sign-extended to 32 bits.
pub fn i_imm(raw_instruction: u32) -> i32 {
    raw_instruction as i32 >> 20
}

/// Returns the 12-bit S-immediate sign-extended to 32 bits.
pub fn s_imm(raw_instruction: u32) -> i32 {
    let imm_11_5 = raw_instruction & 0xFE00_0000;
    let imm_4_0 = raw_instruction & 0x0000_0F80;
    (imm_11_5 | (imm_4_0 << 13)) as i32 >> 20
}

/// Returns the 13-bit B-immediate sign-extended to 32 bits.
pub fn b_imm(raw_instruction: u32) -> i32 {
    let imm_12 = raw_instruction & 0x8000_0000;
    let imm_10_5 = raw_instruction & 0x7E00_0000;
    let imm_4_1 = raw_instruction & 0x0000_0F00;
    let imm_11 = raw_instruction & 0x0000_0080;
    (imm_12 | (imm_11 << 23) | (imm_10_5 >> 1) | (imm_4_1 << 12)) as i32 >> 19
}

/// Returns the signed 32-bit U-immediate (bottom 12 bits zero).
pub fn u_imm(raw_instruction: u32) -> i32 {
    (raw_instruction & 0xFFFF_F000) as i32
}

/// Returns the 21-bit J-immediate sign-extended to 32 bits.
pub fn j_imm(raw_instruction: u32) -> i32 {
    let imm_20 = raw_instruction & 0x8000_0000;
    let imm_10_1 = raw_instruction & 0x7FE0_0000;
    let imm_11 = raw_instruction & 0x0010_0000;
    let imm_19_12 = raw_instruction & 0x000F_F000;
    (imm_20 | (imm_19_12 << 11) | (imm_11 << 2) | (imm_10_1 >> 9)) as i32 >> 11
}

/// Builds the canonical instruction word for `mac dest, src1, src2`.
///
/// The inverse of field extraction for the `mac` signature; mainly useful for assembling test
/// programs and tooling. Decoding the returned word always yields a `mac` with exactly these
/// operands.
pub fn encode_mac(dest: Specifier, src1: Specifier, src2: Specifier) -> u32 {
    (MAC_FUNCT7 as u32) << 25
        | u32::from(src2) << 20
        | u32::from(src1) << 15
        | (MAC_FUNCT3 as u32) << 12
        | u32::from(dest) << 7
        | opcodes::CUSTOM_0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i_imm() {
        assert_eq!(0, i_imm(0x0000_0000));
        assert_eq!(-1, i_imm(0xFFF0_0000));
        assert_eq!(2047, i_imm(2047 << 20));
        assert_eq!(-2048, i_imm(0x8000_0000));
        assert_eq!(-42, i_imm((-42_i32 << 20) as u32));
        // Check other bits are ignored
        assert_eq!(0, i_imm(0x000F_FFFF));
        assert_eq!(-1, i_imm(0xFFF1_2345));
    }

    #[test]
    fn test_s_imm() {
        // sw x2, -8(x1) == 0xFE20_AC23
        assert_eq!(-8, s_imm(0xFE20_AC23));
        // sw x2, 12(x1) == 0x0020_A623
        assert_eq!(12, s_imm(0x0020_A623));
        assert_eq!(0, s_imm(0x0000_0000));
    }

    #[test]
    fn test_b_imm() {
        // bne x3, x4, -8 == 0xFE41_9CE3
        assert_eq!(-8, b_imm(0xFE41_9CE3));
        // beq x0, x0, 16 == 0x0000_0863
        assert_eq!(16, b_imm(0x0000_0863));
    }

    #[test]
    fn test_j_imm() {
        // jal x0, -16 == 0xFF1F_F06F
        assert_eq!(-16, j_imm(0xFF1F_F06F));
        // jal x1, 2048 == 0x0010_00EF
        assert_eq!(2048, j_imm(0x0010_00EF));
    }

    #[test]
    fn test_register_fields() {
        // mac x3, x1, x2 assembled by hand
        let raw = 0x0020_818B;
        assert_eq!(opcodes::CUSTOM_0, opcode(raw));
        assert_eq!(Specifier::from_u5(3), rd(raw));
        assert_eq!(Specifier::from_u5(1), rs1(raw));
        assert_eq!(Specifier::from_u5(2), rs2(raw));
        assert_eq!(MAC_FUNCT3, funct3(raw));
        assert_eq!(MAC_FUNCT7, funct7(raw));
    }

    #[test]
    fn test_encode_mac_round_trips_fields() {
        for (d, s1, s2) in [(3u8, 1u8, 2u8), (0, 0, 0), (31, 31, 31), (10, 17, 5)] {
            let raw = encode_mac(
                Specifier::from_u5(d),
                Specifier::from_u5(s1),
                Specifier::from_u5(s2),
            );
            assert_eq!(opcodes::CUSTOM_0, opcode(raw));
            assert_eq!(Specifier::from_u5(d), rd(raw));
            assert_eq!(Specifier::from_u5(s1), rs1(raw));
            assert_eq!(Specifier::from_u5(s2), rs2(raw));
            assert_eq!(MAC_FUNCT3, funct3(raw));
            assert_eq!(MAC_FUNCT7, funct7(raw));
        }
        assert_eq!(
            0x0020_818B,
            encode_mac(
                Specifier::from_u5(3),
                Specifier::from_u5(1),
                Specifier::from_u5(2)
            )
        );
    }
}
