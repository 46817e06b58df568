//! Decoded instruction representation.
//!
//! [`Instruction`] is an immutable value constructed exactly once per fetched word. Decoding
//! resolves the operand register fields up front; nothing is re-read from the raw word afterwards.

use crate::encoding::{self, opcodes};
use crate::registers::Specifier;
use thiserror::Error;

/// Data structure that can hold any supported instruction in its decoded form.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Instruction {
    /// The custom multiply-accumulate instruction: `dest <- dest + src1 * src2`.
    ///
    /// Encoded in the R-type format under the custom-0 major opcode. The destination register
    /// doubles as the accumulator input, so its pre-execution value takes part in the operation.
    Mac {
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
    },
    Op {
        op: RegRegOp,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
    },
    OpImm {
        op: RegImmOp,
        dest: Specifier,
        src: Specifier,
        immediate: i32,
    },
    OpShiftImm {
        op: RegShiftImmOp,
        dest: Specifier,
        src: Specifier,
        shift_amount_u5: u32,
    },
    Lui {
        dest: Specifier,
        immediate: i32,
    },
    Auipc {
        dest: Specifier,
        immediate: i32,
    },
    Jal {
        dest: Specifier,
        offset: i32,
    },
    Jalr {
        dest: Specifier,
        base: Specifier,
        offset: i32,
    },
    Branch {
        condition: BranchCondition,
        src1: Specifier,
        src2: Specifier,
        offset: i32,
    },
    Load {
        width: LoadWidth,
        dest: Specifier,
        base: Specifier,
        offset: i32,
    },
    Store {
        width: StoreWidth,
        src: Specifier,
        base: Specifier,
        offset: i32,
    },
    Ecall,
    Ebreak,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegRegOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegImmOp {
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegShiftImmOp {
    Slli,
    Srli,
    Srai,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BranchCondition {
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadWidth {
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StoreWidth {
    Sb,
    Sh,
    Sw,
}

/// Categorical tag describing the functional-unit/scheduling bucket an instruction belongs to.
///
/// Attached at decode time and consumed read-only by tracing collaborators; execution never
/// branches on it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OpClass {
    /// Integer ALU operations, including `mac`.
    IntAlu,
    MemRead,
    MemWrite,
    Branch,
    Jump,
    System,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    #[error("instruction has unsupported major opcode")]
    UnsupportedOpcode,
    #[error("illegal instruction")]
    IllegalInstruction,
}

impl Instruction {
    /// Decodes a raw instruction word into its [`Instruction`] representation.
    ///
    /// This is the single entry point the fetch loop routes every recognized word through. Once a
    /// word's opcode/funct signature has matched, construction of the decoded value itself cannot
    /// fail; the `Err` cases here all mean the word matched no supported signature at all.
    pub fn decode(raw_instruction: u32) -> Result<Self, DecodeError> {
        let raw = raw_instruction;
        match encoding::opcode(raw) {
            opcodes::CUSTOM_0 => {
                match (encoding::funct3(raw), encoding::funct7(raw)) {
                    // The only custom-0 instruction this core implements.
                    (encoding::MAC_FUNCT3, encoding::MAC_FUNCT7) => Ok(Self::Mac {
                        dest: encoding::rd(raw),
                        src1: encoding::rs1(raw),
                        src2: encoding::rs2(raw),
                    }),
                    _ => Err(DecodeError::IllegalInstruction),
                }
            }
            opcodes::OP => {
                let op = match (encoding::funct7(raw), encoding::funct3(raw)) {
                    (0b0000000, 0b000) => RegRegOp::Add,
                    (0b0100000, 0b000) => RegRegOp::Sub,
                    (0b0000000, 0b001) => RegRegOp::Sll,
                    (0b0000000, 0b010) => RegRegOp::Slt,
                    (0b0000000, 0b011) => RegRegOp::Sltu,
                    (0b0000000, 0b100) => RegRegOp::Xor,
                    (0b0000000, 0b101) => RegRegOp::Srl,
                    (0b0100000, 0b101) => RegRegOp::Sra,
                    (0b0000000, 0b110) => RegRegOp::Or,
                    (0b0000000, 0b111) => RegRegOp::And,
                    _ => return Err(DecodeError::IllegalInstruction),
                };
                Ok(Self::Op {
                    op,
                    dest: encoding::rd(raw),
                    src1: encoding::rs1(raw),
                    src2: encoding::rs2(raw),
                })
            }
            opcodes::OP_IMM => {
                // The two shift encodings reuse the funct7 space on top of the I-immediate.
                let op = match encoding::funct3(raw) {
                    0b000 => Some(RegImmOp::Addi),
                    0b010 => Some(RegImmOp::Slti),
                    0b011 => Some(RegImmOp::Sltiu),
                    0b100 => Some(RegImmOp::Xori),
                    0b110 => Some(RegImmOp::Ori),
                    0b111 => Some(RegImmOp::Andi),
                    _ => None,
                };
                if let Some(op) = op {
                    return Ok(Self::OpImm {
                        op,
                        dest: encoding::rd(raw),
                        src: encoding::rs1(raw),
                        immediate: encoding::i_imm(raw),
                    });
                }
                let op = match (encoding::funct7(raw), encoding::funct3(raw)) {
                    (0b0000000, 0b001) => RegShiftImmOp::Slli,
                    (0b0000000, 0b101) => RegShiftImmOp::Srli,
                    (0b0100000, 0b101) => RegShiftImmOp::Srai,
                    _ => return Err(DecodeError::IllegalInstruction),
                };
                Ok(Self::OpShiftImm {
                    op,
                    dest: encoding::rd(raw),
                    src: encoding::rs1(raw),
                    shift_amount_u5: encoding::shamt(raw),
                })
            }
            opcodes::LUI => Ok(Self::Lui {
                dest: encoding::rd(raw),
                immediate: encoding::u_imm(raw),
            }),
            opcodes::AUIPC => Ok(Self::Auipc {
                dest: encoding::rd(raw),
                immediate: encoding::u_imm(raw),
            }),
            opcodes::JAL => Ok(Self::Jal {
                dest: encoding::rd(raw),
                offset: encoding::j_imm(raw),
            }),
            opcodes::JALR => match encoding::funct3(raw) {
                0b000 => Ok(Self::Jalr {
                    dest: encoding::rd(raw),
                    base: encoding::rs1(raw),
                    offset: encoding::i_imm(raw),
                }),
                _ => Err(DecodeError::IllegalInstruction),
            },
            opcodes::BRANCH => {
                let condition = match encoding::funct3(raw) {
                    0b000 => BranchCondition::Beq,
                    0b001 => BranchCondition::Bne,
                    0b100 => BranchCondition::Blt,
                    0b101 => BranchCondition::Bge,
                    0b110 => BranchCondition::Bltu,
                    0b111 => BranchCondition::Bgeu,
                    _ => return Err(DecodeError::IllegalInstruction),
                };
                Ok(Self::Branch {
                    condition,
                    src1: encoding::rs1(raw),
                    src2: encoding::rs2(raw),
                    offset: encoding::b_imm(raw),
                })
            }
            opcodes::LOAD => {
                let width = match encoding::funct3(raw) {
                    0b000 => LoadWidth::Lb,
                    0b001 => LoadWidth::Lh,
                    0b010 => LoadWidth::Lw,
                    0b100 => LoadWidth::Lbu,
                    0b101 => LoadWidth::Lhu,
                    _ => return Err(DecodeError::IllegalInstruction),
                };
                Ok(Self::Load {
                    width,
                    dest: encoding::rd(raw),
                    base: encoding::rs1(raw),
                    offset: encoding::i_imm(raw),
                })
            }
            opcodes::STORE => {
                let width = match encoding::funct3(raw) {
                    0b000 => StoreWidth::Sb,
                    0b001 => StoreWidth::Sh,
                    0b010 => StoreWidth::Sw,
                    _ => return Err(DecodeError::IllegalInstruction),
                };
                Ok(Self::Store {
                    width,
                    src: encoding::rs2(raw),
                    base: encoding::rs1(raw),
                    offset: encoding::s_imm(raw),
                })
            }
            opcodes::SYSTEM => match (
                encoding::funct3(raw),
                encoding::i_imm(raw),
                u8::from(encoding::rs1(raw)),
                u8::from(encoding::rd(raw)),
            ) {
                (0, 0, 0, 0) => Ok(Self::Ecall),
                (0, 1, 0, 0) => Ok(Self::Ebreak),
                _ => Err(DecodeError::IllegalInstruction),
            },
            _ => Err(DecodeError::UnsupportedOpcode),
        }
    }

    /// The assembly mnemonic of this instruction.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Mac { .. } => "mac",
            Self::Op { op, .. } => match op {
                RegRegOp::Add => "add",
                RegRegOp::Sub => "sub",
                RegRegOp::Sll => "sll",
                RegRegOp::Slt => "slt",
                RegRegOp::Sltu => "sltu",
                RegRegOp::Xor => "xor",
                RegRegOp::Srl => "srl",
                RegRegOp::Sra => "sra",
                RegRegOp::Or => "or",
                RegRegOp::And => "and",
            },
            Self::OpImm { op, .. } => match op {
                RegImmOp::Addi => "addi",
                RegImmOp::Slti => "slti",
                RegImmOp::Sltiu => "sltiu",
                RegImmOp::Xori => "xori",
                RegImmOp::Ori => "ori",
                RegImmOp::Andi => "andi",
            },
            Self::OpShiftImm { op, .. } => match op {
                RegShiftImmOp::Slli => "slli",
                RegShiftImmOp::Srli => "srli",
                RegShiftImmOp::Srai => "srai",
            },
            Self::Lui { .. } => "lui",
            Self::Auipc { .. } => "auipc",
            Self::Jal { .. } => "jal",
            Self::Jalr { .. } => "jalr",
            Self::Branch { condition, .. } => match condition {
                BranchCondition::Beq => "beq",
                BranchCondition::Bne => "bne",
                BranchCondition::Blt => "blt",
                BranchCondition::Bge => "bge",
                BranchCondition::Bltu => "bltu",
                BranchCondition::Bgeu => "bgeu",
            },
            Self::Load { width, .. } => match width {
                LoadWidth::Lb => "lb",
                LoadWidth::Lh => "lh",
                LoadWidth::Lw => "lw",
                LoadWidth::Lbu => "lbu",
                LoadWidth::Lhu => "lhu",
            },
            Self::Store { width, .. } => match width {
                StoreWidth::Sb => "sb",
                StoreWidth::Sh => "sh",
                StoreWidth::Sw => "sw",
            },
            Self::Ecall => "ecall",
            Self::Ebreak => "ebreak",
        }
    }

    /// The scheduling/trace category this instruction belongs to.
    pub fn op_class(&self) -> OpClass {
        match self {
            Self::Mac { .. }
            | Self::Op { .. }
            | Self::OpImm { .. }
            | Self::OpShiftImm { .. }
            | Self::Lui { .. }
            | Self::Auipc { .. } => OpClass::IntAlu,
            Self::Jal { .. } | Self::Jalr { .. } => OpClass::Jump,
            Self::Branch { .. } => OpClass::Branch,
            Self::Load { .. } => OpClass::MemRead,
            Self::Store { .. } => OpClass::MemWrite,
            Self::Ecall | Self::Ebreak => OpClass::System,
        }
    }
}
