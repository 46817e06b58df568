use super::{Exception, ExecutionResult};
use crate::instruction::{
    BranchCondition, Instruction, LoadWidth, RegImmOp, RegRegOp, RegShiftImmOp, StoreWidth,
};
use crate::memory::{Memory, MemoryError};
use crate::registers::{Registers, Specifier};
use crate::INSTRUCTION_WIDTH;

/// Applies one decoded instruction's effect to the architectural state it borrows.
///
/// Every non-branching operation performs exactly its defined register/memory writes and then
/// advances the `pc` register by one instruction width. An instruction that raises an exception
/// performs no writes at all.
#[derive(Debug)]
pub(super) struct Executor<'c> {
    pub registers: &'c mut Registers,
    pub memory: &'c mut Memory,
}

impl Executor<'_> {
    pub(super) fn execute(&mut self, instruction: Instruction) -> ExecutionResult {
        match instruction {
            Instruction::Mac { dest, src1, src2 } => self.mac(dest, src1, src2),
            Instruction::Op {
                op,
                dest,
                src1,
                src2,
            } => {
                let op: fn(u32, u32) -> u32 = match op {
                    RegRegOp::Add => u32::wrapping_add,
                    RegRegOp::Sub => u32::wrapping_sub,
                    RegRegOp::Sll => |s1, s2| s1 << (s2 & 0x1F),
                    RegRegOp::Slt => |s1, s2| ((s1 as i32) < (s2 as i32)) as u32,
                    RegRegOp::Sltu => |s1, s2| (s1 < s2) as u32,
                    RegRegOp::Xor => |s1, s2| s1 ^ s2,
                    RegRegOp::Srl => |s1, s2| s1 >> (s2 & 0x1F),
                    RegRegOp::Sra => |s1, s2| ((s1 as i32) >> (s2 & 0x1F)) as u32,
                    RegRegOp::Or => |s1, s2| s1 | s2,
                    RegRegOp::And => |s1, s2| s1 & s2,
                };
                self.reg_reg_op(dest, src1, src2, op)
            }
            Instruction::OpImm {
                op,
                dest,
                src,
                immediate,
            } => {
                let op: fn(u32, i32) -> u32 = match op {
                    RegImmOp::Addi => u32::wrapping_add_signed,
                    RegImmOp::Slti => |s, imm| ((s as i32) < imm) as u32,
                    RegImmOp::Sltiu => |s, imm| (s < imm as u32) as u32,
                    RegImmOp::Xori => |s, imm| s ^ imm as u32,
                    RegImmOp::Ori => |s, imm| s | imm as u32,
                    RegImmOp::Andi => |s, imm| s & imm as u32,
                };
                self.reg_imm_op(dest, src, immediate, op)
            }
            Instruction::OpShiftImm {
                op,
                dest,
                src,
                shift_amount_u5,
            } => {
                let op: fn(u32, u32) -> u32 = match op {
                    RegShiftImmOp::Slli => |s, shamt| s << shamt,
                    RegShiftImmOp::Srli => |s, shamt| s >> shamt,
                    RegShiftImmOp::Srai => |s, shamt| ((s as i32) >> shamt) as u32,
                };
                self.reg_shamt_op(dest, src, shift_amount_u5, op)
            }
            Instruction::Lui { dest, immediate } => self.lui(dest, immediate),
            Instruction::Auipc { dest, immediate } => self.auipc(dest, immediate),
            Instruction::Jal { dest, offset } => self.jal(dest, offset),
            Instruction::Jalr { dest, base, offset } => self.jalr(dest, base, offset),
            Instruction::Branch {
                condition,
                src1,
                src2,
                offset,
            } => {
                let predicate: fn(u32, u32) -> bool = match condition {
                    BranchCondition::Beq => |s1, s2| s1 == s2,
                    BranchCondition::Bne => |s1, s2| s1 != s2,
                    BranchCondition::Blt => |s1, s2| (s1 as i32) < (s2 as i32),
                    BranchCondition::Bge => |s1, s2| (s1 as i32) >= (s2 as i32),
                    BranchCondition::Bltu => |s1, s2| s1 < s2,
                    BranchCondition::Bgeu => |s1, s2| s1 >= s2,
                };
                self.cond_branch(src1, src2, offset, predicate)
            }
            Instruction::Load {
                width,
                dest,
                base,
                offset,
            } => self.load(width, dest, base, offset),
            Instruction::Store {
                width,
                src,
                base,
                offset,
            } => self.store(width, src, base, offset),
            Instruction::Ecall => ExecutionResult::Exception(Exception::EnvironmentCall),
            Instruction::Ebreak => ExecutionResult::Exception(Exception::Breakpoint),
        }
    }

    /// Executes a `mac` instruction.
    ///
    /// Corresponds to the assembly instruction `mac dest src1 src2`.
    ///
    /// Multiply-accumulate: `dest <- dest + src1 * src2`. All three register values are read
    /// before the destination is overwritten, so the computation is well-defined even when `dest`,
    /// `src1`, and `src2` all name the same register. Both the multiplication and the addition
    /// wrap around at XLEN bits; there is no saturation and no overflow trap. The only side
    /// effects are the single write to `dest` and the sequential pc advance.
    fn mac(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult {
        let registers = &mut *self.registers;
        let s1 = registers.x(src1);
        let s2 = registers.x(src2);
        let accumulator = registers.x(dest);
        registers.set_x(dest, accumulator.wrapping_add(s1.wrapping_mul(s2)));
        increment_pc(registers);
        ExecutionResult::Ok
    }

    /// Executes a `lui` instruction.
    ///
    /// > LUI places the U-immediate value in the top 20 bits of the destination register rd,
    /// > filling in the lowest 12 bits with zeros.
    fn lui(&mut self, dest: Specifier, immediate: i32) -> ExecutionResult {
        self.registers.set_x(dest, immediate as u32);
        increment_pc(self.registers);
        ExecutionResult::Ok
    }

    /// Executes an `auipc` instruction.
    ///
    /// > AUIPC forms a 32-bit offset from the 20-bit U-immediate, filling in the lowest 12 bits
    /// > with zeros, adds this offset to the address of the AUIPC instruction, then places the
    /// > result in register rd.
    fn auipc(&mut self, dest: Specifier, immediate: i32) -> ExecutionResult {
        let result = self.registers.pc().wrapping_add_signed(immediate);
        self.registers.set_x(dest, result);
        increment_pc(self.registers);
        ExecutionResult::Ok
    }

    fn jal(&mut self, dest: Specifier, offset: i32) -> ExecutionResult {
        let target = self.registers.pc().wrapping_add_signed(offset);
        self.jump(dest, target)
    }

    fn jalr(&mut self, dest: Specifier, base: Specifier, offset: i32) -> ExecutionResult {
        let target = self.registers.x(base).wrapping_add_signed(offset) & !1;
        self.jump(dest, target)
    }

    fn jump(&mut self, dest: Specifier, target: u32) -> ExecutionResult {
        if target % INSTRUCTION_WIDTH != 0 {
            return ExecutionResult::Exception(Exception::InstructionAddressMisaligned);
        }
        let link = self.registers.pc().wrapping_add(INSTRUCTION_WIDTH);
        *self.registers.pc_mut() = target;
        self.registers.set_x(dest, link);
        ExecutionResult::Ok
    }

    // Takes the branch if `predicate` returns `true`.
    fn cond_branch(
        &mut self,
        src1: Specifier,
        src2: Specifier,
        offset: i32,
        predicate: fn(u32, u32) -> bool,
    ) -> ExecutionResult {
        let registers = &mut *self.registers;
        if predicate(registers.x(src1), registers.x(src2)) {
            let target = registers.pc().wrapping_add_signed(offset);
            if target % INSTRUCTION_WIDTH != 0 {
                return ExecutionResult::Exception(Exception::InstructionAddressMisaligned);
            }
            *registers.pc_mut() = target;
        } else {
            increment_pc(registers);
        }
        ExecutionResult::Ok
    }

    fn load(
        &mut self,
        width: LoadWidth,
        dest: Specifier,
        base: Specifier,
        offset: i32,
    ) -> ExecutionResult {
        let address = self.registers.x(base).wrapping_add_signed(offset);
        let value = match width {
            LoadWidth::Lb => self.memory.read_byte(address).map(|v| v as i8 as u32),
            LoadWidth::Lbu => self.memory.read_byte(address).map(|v| v as u32),
            LoadWidth::Lh => self.memory.read_halfword(address).map(|v| v as i16 as u32),
            LoadWidth::Lhu => self.memory.read_halfword(address).map(|v| v as u32),
            LoadWidth::Lw => self.memory.read_word(address),
        };
        match value {
            Ok(value) => {
                self.registers.set_x(dest, value);
                increment_pc(self.registers);
                ExecutionResult::Ok
            }
            Err(MemoryError::MisalignedAccess) => {
                ExecutionResult::Exception(Exception::LoadAddressMisaligned)
            }
            Err(MemoryError::AccessFault) => {
                ExecutionResult::Exception(Exception::LoadAccessFault)
            }
        }
    }

    fn store(
        &mut self,
        width: StoreWidth,
        src: Specifier,
        base: Specifier,
        offset: i32,
    ) -> ExecutionResult {
        let address = self.registers.x(base).wrapping_add_signed(offset);
        let value = self.registers.x(src);
        let written = match width {
            StoreWidth::Sb => self.memory.write_byte(address, value as u8),
            StoreWidth::Sh => self.memory.write_halfword(address, value as u16),
            StoreWidth::Sw => self.memory.write_word(address, value),
        };
        match written {
            Ok(()) => {
                increment_pc(self.registers);
                ExecutionResult::Ok
            }
            Err(MemoryError::MisalignedAccess) => {
                ExecutionResult::Exception(Exception::StoreAddressMisaligned)
            }
            Err(MemoryError::AccessFault) => {
                ExecutionResult::Exception(Exception::StoreAccessFault)
            }
        }
    }

    #[inline]
    fn reg_reg_op(
        &mut self,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
        op: fn(u32, u32) -> u32,
    ) -> ExecutionResult {
        let registers = &mut *self.registers;
        registers.set_x(dest, op(registers.x(src1), registers.x(src2)));
        increment_pc(registers);
        ExecutionResult::Ok
    }

    #[inline]
    fn reg_imm_op(
        &mut self,
        dest: Specifier,
        src: Specifier,
        immediate: i32,
        op: fn(u32, i32) -> u32,
    ) -> ExecutionResult {
        let registers = &mut *self.registers;
        registers.set_x(dest, op(registers.x(src), immediate));
        increment_pc(registers);
        ExecutionResult::Ok
    }

    #[inline]
    fn reg_shamt_op(
        &mut self,
        dest: Specifier,
        src: Specifier,
        shift_amount_u5: u32,
        op: fn(u32, u32) -> u32,
    ) -> ExecutionResult {
        if shift_amount_u5 > 31 {
            panic!("out of range u5 used");
        }
        let registers = &mut *self.registers;
        registers.set_x(dest, op(registers.x(src), shift_amount_u5));
        increment_pc(registers);
        ExecutionResult::Ok
    }
}

fn increment_pc(registers: &mut Registers) {
    let pc = registers.pc_mut();
    *pc = pc.wrapping_add(INSTRUCTION_WIDTH);
}

#[cfg(test)]
mod tests {
    use super::*;

    const PC: u32 = 0x8000_0000;

    fn x(index: u8) -> Specifier {
        Specifier::from_u5(index)
    }

    fn machine() -> (Registers, Memory) {
        (
            Registers::new(PC),
            Memory::new(0x8000_0000, 0x1000).unwrap(),
        )
    }

    fn run(registers: &mut Registers, memory: &mut Memory, instruction: Instruction) -> ExecutionResult {
        Executor { registers, memory }.execute(instruction)
    }

    fn mac(dest: u8, src1: u8, src2: u8) -> Instruction {
        Instruction::Mac {
            dest: x(dest),
            src1: x(src1),
            src2: x(src2),
        }
    }

    #[test]
    fn test_mac_concrete_scenario() {
        // x1=3, x2=4, x3=10; mac x3, x1, x2 => x3 = 10 + 3*4 = 22
        let (mut registers, mut memory) = machine();
        registers.set_x(x(1), 3);
        registers.set_x(x(2), 4);
        registers.set_x(x(3), 10);

        let result = run(&mut registers, &mut memory, mac(3, 1, 2));

        assert_eq!(ExecutionResult::Ok, result);
        assert_eq!(22, registers.x(x(3)));
        assert_eq!(3, registers.x(x(1)));
        assert_eq!(4, registers.x(x(2)));
        assert_eq!(PC + INSTRUCTION_WIDTH, registers.pc());
    }

    #[test]
    fn test_mac_wraps_on_overflow() {
        let (mut registers, mut memory) = machine();
        registers.set_x(x(1), 0x8000_0001);
        registers.set_x(x(2), 2);
        registers.set_x(x(3), 5);

        run(&mut registers, &mut memory, mac(3, 1, 2));

        // 5 + 0x8000_0001 * 2 == 5 + 2 (mod 2^32)
        assert_eq!(7, registers.x(x(3)));

        registers.set_x(x(4), u32::MAX);
        registers.set_x(x(5), u32::MAX);
        registers.set_x(x(6), u32::MAX);
        run(&mut registers, &mut memory, mac(6, 4, 5));
        // MAX + MAX*MAX == MAX + 1 == 0 (mod 2^32)
        assert_eq!(0, registers.x(x(6)));
    }

    #[test]
    fn test_mac_all_operands_aliased() {
        // dest == src1 == src2 with pre-value v must give v + v*v, reading v only once.
        let (mut registers, mut memory) = machine();
        registers.set_x(x(7), 6);

        run(&mut registers, &mut memory, mac(7, 7, 7));

        assert_eq!(6 + 6 * 6, registers.x(x(7)));
    }

    #[test]
    fn test_mac_dest_aliases_one_source() {
        let (mut registers, mut memory) = machine();
        registers.set_x(x(1), 5);
        registers.set_x(x(2), 3);

        // mac x1, x1, x2 => 5 + 5*3 = 20
        run(&mut registers, &mut memory, mac(1, 1, 2));

        assert_eq!(20, registers.x(x(1)));
        assert_eq!(3, registers.x(x(2)));
    }

    #[test]
    fn test_mac_to_zero_register() {
        let (mut registers, mut memory) = machine();
        registers.set_x(x(1), 3);
        registers.set_x(x(2), 4);

        let result = run(&mut registers, &mut memory, mac(0, 1, 2));

        assert_eq!(ExecutionResult::Ok, result);
        assert_eq!(0, registers.x(x(0)));
        assert_eq!(PC + INSTRUCTION_WIDTH, registers.pc());
    }

    #[test]
    fn test_mac_zero_register_sources() {
        let (mut registers, mut memory) = machine();
        registers.set_x(x(3), 10);

        // mac x3, x0, x0 leaves the accumulator unchanged.
        run(&mut registers, &mut memory, mac(3, 0, 0));

        assert_eq!(10, registers.x(x(3)));
    }

    #[test]
    fn test_add_and_sub() {
        let (mut registers, mut memory) = machine();
        registers.set_x(x(1), 7);
        registers.set_x(x(2), 5);

        run(
            &mut registers,
            &mut memory,
            Instruction::Op {
                op: RegRegOp::Add,
                dest: x(3),
                src1: x(1),
                src2: x(2),
            },
        );
        assert_eq!(12, registers.x(x(3)));

        run(
            &mut registers,
            &mut memory,
            Instruction::Op {
                op: RegRegOp::Sub,
                dest: x(4),
                src1: x(2),
                src2: x(1),
            },
        );
        assert_eq!((-2_i32) as u32, registers.x(x(4)));
    }

    #[test]
    fn test_addi() {
        let (mut registers, mut memory) = machine();
        run(
            &mut registers,
            &mut memory,
            Instruction::OpImm {
                op: RegImmOp::Addi,
                dest: x(1),
                src: x(0),
                immediate: -3,
            },
        );
        assert_eq!((-3_i32) as u32, registers.x(x(1)));
    }

    #[test]
    fn test_branch_taken_and_not_taken() {
        let (mut registers, mut memory) = machine();
        registers.set_x(x(1), 1);
        registers.set_x(x(2), 2);

        let branch = Instruction::Branch {
            condition: BranchCondition::Bne,
            src1: x(1),
            src2: x(2),
            offset: -8,
        };
        run(&mut registers, &mut memory, branch);
        assert_eq!(PC - 8, registers.pc());

        registers.set_x(x(2), 1);
        run(&mut registers, &mut memory, branch);
        assert_eq!(PC - 8 + INSTRUCTION_WIDTH, registers.pc());
    }

    #[test]
    fn test_branch_to_misaligned_target() {
        let (mut registers, mut memory) = machine();
        let result = run(
            &mut registers,
            &mut memory,
            Instruction::Branch {
                condition: BranchCondition::Beq,
                src1: x(0),
                src2: x(0),
                offset: 6,
            },
        );
        assert_eq!(
            ExecutionResult::Exception(Exception::InstructionAddressMisaligned),
            result
        );
        // The pc is left untouched on an exception.
        assert_eq!(PC, registers.pc());
    }

    #[test]
    fn test_jal_links_and_redirects() {
        let (mut registers, mut memory) = machine();
        run(
            &mut registers,
            &mut memory,
            Instruction::Jal {
                dest: x(1),
                offset: 0x100,
            },
        );
        assert_eq!(PC + 0x100, registers.pc());
        assert_eq!(PC + INSTRUCTION_WIDTH, registers.x(x(1)));
    }

    #[test]
    fn test_jalr_clears_low_bit() {
        let (mut registers, mut memory) = machine();
        registers.set_x(x(2), PC + 0x41);
        run(
            &mut registers,
            &mut memory,
            Instruction::Jalr {
                dest: x(1),
                base: x(2),
                offset: 0,
            },
        );
        assert_eq!(PC + 0x40, registers.pc());
    }

    #[test]
    fn test_load_store_roundtrip() {
        let (mut registers, mut memory) = machine();
        registers.set_x(x(1), 0x8000_0100);
        registers.set_x(x(2), 0x1234_5678);

        run(
            &mut registers,
            &mut memory,
            Instruction::Store {
                width: StoreWidth::Sw,
                src: x(2),
                base: x(1),
                offset: 8,
            },
        );
        run(
            &mut registers,
            &mut memory,
            Instruction::Load {
                width: LoadWidth::Lw,
                dest: x(3),
                base: x(1),
                offset: 8,
            },
        );
        assert_eq!(0x1234_5678, registers.x(x(3)));
    }

    #[test]
    fn test_load_fault_leaves_state_unchanged() {
        let (mut registers, mut memory) = machine();
        registers.set_x(x(1), 0x0000_1000);
        let result = run(
            &mut registers,
            &mut memory,
            Instruction::Load {
                width: LoadWidth::Lw,
                dest: x(3),
                base: x(1),
                offset: 0,
            },
        );
        assert_eq!(
            ExecutionResult::Exception(Exception::LoadAccessFault),
            result
        );
        assert_eq!(0, registers.x(x(3)));
        assert_eq!(PC, registers.pc());
    }

    #[test]
    fn test_system_instructions_raise() {
        let (mut registers, mut memory) = machine();
        assert_eq!(
            ExecutionResult::Exception(Exception::EnvironmentCall),
            run(&mut registers, &mut memory, Instruction::Ecall)
        );
        assert_eq!(
            ExecutionResult::Exception(Exception::Breakpoint),
            run(&mut registers, &mut memory, Instruction::Ebreak)
        );
        assert_eq!(PC, registers.pc());
    }
}
