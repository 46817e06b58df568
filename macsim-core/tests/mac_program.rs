//! End-to-end runs of encoded programs through the fetch/decode/execute loop.

use macsim_core::core::{Config, Core, HaltReason};
use macsim_core::disasm::disassemble;
use macsim_core::encoding::encode_mac;
use macsim_core::instruction::Instruction;
use macsim_core::registers::Specifier;
use macsim_core::simulator::{RunOutcome, Simulator};

const RESET_VECTOR: u32 = 0x8000_0000;

fn x(index: u8) -> Specifier {
    Specifier::from_u5(index)
}

fn simulator_with_program(words: &[u32]) -> Simulator {
    let mut core = Core::new(Config {
        reset_vector: RESET_VECTOR,
        memory_base: RESET_VECTOR,
        memory_size: 0x10000,
    })
    .unwrap();
    let image: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
    core.load_image(RESET_VECTOR, &image).unwrap();
    Simulator::new(core)
}

#[test]
fn mac_program_computes_multiply_accumulate() {
    let program = [
        0x0030_0093, // addi x1, x0, 3
        0x0040_0113, // addi x2, x0, 4
        0x00A0_0193, // addi x3, x0, 10
        encode_mac(x(3), x(1), x(2)),
        0x0030_0533, // add x10, x0, x3
        0x05D0_0893, // addi x17, x0, 93
        0x0000_0073, // ecall
    ];
    let mut simulator = simulator_with_program(&program);

    let outcome = simulator.run(None);

    assert_eq!(RunOutcome::Halted(HaltReason::Exit(22)), outcome);
    let registers = simulator.core().registers();
    assert_eq!(3, registers.x(x(1)));
    assert_eq!(4, registers.x(x(2)));
    assert_eq!(22, registers.x(x(3)));
    // ecall leaves the pc at its own address.
    assert_eq!(RESET_VECTOR + 6 * 4, registers.pc());
    assert_eq!(6, simulator.instructions_retired());
}

#[test]
fn mac_loop_accumulates_squares() {
    // acc = sum of i*i for i in 1..=7
    let program = [
        0x0070_0213, // addi x4, x0, 7
        0x0000_0193, // addi x3, x0, 0
        0x0000_0293, // addi x5, x0, 0
        0x0011_8193, // loop: addi x3, x3, 1
        encode_mac(x(5), x(3), x(3)),
        0xFE41_9CE3, // bne x3, x4, loop
        0x0050_0533, // add x10, x0, x5
        0x05D0_0893, // addi x17, x0, 93
        0x0000_0073, // ecall
    ];
    let mut simulator = simulator_with_program(&program);

    let expected: u32 = (1..=7).map(|i| i * i).sum();
    assert_eq!(
        RunOutcome::Halted(HaltReason::Exit(expected)),
        simulator.run(None)
    );
}

#[test]
fn mac_word_decodes_and_disassembles_consistently() {
    // Every mac word must disassemble to exactly the register fields it encodes.
    for (d, s1, s2) in [(3u8, 1u8, 2u8), (31, 30, 29), (1, 1, 1), (0, 12, 25)] {
        let word = encode_mac(x(d), x(s1), x(s2));
        let instruction = Instruction::decode(word).unwrap();
        assert_eq!("mac", instruction.mnemonic());
        assert_eq!(
            format!("mac x{d}, x{s1}, x{s2}"),
            disassemble(&instruction, RESET_VECTOR)
        );
    }
}

#[test]
fn decoded_instructions_are_shareable() {
    fn assert_shareable<T: Send + Sync + Copy>() {}
    assert_shareable::<Instruction>();
}

#[test]
fn mac_result_survives_store_load_roundtrip() {
    // Accumulate into x3, spill it to memory, load it back as the exit code.
    let program = [
        0x0030_0093, // addi x1, x0, 3
        0x0040_0113, // addi x2, x0, 4
        0x00A0_0193, // addi x3, x0, 10
        encode_mac(x(3), x(1), x(2)),
        0x8000_0437, // lui x8, 0x80000
        0x1004_0413, // addi x8, x8, 256
        0x0034_2023, // sw x3, 0(x8)
        0x0004_2503, // lw x10, 0(x8)
        0x05D0_0893, // addi x17, x0, 93
        0x0000_0073, // ecall
    ];
    let mut simulator = simulator_with_program(&program);

    assert_eq!(
        RunOutcome::Halted(HaltReason::Exit(22)),
        simulator.run(Some(1000))
    );
    assert_eq!(
        22,
        simulator.core().memory().read_word(0x8000_0100).unwrap()
    );
}

#[test]
fn unknown_ecall_halts_as_unsupported() {
    // addi x17, x0, 64 (write); ecall
    let program = [0x0400_0893, 0x0000_0073];
    let mut simulator = simulator_with_program(&program);
    assert_eq!(
        RunOutcome::Halted(HaltReason::UnsupportedEnvironmentCall(64)),
        simulator.run(None)
    );
}
