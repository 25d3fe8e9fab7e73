//! Whole-program scenarios: load an image from disk into an assembled
//! system and drive it to completion through `Simulator`, rather than
//! poking the bus directly as the inline unit tests do.

use rvsim_core::isa::opcodes::names::{ADDI, HALT, JMP, JMPEQI};
use rvsim_core::sim::loader::load_image;
use rvsim_core::{Cpu, Simulator, System};

fn image_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("rvt-sim-image-{}-{tag}.bin", std::process::id()))
}

fn storage_path(tag: &str) -> String {
    std::env::temp_dir()
        .join(format!("rvt-sim-storage-{}-{tag}", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

/// Encodes one 16-byte instruction as four big-endian words.
fn encode(opcode: u8, op1: u32, op2: u32, op3: u32) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[0..4].copy_from_slice(&u32::from(opcode).to_be_bytes());
    bytes[4..8].copy_from_slice(&op1.to_be_bytes());
    bytes[8..12].copy_from_slice(&op2.to_be_bytes());
    bytes[12..16].copy_from_slice(&op3.to_be_bytes());
    bytes
}

#[test]
fn loaded_image_runs_to_halt_through_the_simulator() {
    let path = image_path("halt");
    std::fs::write(&path, encode(HALT, 0, 0, 0)).unwrap();

    let (mut system, line) = System::assemble(0x1000, &storage_path("halt")).unwrap();
    load_image(&mut system, path.to_str().unwrap(), 0x1000).unwrap();

    let sim = Simulator::new(Cpu::new(system, line, false));
    assert_eq!(sim.run(), 0);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn loaded_image_counts_down_a_register_before_halting() {
    let path = image_path("countdown");
    let mut image = Vec::new();
    // loop: r0 -= 1; if r0 == 0 jump to halt; else loop again.
    image.extend_from_slice(&encode(ADDI, 0, (-1i32) as u32, 0));
    image.extend_from_slice(&encode(JMPEQI, 0, 0, 48));
    image.extend_from_slice(&encode(JMP, 0, 0, 0));
    image.extend_from_slice(&encode(HALT, 0, 0, 0));
    std::fs::write(&path, &image).unwrap();

    let (mut system, line) = System::assemble(0x1000, &storage_path("countdown")).unwrap();
    load_image(&mut system, path.to_str().unwrap(), 0x1000).unwrap();

    let mut cpu = Cpu::new(system, line, false);
    cpu.regs.write_internal(0, 3).unwrap();
    let sim = Simulator::new(cpu);
    let handle = sim.handle();
    assert_eq!(sim.run(), 0);
    let cpu = handle
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    assert_eq!(cpu.regs.read_internal(0).unwrap(), 0);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn oversized_image_is_rejected_before_any_instruction_runs() {
    let path = image_path("oversized");
    std::fs::write(&path, [0u8; 32]).unwrap();

    let (mut system, _line) = System::assemble(16, &storage_path("oversized")).unwrap();
    let err = load_image(&mut system, path.to_str().unwrap(), 16).unwrap_err();
    assert!(matches!(
        err,
        rvsim_core::common::error::HostError::ImageTooLarge { .. }
    ));

    let _ = std::fs::remove_file(&path);
}
