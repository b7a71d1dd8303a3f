use dmg_core::gameboy::GameBoy;

/// Wrap a program in a minimal 32 KiB no-MBC cartridge image, placed at the
/// post-boot entry point 0x0100.
#[allow(dead_code)]
pub fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
    rom
}

/// A post-boot machine with `program` mapped at PC.
#[allow(dead_code)]
pub fn machine(program: &[u8]) -> GameBoy {
    let mut gb = GameBoy::new();
    gb.load_rom(rom_with_program(program))
        .expect("test ROM should load");
    gb
}

/// Run `steps` instruction steps and return the elapsed machine cycles.
#[allow(dead_code)]
pub fn step_cycles(gb: &mut GameBoy, steps: usize) -> u64 {
    let start = gb.mmu.t_clock;
    for _ in 0..steps {
        gb.step();
    }
    (gb.mmu.t_clock - start) / 4
}

#[allow(dead_code)]
pub fn run(gb: &mut GameBoy, steps: usize) {
    for _ in 0..steps {
        gb.step();
    }
}
