mod common;

use common::rom_with_program;
use dmg_core::cartridge::{Cartridge, CartridgeError, MbcKind};
use dmg_core::gameboy::GameBoy;
use dmg_core::mmu::Mmu;

#[test]
fn wram_round_trip_and_echo() {
    let mut mmu = Mmu::new_post_boot();
    mmu.write_byte(0xC000, 0xAA);
    assert_eq!(mmu.read_byte(0xC000), 0xAA);
    assert_eq!(mmu.read_byte(0xE000), 0xAA);
    mmu.write_byte(0xE123, 0xBB);
    assert_eq!(mmu.read_byte(0xC123), 0xBB);
    mmu.write_byte(0xDFFF, 0xCC);
    assert_eq!(mmu.read_byte(0xDFFF), 0xCC);
}

#[test]
fn hram_round_trip() {
    let mut mmu = Mmu::new_post_boot();
    mmu.write_byte(0xFF80, 0x12);
    mmu.write_byte(0xFFFE, 0x34);
    assert_eq!(mmu.read_byte(0xFF80), 0x12);
    assert_eq!(mmu.read_byte(0xFFFE), 0x34);
}

#[test]
fn unusable_region_reads_zero() {
    let mut mmu = Mmu::new_post_boot();
    mmu.write_byte(0xFEA0, 0x55);
    mmu.write_byte(0xFEFF, 0x55);
    assert_eq!(mmu.read_byte(0xFEA0), 0x00);
    assert_eq!(mmu.read_byte(0xFEFF), 0x00);
}

#[test]
fn vram_and_oam_round_trip() {
    let mut mmu = Mmu::new_post_boot();
    mmu.write_byte(0x8000, 0x11);
    mmu.write_byte(0x9FFF, 0x22);
    mmu.write_byte(0xFE00, 0x33);
    mmu.write_byte(0xFE9F, 0x44);
    assert_eq!(mmu.read_byte(0x8000), 0x11);
    assert_eq!(mmu.read_byte(0x9FFF), 0x22);
    assert_eq!(mmu.read_byte(0xFE00), 0x33);
    assert_eq!(mmu.read_byte(0xFE9F), 0x44);
}

#[test]
fn interrupt_registers() {
    let mut mmu = Mmu::new_post_boot();
    // The unimplemented upper IF bits read as set.
    mmu.write_byte(0xFF0F, 0x05);
    assert_eq!(mmu.read_byte(0xFF0F), 0xE5);
    // Writes only keep the five meaningful bits.
    mmu.write_byte(0xFF0F, 0xFF);
    assert_eq!(mmu.read_byte(0xFF0F), 0xFF);
    assert_eq!(mmu.pending_interrupts(), 0);

    mmu.write_byte(0xFFFF, 0x15);
    assert_eq!(mmu.read_byte(0xFFFF), 0x15);
    assert_eq!(mmu.pending_interrupts(), 0x15);
}

#[test]
fn missing_cartridge_reads_open_bus() {
    let mmu = Mmu::new_post_boot();
    assert_eq!(mmu.read_byte(0x0000), 0xFF);
    assert_eq!(mmu.read_byte(0x4000), 0xFF);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
}

#[test]
fn oam_dma_copies_from_wram() {
    let mut mmu = Mmu::new_post_boot();
    for i in 0..0xA0u16 {
        mmu.write_byte(0xC000 + i, i as u8);
    }
    mmu.write_byte(0xFF46, 0xC0);
    assert_eq!(mmu.read_byte(0xFE00), 0x00);
    assert_eq!(mmu.read_byte(0xFE42), 0x42);
    assert_eq!(mmu.read_byte(0xFE9F), 0x9F);
    // The source register reads back.
    assert_eq!(mmu.read_byte(0xFF46), 0xC0);
}

#[test]
fn boot_overlay_reads_then_unmaps() {
    let mut mmu = Mmu::new_power_on();
    let mut rom = vec![0u8; 0x8000];
    rom[0x0000] = 0xBB;
    rom[0x00FF] = 0xBC;
    rom[0x0100] = 0xBD;
    mmu.load_cart(Cartridge::load(rom).unwrap());

    // The overlay only covers the first 256 bytes.
    assert_ne!(mmu.read_byte(0x0000), 0xBB);
    assert_eq!(mmu.read_byte(0x0100), 0xBD);

    mmu.write_byte(0xFF50, 0x01);
    assert_eq!(mmu.read_byte(0x0000), 0xBB);
    assert_eq!(mmu.read_byte(0x00FF), 0xBC);
}

#[test]
fn replacement_boot_rom_is_padded() {
    let mut mmu = Mmu::new_power_on();
    mmu.load_boot_rom(&[0xA1, 0xA2]);
    assert_eq!(mmu.read_byte(0x0000), 0xA1);
    assert_eq!(mmu.read_byte(0x0001), 0xA2);
    assert_eq!(mmu.read_byte(0x0002), 0x00);
}

#[test]
fn mbc1_rom_bank_switching_through_the_bus() {
    let mut rom = vec![0u8; 35 * 0x4000];
    rom[0x0147] = 0x01; // MBC1
    for bank in 0..35 {
        rom[bank * 0x4000] = bank as u8;
    }

    let mut mmu = Mmu::new_post_boot();
    mmu.load_cart(Cartridge::load(rom).unwrap());

    // default bank 1 at 0x4000
    assert_eq!(mmu.read_byte(0x4000), 1);

    mmu.write_byte(0x2000, 0x02); // select bank 2
    assert_eq!(mmu.read_byte(0x4000), 2);

    mmu.write_byte(0x4000, 0x01); // upper bits 1 -> bank 0x22
    assert_eq!(mmu.read_byte(0x4000), 34);

    // Writing zero keeps the low field at 1.
    mmu.write_byte(0x2000, 0x00);
    assert_eq!(mmu.read_byte(0x4000), 33);

    // Bank 0 stays fixed at the bottom throughout.
    assert_eq!(mmu.read_byte(0x0000), 0);
}

#[test]
fn mbc1_ram_enable_gate() {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x03; // MBC1 + RAM + battery
    rom[0x0149] = 0x03; // 32 KiB RAM

    let mut mmu = Mmu::new_post_boot();
    mmu.load_cart(Cartridge::load(rom).unwrap());

    mmu.write_byte(0xA000, 0x55);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);

    mmu.write_byte(0x0000, 0x0A); // enable RAM
    mmu.write_byte(0xA000, 0x55);
    assert_eq!(mmu.read_byte(0xA000), 0x55);

    mmu.write_byte(0x0000, 0x00); // disable RAM
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
}

#[test]
fn load_rejects_bad_images() {
    let mut gb = GameBoy::new();
    assert!(matches!(
        gb.load_rom(vec![0u8; 0x4001]),
        Err(CartridgeError::InvalidRomLength { .. })
    ));

    let mut rom = rom_with_program(&[]);
    rom[0x0147] = 0x19; // MBC5
    assert!(matches!(
        gb.load_rom(rom),
        Err(CartridgeError::UnsupportedMbc(MbcKind::Mbc5))
    ));
}

#[test]
fn every_tick_is_four_t_states() {
    let mut mmu = Mmu::new_post_boot();
    assert_eq!(mmu.t_clock, 0);
    mmu.tick();
    assert_eq!(mmu.t_clock, 4);
    mmu.tick();
    mmu.tick();
    assert_eq!(mmu.t_clock, 12);
}

#[test]
fn serial_output_is_observable() {
    let mut mmu = Mmu::new_post_boot();
    mmu.write_byte(0xFF01, b'P');
    mmu.write_byte(0xFF02, 0x81);
    for _ in 0..(8 * 512 / 4) {
        mmu.tick();
    }
    assert_eq!(mmu.serial.take_output(), vec![b'P']);
    assert_eq!(mmu.if_reg & 0x08, 0x08);
}
