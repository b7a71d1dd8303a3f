use crate::{
    apu::Apu,
    boot::{BOOT_ROM, BOOT_ROM_SIZE},
    cartridge::Cartridge,
    input::Input,
    ppu::Ppu,
    serial::Serial,
    timer::Timer,
};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;

/// T-states per machine cycle; every bus access advances the clock by this.
const T_PER_M_CYCLE: u16 = 4;

pub struct Mmu {
    pub wram: [u8; WRAM_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    boot_rom: [u8; BOOT_ROM_SIZE],
    pub boot_mapped: bool,
    pub if_reg: u8,
    pub ie_reg: u8,
    /// Total elapsed T-states since power-on.
    pub t_clock: u64,
    pub timer: Timer,
    pub ppu: Ppu,
    pub apu: Apu,
    pub serial: Serial,
    pub input: Input,
}

impl Mmu {
    /// Bus state after the boot ROM has run (overlay already unmapped).
    pub fn new_post_boot() -> Self {
        let mut timer = Timer::new();
        // DIV phase observed at the 0x0100 handoff on a DMG rev. C.
        timer.div = 0xABCC;

        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            boot_rom: BOOT_ROM,
            boot_mapped: false,
            // A V-Blank request is already latched at the 0x0100 handoff.
            if_reg: 0x01,
            ie_reg: 0,
            t_clock: 0,
            timer,
            ppu: Ppu::new_post_boot(),
            apu: Apu::new_post_boot(),
            serial: Serial::new(),
            input: Input::new(),
        }
    }

    /// Bus state at power-on, with the boot overlay mapped over 0x0000-0x00FF.
    pub fn new_power_on() -> Self {
        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            boot_rom: BOOT_ROM,
            boot_mapped: true,
            if_reg: 0,
            ie_reg: 0,
            t_clock: 0,
            timer: Timer::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            serial: Serial::new(),
            input: Input::new(),
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    /// Replace the linked-in boot image (truncated or zero-padded to 256
    /// bytes). The overlay mapping flag is left as-is.
    pub fn load_boot_rom(&mut self, data: &[u8]) {
        self.boot_rom = [0; BOOT_ROM_SIZE];
        let len = data.len().min(BOOT_ROM_SIZE);
        self.boot_rom[..len].copy_from_slice(&data[..len]);
    }

    /// Advance the machine by one M-cycle: bump the T-clock and step every
    /// peripheral, in fixed order. Peripherals raise interrupts by OR-ing
    /// bits into IF.
    pub fn tick(&mut self) {
        self.t_clock = self.t_clock.wrapping_add(T_PER_M_CYCLE as u64);
        self.timer.step(T_PER_M_CYCLE, &mut self.if_reg);
        self.ppu.step(T_PER_M_CYCLE, &mut self.if_reg);
        self.apu.step(T_PER_M_CYCLE);
        self.serial.step(T_PER_M_CYCLE, &mut self.if_reg);
        self.input.step(&mut self.if_reg);
    }

    /// Interrupts that are both requested and enabled.
    pub fn pending_interrupts(&self) -> u8 {
        self.if_reg & self.ie_reg & 0x1F
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x00FF if self.boot_mapped => self.boot_rom[addr as usize],
            0x0000..=0x7FFF => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize],
            0xA000..=0xBFFF => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            // Echo RAM aliases 0xC000-0xDDFF.
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            0xFE00..=0xFE9F => self.ppu.oam[(addr - 0xFE00) as usize],
            0xFEA0..=0xFEFF => 0x00,
            0xFF00 => self.input.read(),
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.if_reg | 0xE0,
            0xFF10..=0xFF3F => self.apu.read_reg(addr),
            0xFF40..=0xFF4B => self.ppu.read_reg(addr),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie_reg,
            _ => 0xFF,
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize] = val,
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => self.ppu.oam[(addr - 0xFE00) as usize] = val,
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.input.write(val),
            0xFF01 | 0xFF02 => self.serial.write(addr, val),
            0xFF04..=0xFF07 => self.timer.write(addr, val, &mut self.if_reg),
            0xFF0F => self.if_reg = val & 0x1F,
            0xFF10..=0xFF3F => self.apu.write_reg(addr, val),
            0xFF46 => self.oam_dma(val),
            0xFF40..=0xFF4B => self.ppu.write_reg(addr, val, &mut self.if_reg),
            // Any write unmaps the boot ROM for the rest of the session.
            0xFF50 => self.boot_mapped = false,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie_reg = val,
            _ => {}
        }
    }

    /// OAM DMA: copy 160 bytes from `val << 8` into OAM. The transfer is
    /// performed immediately; the bus blockage of real hardware is not
    /// modeled.
    fn oam_dma(&mut self, val: u8) {
        self.ppu.dma = val;
        let base = (val as u16) << 8;
        for i in 0..OAM_DMA_LEN {
            let byte = self.read_byte(base + i);
            self.ppu.oam[i as usize] = byte;
        }
    }
}

const OAM_DMA_LEN: u16 = 0xA0;

impl Default for Mmu {
    fn default() -> Self {
        Self::new_post_boot()
    }
}
