//! Sound collaborator.
//!
//! Owns the FF10-FF3F register window. Synthesis is out of scope for the
//! core; the registers behave well enough for software that programs them
//! blindly: NR52 bit 7 gates the whole block, and powering off clears
//! NR10-NR51. Wave RAM is plain storage.

const REG_BASE: u16 = 0xFF10;
const NR52: u16 = 0xFF26;
const WAVE_BASE: u16 = 0xFF30;

pub struct Apu {
    regs: [u8; 0x16],
    wave: [u8; 0x10],
    powered: bool,
}

impl Apu {
    pub fn new() -> Self {
        Self {
            regs: [0; 0x16],
            wave: [0; 0x10],
            powered: false,
        }
    }

    pub fn new_post_boot() -> Self {
        let mut apu = Self::new();
        apu.powered = true;
        apu
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            NR52 => (if self.powered { 0x80 } else { 0 }) | 0x70,
            0xFF10..=0xFF25 => self.regs[(addr - REG_BASE) as usize],
            0xFF30..=0xFF3F => self.wave[(addr - WAVE_BASE) as usize],
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        match addr {
            NR52 => {
                let on = val & 0x80 != 0;
                if self.powered && !on {
                    self.regs = [0; 0x16];
                }
                self.powered = on;
            }
            // Registers are inert while the block is powered down.
            0xFF10..=0xFF25 if self.powered => self.regs[(addr - REG_BASE) as usize] = val,
            0xFF30..=0xFF3F => self.wave[(addr - WAVE_BASE) as usize] = val,
            _ => {}
        }
    }

    /// Per-machine-cycle hook. Synthesis is not modeled, so this only keeps
    /// the collaborator stepping order on the bus stable.
    pub fn step(&mut self, _cycles: u16) {}
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}
