use crate::{
    cartridge::{Cartridge, CartridgeError},
    cpu::Cpu,
    mmu::Mmu,
};

/// T-states per vertical refresh; one frame of [`GameBoy::step_frame`].
pub const T_STATES_PER_FRAME: u64 = 70_224;

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl GameBoy {
    /// A machine in the post-boot state, ready to fetch from 0x0100.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new_post_boot(),
            mmu: Mmu::new_post_boot(),
        }
    }

    /// A machine at power-on, executing the boot ROM from 0x0000.
    pub fn new_power_on() -> Self {
        Self {
            cpu: Cpu::new_power_on(),
            mmu: Mmu::new_power_on(),
        }
    }

    pub fn load_rom(&mut self, data: Vec<u8>) -> Result<(), CartridgeError> {
        self.mmu.load_cart(Cartridge::load(data)?);
        Ok(())
    }

    pub fn load_boot_rom(&mut self, data: &[u8]) {
        self.mmu.load_boot_rom(data);
    }

    /// Execute one instruction (or interrupt entry, or halted idle cycle).
    pub fn step(&mut self) {
        self.cpu.step(&mut self.mmu);
    }

    /// Run until one frame's worth of T-states has elapsed. Returns early
    /// if the CPU stops, since a stopped CPU no longer advances the clock.
    pub fn step_frame(&mut self) {
        let end = self.mmu.t_clock + T_STATES_PER_FRAME;
        while self.mmu.t_clock < end && !self.cpu.stopped {
            self.step();
        }
    }

    /// Reset to the initial post-boot state while preserving the loaded
    /// cartridge and boot ROM.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::new_post_boot();
        self.mmu = Mmu::new_post_boot();
        if let Some(cart) = cart {
            self.mmu.load_cart(cart);
        }
    }

    /// Reset to the power-on state (boot ROM path), preserving the loaded
    /// cartridge.
    pub fn reset_power_on(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::new_power_on();
        self.mmu = Mmu::new_power_on();
        if let Some(cart) = cart {
            self.mmu.load_cart(cart);
        }
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
