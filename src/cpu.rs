use crate::mmu::Mmu;
use crate::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Registers};
use log::warn;

// Interrupt vectors (gbdev.io/pandocs/Interrupts.html)
const INTERRUPT_VBLANK: u16 = 0x40;
const INTERRUPT_STAT: u16 = 0x48;
const INTERRUPT_TIMER: u16 = 0x50;
const INTERRUPT_SERIAL: u16 = 0x58;
const INTERRUPT_JOYPAD: u16 = 0x60;

/// Opcodes with no assigned encoding. Executing one leaves the CPU stopped.
const INVALID_OPCODES: [u8; 11] = [
    0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD,
];

/// The IME latch. EI does not enable interrupts directly; it arms the
/// latch, which matures when the *next* opcode is fetched, so exactly one
/// instruction runs between EI and the first dispatch. DI and RETI act
/// immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ImeState {
    #[default]
    Off,
    Arming,
    On,
}

pub struct Cpu {
    pub regs: Registers,
    pub ime: ImeState,
    pub halted: bool,
    pub stopped: bool,
    halt_bug: bool,
}

/// Copy of the register/flag/IME state, for embedder save states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub regs: Registers,
    pub ime: ImeState,
    pub halted: bool,
    pub stopped: bool,
}

impl Cpu {
    pub fn new_post_boot() -> Self {
        Self {
            regs: Registers::new_post_boot(),
            ime: ImeState::Off,
            halted: false,
            stopped: false,
            halt_bug: false,
        }
    }

    pub fn new_power_on() -> Self {
        Self {
            regs: Registers::new_power_on(),
            ime: ImeState::Off,
            halted: false,
            stopped: false,
            halt_bug: false,
        }
    }

    /// Formatted CPU state string for debugging.
    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X}",
            self.regs.af(),
            self.regs.bc(),
            self.regs.de(),
            self.regs.hl(),
            self.regs.pc,
            self.regs.sp
        )
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            regs: self.regs,
            ime: self.ime,
            halted: self.halted,
            stopped: self.stopped,
        }
    }

    pub fn restore(&mut self, snapshot: CpuSnapshot) {
        self.regs = snapshot.regs;
        self.ime = snapshot.ime;
        self.halted = snapshot.halted;
        self.stopped = snapshot.stopped;
        self.halt_bug = false;
    }

    /// Execute at most one instruction, or service one interrupt, ticking
    /// the bus once per memory access and internal delay.
    pub fn step(&mut self, mmu: &mut Mmu) {
        if self.stopped {
            return;
        }

        if self.halted {
            mmu.tick();
            if mmu.pending_interrupts() != 0 {
                self.halted = false;
                if self.ime == ImeState::On {
                    self.service_interrupt(mmu);
                }
            }
            return;
        }

        if self.ime == ImeState::On && mmu.pending_interrupts() != 0 {
            self.service_interrupt(mmu);
            return;
        }

        let opcode = if self.halt_bug {
            // The byte after HALT is fetched without advancing PC, so the
            // next instruction sees it again.
            self.halt_bug = false;
            self.read8(mmu, self.regs.pc)
        } else {
            self.fetch8(mmu)
        };

        if self.ime == ImeState::Arming {
            self.ime = ImeState::On;
        }

        self.execute(mmu, opcode);
    }

    /// Interrupt entry, 5 machine cycles: an extra IF read, an internal
    /// delay, the two PC pushes (high byte first, as RST pushes), and the
    /// vector load. The lowest pending bit is acknowledged and IME drops.
    fn service_interrupt(&mut self, mmu: &mut Mmu) {
        mmu.tick();
        let pending = mmu.pending_interrupts();
        let bit = pending & pending.wrapping_neg();
        mmu.if_reg &= !bit;
        self.ime = ImeState::Off;
        mmu.tick();
        self.push16(mmu, self.regs.pc);
        mmu.tick();
        self.regs.pc = match bit {
            0x01 => INTERRUPT_VBLANK,
            0x02 => INTERRUPT_STAT,
            0x04 => INTERRUPT_TIMER,
            0x08 => INTERRUPT_SERIAL,
            _ => INTERRUPT_JOYPAD,
        };
    }

    #[inline(always)]
    fn fetch8(&mut self, mmu: &mut Mmu) -> u8 {
        let val = mmu.read_byte(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        mmu.tick();
        val
    }

    #[inline(always)]
    fn fetch16(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.fetch8(mmu) as u16;
        let hi = self.fetch8(mmu) as u16;
        (hi << 8) | lo
    }

    #[inline(always)]
    fn read8(&mut self, mmu: &mut Mmu, addr: u16) -> u8 {
        let val = mmu.read_byte(addr);
        mmu.tick();
        val
    }

    #[inline(always)]
    fn write8(&mut self, mmu: &mut Mmu, addr: u16, val: u8) {
        mmu.write_byte(addr, val);
        mmu.tick();
    }

    fn push16(&mut self, mmu: &mut Mmu, val: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(mmu, self.regs.sp, (val >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(mmu, self.regs.sp, val as u8);
    }

    fn pop16(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.read8(mmu, self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read8(mmu, self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    /// Read the 3-bit target field `B,C,D,E,H,L,(HL),A`. Target 6 costs a
    /// memory access (and therefore a tick).
    fn read_target(&mut self, mmu: &mut Mmu, target: u8) -> u8 {
        match target {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => {
                let addr = self.regs.hl();
                self.read8(mmu, addr)
            }
            _ => self.regs.a,
        }
    }

    fn write_target(&mut self, mmu: &mut Mmu, target: u8, val: u8) {
        match target {
            0 => self.regs.b = val,
            1 => self.regs.c = val,
            2 => self.regs.d = val,
            3 => self.regs.e = val,
            4 => self.regs.h = val,
            5 => self.regs.l = val,
            6 => {
                let addr = self.regs.hl();
                self.write8(mmu, addr, val);
            }
            _ => self.regs.a = val,
        }
    }

    /// 16-bit pair field of the 0x01/0x09-style rows: `BC,DE,HL,SP`.
    fn get_pair(&self, pair: u8) -> u16 {
        match pair {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            _ => self.regs.sp,
        }
    }

    fn set_pair(&mut self, pair: u8, val: u16) {
        match pair {
            0 => self.regs.set_bc(val),
            1 => self.regs.set_de(val),
            2 => self.regs.set_hl(val),
            _ => self.regs.sp = val,
        }
    }

    /// Condition field of the JR/JP/CALL/RET rows: `NZ,Z,NC,C`.
    fn condition(&self, cond: u8) -> bool {
        match cond {
            0 => !self.regs.flag(FLAG_Z),
            1 => self.regs.flag(FLAG_Z),
            2 => !self.regs.flag(FLAG_C),
            _ => self.regs.flag(FLAG_C),
        }
    }

    // ---- ALU families ----------------------------------------------------

    /// ADD/ADC/SUB/SBC/AND/XOR/OR/CP, selected by bits 5:3 of the opcode.
    fn alu(&mut self, family: u8, val: u8) {
        match family {
            0 => self.add_a(val, false),
            1 => self.add_a(val, true),
            2 => self.sub_a(val, false, true),
            3 => self.sub_a(val, true, true),
            4 => self.and_a(val),
            5 => self.xor_a(val),
            6 => self.or_a(val),
            _ => self.sub_a(val, false, false),
        }
    }

    fn add_a(&mut self, val: u8, with_carry: bool) {
        let carry = (with_carry && self.regs.flag(FLAG_C)) as u8;
        let a = self.regs.a;
        let res = a.wrapping_add(val).wrapping_add(carry);
        self.regs.set_zero(res);
        self.regs.set_flag(FLAG_N, false);
        self.regs.set_add_half8(a, val, carry);
        self.regs.set_add_carry8(a, val, carry);
        self.regs.a = res;
    }

    fn sub_a(&mut self, val: u8, with_carry: bool, store: bool) {
        let carry = (with_carry && self.regs.flag(FLAG_C)) as u8;
        let a = self.regs.a;
        let res = a.wrapping_sub(val).wrapping_sub(carry);
        self.regs.set_zero(res);
        self.regs.set_flag(FLAG_N, true);
        self.regs.set_sub_half8(a, val, carry);
        self.regs.set_sub_carry8(a, val, carry);
        if store {
            self.regs.a = res;
        }
    }

    fn and_a(&mut self, val: u8) {
        self.regs.a &= val;
        let z = if self.regs.a == 0 { FLAG_Z } else { 0 };
        self.regs.set_f(z | FLAG_H);
    }

    fn xor_a(&mut self, val: u8) {
        self.regs.a ^= val;
        let z = if self.regs.a == 0 { FLAG_Z } else { 0 };
        self.regs.set_f(z);
    }

    fn or_a(&mut self, val: u8) {
        self.regs.a |= val;
        let z = if self.regs.a == 0 { FLAG_Z } else { 0 };
        self.regs.set_f(z);
    }

    fn inc8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_add(1);
        self.regs.set_zero(res);
        self.regs.set_flag(FLAG_N, false);
        self.regs.set_flag(FLAG_H, val & 0x0F == 0x0F);
        res
    }

    fn dec8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_sub(1);
        self.regs.set_zero(res);
        self.regs.set_flag(FLAG_N, true);
        self.regs.set_flag(FLAG_H, val & 0x0F == 0x00);
        res
    }

    /// ADD HL,rr. Z is preserved; the caller pays the internal-delay tick.
    fn add_hl(&mut self, val: u16) {
        let hl = self.regs.hl();
        self.regs.set_flag(FLAG_N, false);
        self.regs.set_add_half16(hl, val);
        self.regs.set_add_carry16(hl, val);
        self.regs.set_hl(hl.wrapping_add(val));
    }

    /// SP plus a signed immediate, shared by ADD SP,r8 and LD HL,SP+r8:
    /// H and C come from the unsigned addition on SP's low byte.
    fn sp_plus_signed(&mut self, offset: u8) -> u16 {
        let sp = self.regs.sp;
        self.regs.set_flag(FLAG_Z, false);
        self.regs.set_flag(FLAG_N, false);
        self.regs.set_add_half8(sp as u8, offset, 0);
        self.regs.set_add_carry8(sp as u8, offset, 0);
        sp.wrapping_add(signed_offset(offset))
    }

    // ---- Rotates and shifts ----------------------------------------------

    fn rot_flags(&mut self, res: u8, carry: bool) {
        let z = if res == 0 { FLAG_Z } else { 0 };
        let c = if carry { FLAG_C } else { 0 };
        self.regs.set_f(z | c);
    }

    fn rlc(&mut self, val: u8) -> u8 {
        let res = val.rotate_left(1);
        self.rot_flags(res, val & 0x80 != 0);
        res
    }

    fn rrc(&mut self, val: u8) -> u8 {
        let res = val.rotate_right(1);
        self.rot_flags(res, val & 0x01 != 0);
        res
    }

    fn rl(&mut self, val: u8) -> u8 {
        let res = (val << 1) | self.regs.flag(FLAG_C) as u8;
        self.rot_flags(res, val & 0x80 != 0);
        res
    }

    fn rr(&mut self, val: u8) -> u8 {
        let res = (val >> 1) | ((self.regs.flag(FLAG_C) as u8) << 7);
        self.rot_flags(res, val & 0x01 != 0);
        res
    }

    fn sla(&mut self, val: u8) -> u8 {
        let res = val << 1;
        self.rot_flags(res, val & 0x80 != 0);
        res
    }

    fn sra(&mut self, val: u8) -> u8 {
        let res = (val >> 1) | (val & 0x80);
        self.rot_flags(res, val & 0x01 != 0);
        res
    }

    fn swap(&mut self, val: u8) -> u8 {
        let res = val.rotate_left(4);
        self.rot_flags(res, false);
        res
    }

    fn srl(&mut self, val: u8) -> u8 {
        let res = val >> 1;
        self.rot_flags(res, val & 0x01 != 0);
        res
    }

    // ---- Dispatch --------------------------------------------------------

    fn execute(&mut self, mmu: &mut Mmu, opcode: u8) {
        match opcode {
            // NOP
            0x00 => {}
            // LD rr,nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let val = self.fetch16(mmu);
                self.set_pair((opcode >> 4) & 0x03, val);
            }
            // LD (BC)/(DE),A and LD A,(BC)/(DE)
            0x02 => {
                let addr = self.regs.bc();
                self.write8(mmu, addr, self.regs.a);
            }
            0x12 => {
                let addr = self.regs.de();
                self.write8(mmu, addr, self.regs.a);
            }
            0x0A => {
                let addr = self.regs.bc();
                self.regs.a = self.read8(mmu, addr);
            }
            0x1A => {
                let addr = self.regs.de();
                self.regs.a = self.read8(mmu, addr);
            }
            // LD (HL±),A and LD A,(HL±)
            0x22 => {
                let addr = self.regs.hl();
                self.write8(mmu, addr, self.regs.a);
                self.regs.set_hl(addr.wrapping_add(1));
            }
            0x32 => {
                let addr = self.regs.hl();
                self.write8(mmu, addr, self.regs.a);
                self.regs.set_hl(addr.wrapping_sub(1));
            }
            0x2A => {
                let addr = self.regs.hl();
                self.regs.a = self.read8(mmu, addr);
                self.regs.set_hl(addr.wrapping_add(1));
            }
            0x3A => {
                let addr = self.regs.hl();
                self.regs.a = self.read8(mmu, addr);
                self.regs.set_hl(addr.wrapping_sub(1));
            }
            // INC rr / DEC rr: flags untouched, one internal delay
            0x03 | 0x13 | 0x23 | 0x33 => {
                let pair = (opcode >> 4) & 0x03;
                self.set_pair(pair, self.get_pair(pair).wrapping_add(1));
                mmu.tick();
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let pair = (opcode >> 4) & 0x03;
                self.set_pair(pair, self.get_pair(pair).wrapping_sub(1));
                mmu.tick();
            }
            // INC t / DEC t
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let target = (opcode >> 3) & 0x07;
                let val = self.read_target(mmu, target);
                let res = self.inc8(val);
                self.write_target(mmu, target, res);
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let target = (opcode >> 3) & 0x07;
                let val = self.read_target(mmu, target);
                let res = self.dec8(val);
                self.write_target(mmu, target, res);
            }
            // LD t,n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let val = self.fetch8(mmu);
                self.write_target(mmu, (opcode >> 3) & 0x07, val);
            }
            // Accumulator rotates: Z is always cleared, unlike the CB forms
            0x07 => {
                let a = self.regs.a;
                self.regs.a = self.rlc(a);
                self.regs.set_flag(FLAG_Z, false);
            }
            0x0F => {
                let a = self.regs.a;
                self.regs.a = self.rrc(a);
                self.regs.set_flag(FLAG_Z, false);
            }
            0x17 => {
                let a = self.regs.a;
                self.regs.a = self.rl(a);
                self.regs.set_flag(FLAG_Z, false);
            }
            0x1F => {
                let a = self.regs.a;
                self.regs.a = self.rr(a);
                self.regs.set_flag(FLAG_Z, false);
            }
            // LD (nn),SP
            0x08 => {
                let addr = self.fetch16(mmu);
                self.write8(mmu, addr, self.regs.sp as u8);
                self.write8(mmu, addr.wrapping_add(1), (self.regs.sp >> 8) as u8);
            }
            // ADD HL,rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.add_hl(self.get_pair((opcode >> 4) & 0x03));
                mmu.tick();
            }
            // STOP (consumes its padding byte)
            0x10 => {
                let _ = self.fetch8(mmu);
                self.stopped = true;
            }
            // JR r8 / JR cc,r8
            0x18 => {
                let offset = self.fetch8(mmu);
                self.regs.pc = self.regs.pc.wrapping_add(signed_offset(offset));
                mmu.tick();
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                let offset = self.fetch8(mmu);
                if self.condition((opcode >> 3) & 0x03) {
                    self.regs.pc = self.regs.pc.wrapping_add(signed_offset(offset));
                    mmu.tick();
                }
            }
            // DAA
            0x27 => {
                let mut correction = 0u8;
                let mut carry = false;
                let n = self.regs.flag(FLAG_N);
                if self.regs.flag(FLAG_H) || (!n && self.regs.a & 0x0F > 0x09) {
                    correction |= 0x06;
                }
                if self.regs.flag(FLAG_C) || (!n && self.regs.a > 0x99) {
                    correction |= 0x60;
                    carry = true;
                }
                self.regs.a = if n {
                    self.regs.a.wrapping_sub(correction)
                } else {
                    self.regs.a.wrapping_add(correction)
                };
                self.regs.set_zero(self.regs.a);
                self.regs.set_flag(FLAG_H, false);
                self.regs.set_flag(FLAG_C, carry);
            }
            // CPL / SCF / CCF
            0x2F => {
                self.regs.a ^= 0xFF;
                self.regs.set_flag(FLAG_N, true);
                self.regs.set_flag(FLAG_H, true);
            }
            0x37 => {
                self.regs.set_flag(FLAG_N, false);
                self.regs.set_flag(FLAG_H, false);
                self.regs.set_flag(FLAG_C, true);
            }
            0x3F => {
                let c = self.regs.flag(FLAG_C);
                self.regs.set_flag(FLAG_N, false);
                self.regs.set_flag(FLAG_H, false);
                self.regs.set_flag(FLAG_C, !c);
            }
            // HALT sits in the middle of the LD block
            0x76 => {
                if self.ime == ImeState::Off && mmu.pending_interrupts() != 0 {
                    self.halt_bug = true;
                } else {
                    self.halted = true;
                }
            }
            // LD t,t
            0x40..=0x7F => {
                let val = self.read_target(mmu, opcode & 0x07);
                self.write_target(mmu, (opcode >> 3) & 0x07, val);
            }
            // ALU A,t
            0x80..=0xBF => {
                let val = self.read_target(mmu, opcode & 0x07);
                self.alu((opcode >> 3) & 0x07, val);
            }
            // ALU A,n: the immediate forms reuse the same family field
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let val = self.fetch8(mmu);
                self.alu((opcode >> 3) & 0x07, val);
            }
            // RET cc: one tick for the condition check, then a full RET
            0xC0 | 0xC8 | 0xD0 | 0xD8 => {
                mmu.tick();
                if self.condition((opcode >> 3) & 0x03) {
                    self.regs.pc = self.pop16(mmu);
                    mmu.tick();
                }
            }
            // POP rr (AF's flag nibble is masked by the register file)
            0xC1 | 0xD1 | 0xE1 => {
                let val = self.pop16(mmu);
                self.set_pair((opcode >> 4) & 0x03, val);
            }
            0xF1 => {
                let val = self.pop16(mmu);
                self.regs.set_af(val);
            }
            // JP cc,nn / JP nn
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                let addr = self.fetch16(mmu);
                if self.condition((opcode >> 3) & 0x03) {
                    self.regs.pc = addr;
                    mmu.tick();
                }
            }
            0xC3 => {
                self.regs.pc = self.fetch16(mmu);
                mmu.tick();
            }
            // CALL cc,nn / CALL nn
            0xC4 | 0xCC | 0xD4 | 0xDC => {
                let addr = self.fetch16(mmu);
                if self.condition((opcode >> 3) & 0x03) {
                    mmu.tick();
                    self.push16(mmu, self.regs.pc);
                    self.regs.pc = addr;
                }
            }
            0xCD => {
                let addr = self.fetch16(mmu);
                mmu.tick();
                self.push16(mmu, self.regs.pc);
                self.regs.pc = addr;
            }
            // PUSH rr
            0xC5 | 0xD5 | 0xE5 => {
                let val = self.get_pair((opcode >> 4) & 0x03);
                mmu.tick();
                self.push16(mmu, val);
            }
            0xF5 => {
                let val = self.regs.af();
                mmu.tick();
                self.push16(mmu, val);
            }
            // RST n: vector = opcode - 0xC7
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                mmu.tick();
                self.push16(mmu, self.regs.pc);
                self.regs.pc = (opcode - 0xC7) as u16;
            }
            // RET / RETI
            0xC9 => {
                self.regs.pc = self.pop16(mmu);
                mmu.tick();
            }
            0xD9 => {
                self.regs.pc = self.pop16(mmu);
                mmu.tick();
                self.ime = ImeState::On;
            }
            // CB prefix
            0xCB => {
                let op = self.fetch8(mmu);
                self.execute_cb(mmu, op);
            }
            // High-page loads
            0xE0 => {
                let offset = self.fetch8(mmu);
                self.write8(mmu, 0xFF00 | offset as u16, self.regs.a);
            }
            0xF0 => {
                let offset = self.fetch8(mmu);
                self.regs.a = self.read8(mmu, 0xFF00 | offset as u16);
            }
            0xE2 => {
                self.write8(mmu, 0xFF00 | self.regs.c as u16, self.regs.a);
            }
            0xF2 => {
                self.regs.a = self.read8(mmu, 0xFF00 | self.regs.c as u16);
            }
            // ADD SP,r8 / LD HL,SP+r8 / LD SP,HL
            0xE8 => {
                let offset = self.fetch8(mmu);
                self.regs.sp = self.sp_plus_signed(offset);
                mmu.tick();
                mmu.tick();
            }
            0xF8 => {
                let offset = self.fetch8(mmu);
                let res = self.sp_plus_signed(offset);
                self.regs.set_hl(res);
                mmu.tick();
            }
            0xF9 => {
                self.regs.sp = self.regs.hl();
                mmu.tick();
            }
            // JP (HL): no extra delay, PC comes straight from the register
            0xE9 => {
                self.regs.pc = self.regs.hl();
            }
            // Absolute loads of A
            0xEA => {
                let addr = self.fetch16(mmu);
                self.write8(mmu, addr, self.regs.a);
            }
            0xFA => {
                let addr = self.fetch16(mmu);
                self.regs.a = self.read8(mmu, addr);
            }
            // DI / EI
            0xF3 => {
                self.ime = ImeState::Off;
            }
            0xFB => {
                if self.ime == ImeState::Off {
                    self.ime = ImeState::Arming;
                }
            }
            // Unassigned encodings: quiesce rather than mis-execute.
            _ => {
                debug_assert!(INVALID_OPCODES.contains(&opcode));
                warn!(
                    "invalid opcode {opcode:#04X} at {:#06X}; stopping CPU",
                    self.regs.pc.wrapping_sub(1)
                );
                self.stopped = true;
            }
        }
    }

    /// The CB plane: 32 rows of 8, selected by bits 7:3; bits 2:0 pick the
    /// target.
    fn execute_cb(&mut self, mmu: &mut Mmu, op: u8) {
        let target = op & 0x07;
        let row = op >> 3;
        match row {
            // Rotate/shift family
            0x00..=0x07 => {
                let val = self.read_target(mmu, target);
                let res = match row {
                    0x00 => self.rlc(val),
                    0x01 => self.rrc(val),
                    0x02 => self.rl(val),
                    0x03 => self.rr(val),
                    0x04 => self.sla(val),
                    0x05 => self.sra(val),
                    0x06 => self.swap(val),
                    _ => self.srl(val),
                };
                self.write_target(mmu, target, res);
            }
            // BIT b,t: reads only, C preserved
            0x08..=0x0F => {
                let bit = row - 0x08;
                let val = self.read_target(mmu, target);
                self.regs.set_flag(FLAG_Z, val & (1 << bit) == 0);
                self.regs.set_flag(FLAG_N, false);
                self.regs.set_flag(FLAG_H, true);
            }
            // RES b,t / SET b,t: no flag effects
            0x10..=0x17 => {
                let bit = row - 0x10;
                let val = self.read_target(mmu, target);
                self.write_target(mmu, target, val & !(1 << bit));
            }
            _ => {
                let bit = row - 0x18;
                let val = self.read_target(mmu, target);
                self.write_target(mmu, target, val | (1 << bit));
            }
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new_post_boot()
    }
}

/// Two's-complement reading of an offset byte, widened for 16-bit adds.
fn signed_offset(byte: u8) -> u16 {
    byte as i8 as u16
}
