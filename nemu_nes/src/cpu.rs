use serde::{Deserialize, Serialize};

use crate::bus::Bus;
use crate::interrupt::DmaKind;
use addressing::{AddrMode, ADDR_MODES};
use status::Status;

mod addressing;
mod op_code;
mod status;

const NMI_VECTOR: u16 = 0xfffa;
const RESET_VECTOR: u16 = 0xfffc;
const IRQ_VECTOR: u16 = 0xfffe;

const INTERRUPT_CYCLES: u32 = 7;

/// fatal CPU conditions; cleared only by reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Halt {
    /// a KIL/JAM opcode was executed
    Kil,
    /// stack pointer wrapped 0xff -> 0x00 on a pop (strict mode only)
    StackUnderflow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CpuConfig {
    /// 0: documented only, 1: common unofficial, 2: everything
    pub undocumented_level: u8,
    /// whether SAX updates N and Z (boards disagree; default off)
    pub aax_sets_flags: bool,
    /// halt on stack underflow instead of wrapping silently
    pub strict_stack: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            undocumented_level: 2,
            aax_sets_flags: false,
            strict_stack: false,
        }
    }
}

/// register snapshot for debuggers and tests
#[derive(Debug, Clone, Copy)]
pub struct CpuStatus {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub p: u8,
}

pub struct Cpu {
    a: u8,
    x: u8,
    y: u8,
    pc: u16,
    sp: u8,
    p: Status,

    cycles: u64,
    halt: Option<Halt>,
    config: CpuConfig,

    op: u8,
    op_mode: AddrMode,
    op_address: u16,
    cross_page: bool,
    extra: u32,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::with_config(CpuConfig::default())
    }
}

impl Cpu {
    pub fn with_config(config: CpuConfig) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0xfd,
            p: 0x34u8.into(),

            cycles: 0,
            halt: None,
            config,

            op: 0xea,
            op_mode: AddrMode::IMP,
            op_address: 0,
            cross_page: false,
            extra: 0,
        }
    }

    pub fn reset(&mut self, bus: &mut Bus) {
        self.sp = 0xfd;
        self.p = 0x34u8.into();
        self.pc = self.read_word(RESET_VECTOR, bus);
        self.cycles = INTERRUPT_CYCLES as u64;
        self.halt = None;
    }

    /// execute one instruction and return its cycle cost
    pub fn step(&mut self, bus: &mut Bus) -> u32 {
        if self.halt.is_some() {
            // jammed; the rest of the machine keeps running
            return 1;
        }

        self.extra = 0;
        self.op = self.fetch_byte(bus);
        self.addressing(self.op, bus);

        let func = op_code::OP_FUNCS[self.op as usize];
        func(self, bus);

        let cycles = op_code::OP_CYCLES[self.op as usize] as u32 + self.extra;
        self.cycles += cycles as u64;
        cycles
    }

    pub fn trigger_nmi(&mut self, bus: &mut Bus) -> u32 {
        self.interrupt(NMI_VECTOR, bus);
        INTERRUPT_CYCLES
    }

    /// returns 0 when masked by the I flag
    pub fn trigger_irq(&mut self, bus: &mut Bus) -> u32 {
        if self.p.i {
            return 0;
        }
        self.interrupt(IRQ_VECTOR, bus);
        INTERRUPT_CYCLES
    }

    pub(crate) fn dma_pause(&mut self, kind: DmaKind, count: u16) -> u32 {
        let cycles = match kind {
            DmaKind::Oam => 513 + (self.cycles & 1) as u32,
            DmaKind::Dmc => 4 * count as u32,
            // two cycles per stalled bus pair; the count already
            // includes any OAM transfer the request absorbed
            DmaKind::DmcDuringOam => 2 * count as u32,
        };
        self.cycles += cycles as u64;
        cycles
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn halt(&self) -> Option<Halt> {
        self.halt
    }

    pub fn status(&self) -> CpuStatus {
        CpuStatus {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            p: self.p.to_u8(),
        }
    }

    fn interrupt(&mut self, vector: u16, bus: &mut Bus) {
        self.push_word(self.pc, bus);
        self.push_byte(self.p.to_u8(), bus);
        self.p.i = true;
        self.pc = self.read_word(vector, bus);
        self.cycles += INTERRUPT_CYCLES as u64;
    }
}

impl Cpu {
    fn fetch_byte(&mut self, bus: &mut Bus) -> u8 {
        let b = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        b
    }

    fn fetch_word(&mut self, bus: &mut Bus) -> u16 {
        let d = self.read_word(self.pc, bus);
        self.pc = self.pc.wrapping_add(2);
        d
    }

    fn read_word(&mut self, addr: u16, bus: &mut Bus) -> u16 {
        let lb = bus.read(addr) as u16;
        let hb = bus.read(addr.wrapping_add(1)) as u16;
        (hb << 8) | lb
    }

    fn push_byte(&mut self, b: u8, bus: &mut Bus) {
        bus.write(0x100 + self.sp as u16, b);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop_byte(&mut self, bus: &mut Bus) -> u8 {
        if self.sp == 0xff {
            if self.config.strict_stack {
                self.halt = Some(Halt::StackUnderflow);
            }
            log::warn!("stack underflow at PC {:04X}", self.pc);
        }
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x100 + self.sp as u16)
    }

    fn push_word(&mut self, b: u16, bus: &mut Bus) {
        self.push_byte((b >> 8) as u8, bus);
        self.push_byte(b as u8, bus);
    }

    fn pop_word(&mut self, bus: &mut Bus) -> u16 {
        let lb = self.pop_byte(bus) as u16;
        let hb = self.pop_byte(bus) as u16;
        (hb << 8) | lb
    }
}

impl Cpu {
    /// one nestest-style log line for the instruction at PC
    pub fn trace(&self, bus: &Bus) -> String {
        use std::fmt::Write;

        let op = bus.inspect(self.pc) as usize;
        let name = op_code::OP_NAMES[op];

        let mut line = format!("{:04X}  ", self.pc);
        match ADDR_MODES[op] {
            AddrMode::IMP | AddrMode::ACC => {
                let _ = write!(line, "{:02X}        {}", op, name);
            }
            AddrMode::ABS | AddrMode::ABX | AddrMode::ABY | AddrMode::IND => {
                let lb = bus.inspect(self.pc.wrapping_add(1));
                let hb = bus.inspect(self.pc.wrapping_add(2));
                let _ = write!(line, "{:02X} {:02X} {:02X}  {}", op, lb, hb, name);
            }
            _ => {
                let op1 = bus.inspect(self.pc.wrapping_add(1));
                let _ = write!(line, "{:02X} {:02X}     {}", op, op1, name);
            }
        }

        let _ = write!(
            line,
            " A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.a,
            self.x,
            self.y,
            self.p.to_u8(),
            self.sp,
            self.cycles
        );
        line
    }

    pub(crate) fn save_state(&self) -> CpuState {
        CpuState {
            a: self.a,
            x: self.x,
            y: self.y,
            pc: self.pc,
            sp: self.sp,
            p: self.p.to_u8(),
            cycles: self.cycles,
            halt: self.halt,
        }
    }

    pub(crate) fn load_state(&mut self, state: &CpuState) {
        self.a = state.a;
        self.x = state.x;
        self.y = state.y;
        self.pc = state.pc;
        self.sp = state.sp;
        self.p = state.p.into();
        self.cycles = state.cycles;
        self.halt = state.halt;
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct CpuState {
    a: u8,
    x: u8,
    y: u8,
    pc: u16,
    sp: u8,
    p: u8,
    cycles: u64,
    halt: Option<Halt>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cartridge;
    use crate::rom::{build_ines, Rom};

    /// NROM image with `program` at 0x8000 and the reset vector pointing
    /// at it
    fn bus_with(program: &[u8]) -> Bus {
        let mut data = build_ines(0, 2, 1, 0);
        data[16..16 + program.len()].copy_from_slice(program);
        data[16 + 0x7ffc] = 0x00;
        data[16 + 0x7ffd] = 0x80;
        Bus::new(Cartridge::new(Rom::parse(&data).unwrap()))
    }

    fn cpu_with(program: &[u8]) -> (Cpu, Bus) {
        let mut bus = bus_with(program);
        let mut cpu = Cpu::default();
        cpu.reset(&mut bus);
        (cpu, bus)
    }

    #[test]
    fn test_reset_state() {
        let (cpu, _) = cpu_with(&[0xea]);
        let s = cpu.status();
        assert_eq!(s.pc, 0x8000);
        assert_eq!(s.sp, 0xfd);
        assert_eq!(s.p & 0b0000_0100, 0b0000_0100); // I set
        assert_eq!(cpu.cycles(), 7);
    }

    #[test]
    fn test_lda_flags_and_cycles() {
        let (mut cpu, mut bus) = cpu_with(&[0xa9, 0x00, 0xa9, 0x80]);
        assert_eq!(cpu.step(&mut bus), 2);
        assert!(cpu.p.z);
        cpu.step(&mut bus);
        assert!(cpu.p.n && !cpu.p.z);
        assert_eq!(cpu.status().a, 0x80);
    }

    #[test]
    fn test_adc_overflow() {
        // 0x50 + 0x50 = 0xa0: signed overflow, carry clear
        let (mut cpu, mut bus) = cpu_with(&[0xa9, 0x50, 0x69, 0x50]);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.status().a, 0xa0);
        assert!(cpu.p.v && !cpu.p.c && cpu.p.n);

        // 0xd0 + 0x90 = 0x60 + carry: overflow and carry
        let (mut cpu, mut bus) = cpu_with(&[0xa9, 0xd0, 0x69, 0x90]);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert!(cpu.p.v && cpu.p.c);
    }

    #[test]
    fn test_sbc_flags() {
        // 5 - 3 with carry set: result 2, no borrow
        let (mut cpu, mut bus) = cpu_with(&[0x38, 0xa9, 0x05, 0xe9, 0x03]);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.status().a, 0x02);
        assert!(cpu.p.c && !cpu.p.v);
    }

    #[test]
    fn test_jmp_self_is_three_cycles() {
        let (mut cpu, mut bus) = cpu_with(&[0x4c, 0x00, 0x80]);
        for _ in 0..4 {
            let before = cpu.cycles();
            assert_eq!(cpu.step(&mut bus), 3);
            assert_eq!(cpu.status().pc, 0x8000);
            assert_eq!(cpu.cycles() - before, 3);
        }
    }

    #[test]
    fn test_indirect_jmp_page_wrap_bug() {
        // pointer at 0x02ff: low byte from 0x02ff, high from 0x0200
        let (mut cpu, mut bus) = cpu_with(&[0x6c, 0xff, 0x02]);
        bus.write(0x02ff, 0x34);
        bus.write(0x0300, 0xff); // must NOT be used
        bus.write(0x0200, 0x12);
        cpu.step(&mut bus);
        assert_eq!(cpu.status().pc, 0x1234);
    }

    #[test]
    fn test_zero_page_x_wraps() {
        // LDX #$ff; LDA $01,X -> reads 0x0000
        let (mut cpu, mut bus) = cpu_with(&[0xa2, 0xff, 0xb5, 0x01]);
        bus.write(0x0000, 0x42);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.status().a, 0x42);
    }

    #[test]
    fn test_branch_cycles() {
        // BNE taken, no page cross: 3 cycles
        let (mut cpu, mut bus) = cpu_with(&[0xa9, 0x01, 0xd0, 0x01, 0xea, 0xea]);
        cpu.step(&mut bus);
        assert_eq!(cpu.step(&mut bus), 3);

        // BEQ not taken: 2 cycles
        let (mut cpu, mut bus) = cpu_with(&[0xa9, 0x01, 0xf0, 0x10]);
        cpu.step(&mut bus);
        assert_eq!(cpu.step(&mut bus), 2);
    }

    #[test]
    fn test_page_cross_load_cycle() {
        // LDA $80ff,X with X=1 crosses into 0x8100
        let (mut cpu, mut bus) = cpu_with(&[0xa2, 0x01, 0xbd, 0xff, 0x80]);
        cpu.step(&mut bus);
        assert_eq!(cpu.step(&mut bus), 5);

        // STA never pays the cross penalty
        let (mut cpu, mut bus) = cpu_with(&[0xa2, 0x01, 0x9d, 0xff, 0x02]);
        cpu.step(&mut bus);
        assert_eq!(cpu.step(&mut bus), 5);
    }

    #[test]
    fn test_brk_pushes_and_sets_i() {
        let (mut cpu, mut bus) = cpu_with(&[0x58, 0x00]); // CLI; BRK
        cpu.step(&mut bus);
        assert!(!cpu.p.i);
        cpu.step(&mut bus);
        assert!(cpu.p.i);

        // pushed status has B and bit 5 set; pushed PC is BRK+2
        let flags = bus.read(0x01fb);
        assert_eq!(flags & 0b0011_0000, 0b0011_0000);
        let lo = bus.read(0x01fc) as u16;
        let hi = bus.read(0x01fd) as u16;
        assert_eq!((hi << 8) | lo, 0x8003);
    }

    #[test]
    fn test_nmi_vectoring() {
        let mut data = build_ines(0, 2, 1, 0);
        data[16 + 0x7ffc] = 0x00;
        data[16 + 0x7ffd] = 0x80;
        data[16 + 0x7ffa] = 0x00;
        data[16 + 0x7ffb] = 0x90; // nmi -> 0x9000
        let mut bus = Bus::new(Cartridge::new(Rom::parse(&data).unwrap()));
        let mut cpu = Cpu::default();
        cpu.reset(&mut bus);

        assert_eq!(cpu.trigger_nmi(&mut bus), 7);
        assert_eq!(cpu.status().pc, 0x9000);
        // B clear on the pushed byte
        let flags = bus.read(0x01fb);
        assert_eq!(flags & 0b0001_0000, 0);
    }

    #[test]
    fn test_irq_masked_by_i() {
        let (mut cpu, mut bus) = cpu_with(&[0xea]);
        assert_eq!(cpu.trigger_irq(&mut bus), 0);
    }

    #[test]
    fn test_dma_pause_costs() {
        let (mut cpu, mut bus) = cpu_with(&[0x4c, 0x00, 0x80]);
        // cycle counter is 7 (odd) after reset
        assert_eq!(cpu.dma_pause(DmaKind::Oam, 256), 514);
        cpu.step(&mut bus); // 3 cycles, making the counter even
        assert_eq!(cpu.dma_pause(DmaKind::Oam, 256), 513);
        assert_eq!(cpu.dma_pause(DmaKind::Dmc, 1), 4);
        assert_eq!(cpu.dma_pause(DmaKind::DmcDuringOam, 2), 4);
    }

    #[test]
    fn test_kil_halts() {
        let (mut cpu, mut bus) = cpu_with(&[0x02]);
        cpu.step(&mut bus);
        assert_eq!(cpu.halt(), Some(Halt::Kil));
        // a jammed cpu only burns time
        let pc = cpu.status().pc;
        assert_eq!(cpu.step(&mut bus), 1);
        assert_eq!(cpu.status().pc, pc);

        cpu.reset(&mut bus);
        assert_eq!(cpu.halt(), None);
    }

    #[test]
    fn test_lax_and_level_gate() {
        let (mut cpu, mut bus) = cpu_with(&[0xa7, 0x10]);
        bus.write(0x0010, 0x5a);
        cpu.step(&mut bus);
        assert_eq!(cpu.status().a, 0x5a);
        assert_eq!(cpu.status().x, 0x5a);

        // level 0 turns it into a NOP
        let mut cpu = Cpu::with_config(CpuConfig {
            undocumented_level: 0,
            ..CpuConfig::default()
        });
        let mut bus = bus_with(&[0xa7, 0x10]);
        bus.write(0x0010, 0x5a);
        cpu.reset(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.status().a, 0x00);
    }

    #[test]
    fn test_dcp_composite() {
        // DCP $10: DEC then CMP
        let (mut cpu, mut bus) = cpu_with(&[0xa9, 0x40, 0xc7, 0x10]);
        bus.write(0x0010, 0x41);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(bus.read(0x0010), 0x40);
        assert!(cpu.p.z && cpu.p.c);
    }

    #[test]
    fn test_axs_sets_carry_like_cmp() {
        // A=0xff, X=0x0f -> (A&X)=0x0f; AXS #$05 -> X=0x0a, carry set
        let (mut cpu, mut bus) = cpu_with(&[0xa9, 0xff, 0xa2, 0x0f, 0xcb, 0x05]);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.status().x, 0x0a);
        assert!(cpu.p.c);
    }

    #[test]
    fn test_trace_format() {
        let (cpu, bus) = cpu_with(&[0x4c, 0x00, 0x80]);
        let line = cpu.trace(&bus);
        assert!(line.starts_with("8000  4C 00 80  JMP"));
        assert!(line.contains("SP:FD"));
    }
}
