use super::addressing::AddrMode;
use super::{Cpu, Halt};
use crate::bus::Bus;

type Op = fn(&mut Cpu, &mut Bus);

#[rustfmt::skip]
pub const OP_FUNCS: [Op; 256] = [
//     00        01        02        03        04        05        06        07        08        09        0a        0b        0c        0d        0e        0f
    Cpu::brk, Cpu::ora, Cpu::kil, Cpu::slo, Cpu::nop, Cpu::ora, Cpu::asl, Cpu::slo, Cpu::php, Cpu::ora, Cpu::asl, Cpu::anc, Cpu::nop, Cpu::ora, Cpu::asl, Cpu::slo, // 00
    Cpu::bpl, Cpu::ora, Cpu::kil, Cpu::slo, Cpu::nop, Cpu::ora, Cpu::asl, Cpu::slo, Cpu::clc, Cpu::ora, Cpu::nop, Cpu::slo, Cpu::nop, Cpu::ora, Cpu::asl, Cpu::slo, // 10
    Cpu::jsr, Cpu::and, Cpu::kil, Cpu::rla, Cpu::bit, Cpu::and, Cpu::rol, Cpu::rla, Cpu::plp, Cpu::and, Cpu::rol, Cpu::anc, Cpu::bit, Cpu::and, Cpu::rol, Cpu::rla, // 20
    Cpu::bmi, Cpu::and, Cpu::kil, Cpu::rla, Cpu::nop, Cpu::and, Cpu::rol, Cpu::rla, Cpu::sec, Cpu::and, Cpu::nop, Cpu::rla, Cpu::nop, Cpu::and, Cpu::rol, Cpu::rla, // 30
    Cpu::rti, Cpu::eor, Cpu::kil, Cpu::sre, Cpu::nop, Cpu::eor, Cpu::lsr, Cpu::sre, Cpu::pha, Cpu::eor, Cpu::lsr, Cpu::asr, Cpu::jmp, Cpu::eor, Cpu::lsr, Cpu::sre, // 40
    Cpu::bvc, Cpu::eor, Cpu::kil, Cpu::sre, Cpu::nop, Cpu::eor, Cpu::lsr, Cpu::sre, Cpu::cli, Cpu::eor, Cpu::nop, Cpu::sre, Cpu::nop, Cpu::eor, Cpu::lsr, Cpu::sre, // 50
    Cpu::rts, Cpu::adc, Cpu::kil, Cpu::rra, Cpu::nop, Cpu::adc, Cpu::ror, Cpu::rra, Cpu::pla, Cpu::adc, Cpu::ror, Cpu::arr, Cpu::jmp, Cpu::adc, Cpu::ror, Cpu::rra, // 60
    Cpu::bvs, Cpu::adc, Cpu::kil, Cpu::rra, Cpu::nop, Cpu::adc, Cpu::ror, Cpu::rra, Cpu::sei, Cpu::adc, Cpu::nop, Cpu::rra, Cpu::nop, Cpu::adc, Cpu::ror, Cpu::rra, // 70
    Cpu::nop, Cpu::sta, Cpu::nop, Cpu::sax, Cpu::sty, Cpu::sta, Cpu::stx, Cpu::sax, Cpu::dey, Cpu::nop, Cpu::txa, Cpu::xaa, Cpu::sty, Cpu::sta, Cpu::stx, Cpu::sax, // 80
    Cpu::bcc, Cpu::sta, Cpu::kil, Cpu::axa, Cpu::sty, Cpu::sta, Cpu::stx, Cpu::sax, Cpu::tya, Cpu::sta, Cpu::txs, Cpu::xas, Cpu::sya, Cpu::sta, Cpu::sxa, Cpu::axa, // 90
    Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, Cpu::tay, Cpu::lda, Cpu::tax, Cpu::atx, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, // a0
    Cpu::bcs, Cpu::lda, Cpu::kil, Cpu::lax, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, Cpu::clv, Cpu::lda, Cpu::tsx, Cpu::lar, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, // b0
    Cpu::cpy, Cpu::cmp, Cpu::nop, Cpu::dcp, Cpu::cpy, Cpu::cmp, Cpu::dec, Cpu::dcp, Cpu::iny, Cpu::cmp, Cpu::dex, Cpu::axs, Cpu::cpy, Cpu::cmp, Cpu::dec, Cpu::dcp, // c0
    Cpu::bne, Cpu::cmp, Cpu::kil, Cpu::dcp, Cpu::nop, Cpu::cmp, Cpu::dec, Cpu::dcp, Cpu::cld, Cpu::cmp, Cpu::nop, Cpu::dcp, Cpu::nop, Cpu::cmp, Cpu::dec, Cpu::dcp, // d0
    Cpu::cpx, Cpu::sbc, Cpu::nop, Cpu::isb, Cpu::cpx, Cpu::sbc, Cpu::inc, Cpu::isb, Cpu::inx, Cpu::sbc, Cpu::nop, Cpu::sbc, Cpu::cpx, Cpu::sbc, Cpu::inc, Cpu::isb, // e0
    Cpu::beq, Cpu::sbc, Cpu::kil, Cpu::isb, Cpu::nop, Cpu::sbc, Cpu::inc, Cpu::isb, Cpu::sed, Cpu::sbc, Cpu::nop, Cpu::isb, Cpu::nop, Cpu::sbc, Cpu::inc, Cpu::isb, // f0
];

#[rustfmt::skip]
pub const OP_NAMES: [&str; 256] = [
//   00     01     02     03     04     05     06     07     08     09     0a     0b     0c     0d     0e     0f
    "BRK", "ORA", "KIL", "SLO", "NOP", "ORA", "ASL", "SLO", "PHP", "ORA", "ASL", "ANC", "NOP", "ORA", "ASL", "SLO", // 00
    "BPL", "ORA", "KIL", "SLO", "NOP", "ORA", "ASL", "SLO", "CLC", "ORA", "NOP", "SLO", "NOP", "ORA", "ASL", "SLO", // 10
    "JSR", "AND", "KIL", "RLA", "BIT", "AND", "ROL", "RLA", "PLP", "AND", "ROL", "ANC", "BIT", "AND", "ROL", "RLA", // 20
    "BMI", "AND", "KIL", "RLA", "NOP", "AND", "ROL", "RLA", "SEC", "AND", "NOP", "RLA", "NOP", "AND", "ROL", "RLA", // 30
    "RTI", "EOR", "KIL", "SRE", "NOP", "EOR", "LSR", "SRE", "PHA", "EOR", "LSR", "ASR", "JMP", "EOR", "LSR", "SRE", // 40
    "BVC", "EOR", "KIL", "SRE", "NOP", "EOR", "LSR", "SRE", "CLI", "EOR", "NOP", "SRE", "NOP", "EOR", "LSR", "SRE", // 50
    "RTS", "ADC", "KIL", "RRA", "NOP", "ADC", "ROR", "RRA", "PLA", "ADC", "ROR", "ARR", "JMP", "ADC", "ROR", "RRA", // 60
    "BVS", "ADC", "KIL", "RRA", "NOP", "ADC", "ROR", "RRA", "SEI", "ADC", "NOP", "RRA", "NOP", "ADC", "ROR", "RRA", // 70
    "NOP", "STA", "NOP", "SAX", "STY", "STA", "STX", "SAX", "DEY", "NOP", "TXA", "XAA", "STY", "STA", "STX", "SAX", // 80
    "BCC", "STA", "KIL", "AXA", "STY", "STA", "STX", "SAX", "TYA", "STA", "TXS", "XAS", "SYA", "STA", "SXA", "AXA", // 90
    "LDY", "LDA", "LDX", "LAX", "LDY", "LDA", "LDX", "LAX", "TAY", "LDA", "TAX", "ATX", "LDY", "LDA", "LDX", "LAX", // a0
    "BCS", "LDA", "KIL", "LAX", "LDY", "LDA", "LDX", "LAX", "CLV", "LDA", "TSX", "LAR", "LDY", "LDA", "LDX", "LAX", // b0
    "CPY", "CMP", "NOP", "DCP", "CPY", "CMP", "DEC", "DCP", "INY", "CMP", "DEX", "AXS", "CPY", "CMP", "DEC", "DCP", // c0
    "BNE", "CMP", "KIL", "DCP", "NOP", "CMP", "DEC", "DCP", "CLD", "CMP", "NOP", "DCP", "NOP", "CMP", "DEC", "DCP", // d0
    "CPX", "SBC", "NOP", "ISB", "CPX", "SBC", "INC", "ISB", "INX", "SBC", "NOP", "SBC", "CPX", "SBC", "INC", "ISB", // e0
    "BEQ", "SBC", "KIL", "ISB", "NOP", "SBC", "INC", "ISB", "SED", "SBC", "NOP", "ISB", "NOP", "SBC", "INC", "ISB", // f0
];

/// base cycle cost per opcode; branch and page-cross extras are added
/// during execution
#[rustfmt::skip]
pub const OP_CYCLES: [u8; 256] = [
//  00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f
    7, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6, // 00
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 10
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6, // 20
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 30
    6, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6, // 40
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 50
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6, // 60
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 70
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 80
    2, 6, 2, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5, // 90
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // a0
    2, 5, 2, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4, // b0
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // c0
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // d0
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // e0
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // f0
];

impl Cpu {
    fn get_operand(&mut self, bus: &mut Bus) -> u8 {
        match self.op_mode {
            AddrMode::IMP => unreachable!(),
            AddrMode::ACC => self.a,
            _ => bus.read(self.op_address),
        }
    }

    fn write_result(&mut self, bus: &mut Bus, v: u8) {
        if self.op_mode == AddrMode::ACC {
            self.a = v;
        } else {
            bus.write(self.op_address, v);
        }
    }

    fn tick_cross_page(&mut self) {
        if self.cross_page {
            self.extra += 1;
        }
    }

    fn undoc(&self, level: u8) -> bool {
        self.config.undocumented_level >= level
    }

    fn kil(&mut self, _: &mut Bus) {
        self.halt = Some(Halt::Kil);
        log::error!(
            "KIL opcode {:02X} at {:04X}, cpu halted",
            self.op,
            self.pc.wrapping_sub(1)
        );
    }

    fn nop(&mut self, _: &mut Bus) {
        // the absolute,X NOP variants pay the page-cross cycle
        if self.op_mode == AddrMode::ABX {
            self.tick_cross_page();
        }
    }
}

/// arith
impl Cpu {
    fn adc(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._adc(op);

        self.tick_cross_page();
    }

    fn sbc(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._adc(!op);

        self.tick_cross_page();
    }

    fn and(&mut self, bus: &mut Bus) {
        self.a &= self.get_operand(bus);
        self.p.set_zn(self.a);

        self.tick_cross_page();
    }

    fn ora(&mut self, bus: &mut Bus) {
        self.a |= self.get_operand(bus);
        self.p.set_zn(self.a);

        self.tick_cross_page();
    }

    fn eor(&mut self, bus: &mut Bus) {
        self.a ^= self.get_operand(bus);
        self.p.set_zn(self.a);

        self.tick_cross_page();
    }

    fn inc(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus).wrapping_add(1);
        bus.write(self.op_address, op);
        self.p.set_zn(op);
    }

    fn inx(&mut self, _: &mut Bus) {
        self.x = self.x.wrapping_add(1);
        self.p.set_zn(self.x);
    }

    fn iny(&mut self, _: &mut Bus) {
        self.y = self.y.wrapping_add(1);
        self.p.set_zn(self.y);
    }

    fn dec(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus).wrapping_sub(1);
        bus.write(self.op_address, op);
        self.p.set_zn(op);
    }

    fn dex(&mut self, _: &mut Bus) {
        self.x = self.x.wrapping_sub(1);
        self.p.set_zn(self.x);
    }

    fn dey(&mut self, _: &mut Bus) {
        self.y = self.y.wrapping_sub(1);
        self.p.set_zn(self.y);
    }

    fn rol(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        let op = self._rol(op);
        self.write_result(bus, op);
    }

    fn ror(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        let op = self._ror(op);
        self.write_result(bus, op);
    }

    fn asl(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        let op = self._asl(op);
        self.write_result(bus, op);
    }

    fn lsr(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        let op = self._lsr(op);
        self.write_result(bus, op);
    }
}

/// branch and jump
impl Cpu {
    fn brk(&mut self, bus: &mut Bus) {
        self.push_word(self.pc.wrapping_add(1), bus);
        // B is set only on the pushed copy
        self.push_byte(self.p.to_u8() | 0b0001_0000, bus);
        self.p.i = true;
        self.pc = self.read_word(0xfffe, bus);
    }

    fn bcc(&mut self, _: &mut Bus) {
        self._branch(!self.p.c);
    }

    fn bcs(&mut self, _: &mut Bus) {
        self._branch(self.p.c);
    }

    fn beq(&mut self, _: &mut Bus) {
        self._branch(self.p.z);
    }

    fn bmi(&mut self, _: &mut Bus) {
        self._branch(self.p.n);
    }

    fn bne(&mut self, _: &mut Bus) {
        self._branch(!self.p.z);
    }

    fn bpl(&mut self, _: &mut Bus) {
        self._branch(!self.p.n);
    }

    fn bvc(&mut self, _: &mut Bus) {
        self._branch(!self.p.v);
    }

    fn bvs(&mut self, _: &mut Bus) {
        self._branch(self.p.v);
    }

    fn jmp(&mut self, _: &mut Bus) {
        self.pc = self.op_address;
    }

    fn jsr(&mut self, bus: &mut Bus) {
        self.push_word(self.pc.wrapping_sub(1), bus);
        self.pc = self.op_address;
    }

    fn rti(&mut self, bus: &mut Bus) {
        self.p = self.pop_byte(bus).into();
        self.pc = self.pop_word(bus);
    }

    fn rts(&mut self, bus: &mut Bus) {
        self.pc = self.pop_word(bus).wrapping_add(1);
    }
}

/// move
impl Cpu {
    fn lda(&mut self, bus: &mut Bus) {
        self.a = self.get_operand(bus);
        self.p.set_zn(self.a);

        self.tick_cross_page();
    }

    fn ldx(&mut self, bus: &mut Bus) {
        self.x = self.get_operand(bus);
        self.p.set_zn(self.x);

        self.tick_cross_page();
    }

    fn ldy(&mut self, bus: &mut Bus) {
        self.y = self.get_operand(bus);
        self.p.set_zn(self.y);

        self.tick_cross_page();
    }

    fn pha(&mut self, bus: &mut Bus) {
        self.push_byte(self.a, bus);
    }

    fn php(&mut self, bus: &mut Bus) {
        self.push_byte(self.p.to_u8() | 0b0001_0000, bus);
    }

    fn pla(&mut self, bus: &mut Bus) {
        self.a = self.pop_byte(bus);
        self.p.set_zn(self.a);
    }

    fn plp(&mut self, bus: &mut Bus) {
        self.p = self.pop_byte(bus).into();
    }

    fn sta(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.a);
    }

    fn stx(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.x);
    }

    fn sty(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.y);
    }

    fn tax(&mut self, _: &mut Bus) {
        self.x = self.a;
        self.p.set_zn(self.x);
    }

    fn tay(&mut self, _: &mut Bus) {
        self.y = self.a;
        self.p.set_zn(self.y);
    }

    fn tsx(&mut self, _: &mut Bus) {
        self.x = self.sp;
        self.p.set_zn(self.x);
    }

    fn txs(&mut self, _: &mut Bus) {
        self.sp = self.x;
    }

    fn txa(&mut self, _: &mut Bus) {
        self.a = self.x;
        self.p.set_zn(self.a);
    }

    fn tya(&mut self, _: &mut Bus) {
        self.a = self.y;
        self.p.set_zn(self.a);
    }
}

/// flags
impl Cpu {
    fn bit(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self.p.z = (self.a & op) == 0;
        self.p.n = (op & 0x80) != 0;
        self.p.v = (op & 0x40) != 0;
    }

    fn cmp(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._cmp(self.a, op);

        self.tick_cross_page();
    }

    fn cpx(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._cmp(self.x, op);
    }

    fn cpy(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._cmp(self.y, op);
    }

    fn clc(&mut self, _: &mut Bus) {
        self.p.c = false;
    }

    fn cld(&mut self, _: &mut Bus) {
        self.p.d = false;
    }

    fn cli(&mut self, _: &mut Bus) {
        self.p.i = false;
    }

    fn clv(&mut self, _: &mut Bus) {
        self.p.v = false;
    }

    fn sec(&mut self, _: &mut Bus) {
        self.p.c = true;
    }

    fn sed(&mut self, _: &mut Bus) {
        self.p.d = true;
    }

    fn sei(&mut self, _: &mut Bus) {
        self.p.i = true;
    }
}

/// unofficial, level 1
impl Cpu {
    fn lax(&mut self, bus: &mut Bus) {
        if !self.undoc(1) {
            return;
        }
        self.a = self.get_operand(bus);
        self.x = self.a;
        self.p.set_zn(self.a);

        self.tick_cross_page();
    }

    fn sax(&mut self, bus: &mut Bus) {
        if !self.undoc(1) {
            return;
        }
        bus.write(self.op_address, self.a & self.x);
        if self.config.aax_sets_flags {
            self.p.set_zn(self.a & self.x);
        }
    }

    fn dcp(&mut self, bus: &mut Bus) {
        if !self.undoc(1) {
            return;
        }
        let op = self.get_operand(bus).wrapping_sub(1);
        bus.write(self.op_address, op);
        self._cmp(self.a, op);
    }

    fn isb(&mut self, bus: &mut Bus) {
        if !self.undoc(1) {
            return;
        }
        let op = self.get_operand(bus).wrapping_add(1);
        bus.write(self.op_address, op);
        self._adc(!op);
    }

    fn slo(&mut self, bus: &mut Bus) {
        if !self.undoc(1) {
            return;
        }
        let op = self.get_operand(bus);
        let op = self._asl(op);
        bus.write(self.op_address, op);
        self.a |= op;
        self.p.set_zn(self.a);
    }

    fn rla(&mut self, bus: &mut Bus) {
        if !self.undoc(1) {
            return;
        }
        let op = self.get_operand(bus);
        let op = self._rol(op);
        bus.write(self.op_address, op);
        self.a &= op;
        self.p.set_zn(self.a);
    }

    fn sre(&mut self, bus: &mut Bus) {
        if !self.undoc(1) {
            return;
        }
        let op = self.get_operand(bus);
        let op = self._lsr(op);
        bus.write(self.op_address, op);
        self.a ^= op;
        self.p.set_zn(self.a);
    }

    fn rra(&mut self, bus: &mut Bus) {
        if !self.undoc(1) {
            return;
        }
        let op = self.get_operand(bus);
        let op = self._ror(op);
        bus.write(self.op_address, op);
        self._adc(op);
    }
}

/// unofficial, level 2 (the rare and unstable ones)
impl Cpu {
    fn anc(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        self.a &= self.get_operand(bus);
        self.p.set_zn(self.a);
        self.p.c = (self.a & 0x80) != 0;
    }

    fn asr(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        self.a &= self.get_operand(bus);
        self.a = self._lsr(self.a);
    }

    fn arr(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        self.a &= self.get_operand(bus);
        self.a = (self.a >> 1) | ((self.p.c as u8) << 7);
        self.p.set_zn(self.a);
        self.p.c = (self.a & 0x40) != 0;
        self.p.v = ((self.a >> 6) ^ (self.a >> 5)) & 1 != 0;
    }

    fn xaa(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        self.a = self.x & self.get_operand(bus);
        self.p.set_zn(self.a);
    }

    fn atx(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        self.a &= self.get_operand(bus);
        self.x = self.a;
        self.p.set_zn(self.a);
    }

    fn axs(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        let op = self.get_operand(bus);
        let t = self.a & self.x;
        self.p.c = t >= op;
        self.x = t.wrapping_sub(op);
        self.p.set_zn(self.x);
    }

    fn axa(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        let v = self.a & self.x & ((self.op_address >> 8) as u8).wrapping_add(1);
        bus.write(self.op_address, v);
    }

    fn sxa(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        let v = self.x & ((self.op_address >> 8) as u8).wrapping_add(1);
        bus.write(self.op_address, v);
    }

    fn sya(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        let v = self.y & ((self.op_address >> 8) as u8).wrapping_add(1);
        bus.write(self.op_address, v);
    }

    fn xas(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        self.sp = self.a & self.x;
        let v = self.sp & ((self.op_address >> 8) as u8).wrapping_add(1);
        bus.write(self.op_address, v);
    }

    fn lar(&mut self, bus: &mut Bus) {
        if !self.undoc(2) {
            return;
        }
        let v = self.get_operand(bus) & self.sp;
        self.a = v;
        self.x = v;
        self.sp = v;
        self.p.set_zn(v);

        self.tick_cross_page();
    }
}

impl Cpu {
    fn _adc(&mut self, op: u8) {
        let sum = self.a as u16 + op as u16 + self.p.c as u16;

        self.p.c = sum > 0xff;
        self.p.v = (!(self.a ^ op) & (self.a ^ sum as u8) & 0x80) != 0;
        self.a = sum as u8;
        self.p.set_zn(self.a);
    }

    fn _branch(&mut self, taken: bool) {
        if taken {
            self.extra += 1;
            self.pc = self.op_address;
            self.tick_cross_page();
        }
    }

    fn _cmp(&mut self, a: u8, b: u8) {
        self.p.c = a >= b;
        self.p.z = a == b;
        self.p.n = (a.wrapping_sub(b) & 0x80) != 0;
    }

    fn _asl(&mut self, op: u8) -> u8 {
        self.p.c = (op & 0x80) != 0;
        let op = op << 1;
        self.p.set_zn(op);
        op
    }

    fn _lsr(&mut self, op: u8) -> u8 {
        self.p.c = (op & 0x01) != 0;
        let op = op >> 1;
        self.p.set_zn(op);
        op
    }

    fn _rol(&mut self, op: u8) -> u8 {
        let c = self.p.c as u8;
        self.p.c = (op & 0x80) != 0;
        let op = (op << 1) | c;
        self.p.set_zn(op);
        op
    }

    fn _ror(&mut self, op: u8) -> u8 {
        let c = self.p.c as u8;
        self.p.c = (op & 0x01) != 0;
        let op = (op >> 1) | (c << 7);
        self.p.set_zn(op);
        op
    }
}
