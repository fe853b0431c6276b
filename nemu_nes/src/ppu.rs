use bit_field::BitField;
use serde::{Deserialize, Serialize};

use crate::cart::Cartridge;
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};
use palettes::NES_PALETTE;
use regs::{PpuCtrl, PpuMask, PpuStatus, ShiftReg, VramAddr};
use vram::{Vram, VramState};

mod palettes;
mod regs;
mod vram;

const OAM_SIZE: usize = 0x100;
const DOTS_PER_LINE: usize = 341;
const LINES_PER_FRAME: usize = 262;
const VBLANK_LINE: usize = 241;
const PRERENDER_LINE: usize = 261;

/// PPUCTRL writes are dropped for the first 29658 CPU cycles
const CTRL_WARMUP: u64 = 29658 * 3;

/// sprite fetch window, dots 257..=324
const A12_WINDOW: usize = 68;

/// decoded pattern row of one active sprite for the next scanline
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
struct Sprite {
    x: u8,
    pattern: [u8; 8],
    palette: u8,
    behind: bool,
    zero: bool,
}

/// the four background + four sprite palettes, decoded from palette RAM
/// on demand and invalidated by palette writes
#[derive(Debug, Clone)]
struct PaletteCache {
    colors: [[u8; 4]; 8],
    valid: [bool; 8],
}

impl Default for PaletteCache {
    fn default() -> Self {
        Self {
            colors: [[0; 4]; 8],
            valid: [false; 8],
        }
    }
}

impl PaletteCache {
    fn get(&mut self, vram: &Vram, id: usize) -> [u8; 4] {
        if !self.valid[id] {
            let mut colors = [0u8; 4];
            for (i, c) in colors.iter_mut().enumerate() {
                *c = vram.palette(id * 4 + i);
            }
            self.colors[id] = colors;
            self.valid[id] = true;
        }
        self.colors[id]
    }

    fn invalidate(&mut self) {
        self.valid = [false; 8];
    }
}

pub struct Ppu {
    vram: Vram,
    oam: Box<[u8; OAM_SIZE]>,

    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    oam_addr: u8,
    data_buf: u8,
    io_latch: u8,

    v: VramAddr,
    t: VramAddr,
    x: u16,
    w: bool,

    shift: ShiftReg,
    pal_latch: [[u8; 4]; 2],

    sprites: [Sprite; 8],
    sprite_count: usize,
    sprite_banks: [bool; 8],
    a12_triggers: [bool; A12_WINDOW],

    pal_cache: PaletteCache,

    line: usize,
    dot: usize,
    frame: u64,
    cycles: u64,
    nmi: bool,
    frame_done: bool,

    frame_buf: Box<[u32; SCREEN_WIDTH * SCREEN_HEIGHT]>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self {
            vram: Vram::default(),
            oam: Box::new([0u8; OAM_SIZE]),

            ctrl: PpuCtrl::default(),
            mask: PpuMask::default(),
            status: PpuStatus::default(),
            oam_addr: 0,
            data_buf: 0,
            io_latch: 0,

            v: VramAddr::default(),
            t: VramAddr::default(),
            x: 0,
            w: false,

            shift: ShiftReg::default(),
            pal_latch: [[0; 4]; 2],

            sprites: [Sprite::default(); 8],
            sprite_count: 0,
            sprite_banks: [false; 8],
            a12_triggers: [false; A12_WINDOW],

            pal_cache: PaletteCache::default(),

            line: 0,
            dot: 0,
            frame: 0,
            cycles: 0,
            nmi: false,
            frame_done: false,

            frame_buf: Box::new([0u32; SCREEN_WIDTH * SCREEN_HEIGHT]),
        }
    }
}

impl Ppu {
    pub fn run(&mut self, cart: &mut Cartridge, dots: u32) {
        for _ in 0..dots {
            self.tick(cart);
        }
    }

    fn tick(&mut self, cart: &mut Cartridge) {
        self.cycles += 1;
        let rendering = self.mask.rendering();

        match self.line {
            0..=239 => self.visible_dot(cart, rendering),
            VBLANK_LINE => {
                if self.dot == 1 {
                    self.status.set_vblank(true);
                    self.frame_done = true;
                    if self.ctrl.nmi_on() {
                        self.nmi = true;
                    }
                }
            }
            PRERENDER_LINE => self.prerender_dot(cart, rendering),
            _ => {}
        }

        // odd frames drop the last dot of the pre-render line
        let line_dots = if self.line == PRERENDER_LINE && rendering && self.frame & 1 == 1 {
            DOTS_PER_LINE - 1
        } else {
            DOTS_PER_LINE
        };

        self.dot += 1;
        if self.dot >= line_dots {
            self.dot = 0;
            self.line += 1;
            if self.line == LINES_PER_FRAME {
                self.line = 0;
                self.frame += 1;
            }
        }
    }

    fn visible_dot(&mut self, cart: &mut Cartridge, rendering: bool) {
        if !rendering {
            if (1..=256).contains(&self.dot) {
                let backdrop = self.vram.palette(0);
                self.put_pixel(self.dot - 1, backdrop);
            }
            return;
        }

        match self.dot {
            1..=256 => {
                let px = self.dot - 1;
                if px > 0 && px % 8 == 0 {
                    self.shift_and_fetch(cart);
                }
                self.draw_pixel(px);
                if self.dot == 256 {
                    self.v.inc_y();
                }
            }
            257 => {
                self.v.copy_vx(self.t);
                self.eval_sprites(cart);
            }
            321 | 329 => self.shift_and_fetch(cart),
            _ => {}
        }

        self.a12_tick(cart);
    }

    fn prerender_dot(&mut self, cart: &mut Cartridge, rendering: bool) {
        if self.dot == 1 {
            self.status.set_vblank(false);
            self.status.set_sp0_hit(false);
            self.status.set_sp_overflow(false);
        }
        if !rendering {
            return;
        }

        match self.dot {
            256 => self.v.inc_y(),
            257 => {
                self.v.copy_vx(self.t);
                // no sprite evaluation here, so no sprites on line 0
                self.sprite_count = 0;
                self.sprite_banks =
                    [self.ctrl.sp_size() == 16 || self.ctrl.sp_pattern_table() != 0; 8];
                self.compute_a12_triggers();
            }
            280 => self.v.copy_vy(self.t),
            321 | 329 => self.shift_and_fetch(cart),
            _ => {}
        }

        self.a12_tick(cart);
    }

    /// move to the next tile strip: drop the finished byte, fetch the
    /// nametable/attribute/pattern bytes for the strip after it
    fn shift_and_fetch(&mut self, cart: &mut Cartridge) {
        self.shift.shift_tile();
        self.pal_latch[0] = self.pal_latch[1];

        let tile = self.vram.read(cart, self.v.tile_addr());
        let attr = self.vram.read(cart, self.v.attr_addr());
        let shift = ((self.v.coarse_y() & 0b10) << 1) | (self.v.coarse_x() & 0b10);
        let pal_id = ((attr >> shift) & 0b11) as usize;
        self.pal_latch[1] = self.pal_cache.get(&self.vram, pal_id);

        let base = self.ctrl.bg_pattern_table() + tile as u16 * 16 + self.v.fine_y();
        let p0 = self.vram.read(cart, base);
        let p1 = self.vram.read(cart, base + 8);
        self.shift.load(p0, p1);

        self.v.inc_coarse_x();
    }

    fn draw_pixel(&mut self, px: usize) {
        let index = px % 8 + self.x as usize;
        let bg = if self.mask.show_bg() && (px >= 8 || self.mask.show_bg_left()) {
            self.shift.get(index)
        } else {
            0
        };

        let mut color = if bg != 0 {
            self.pal_latch[index / 8][bg as usize]
        } else {
            self.vram.palette(0)
        };

        if self.mask.show_sp() && (px >= 8 || self.mask.show_sp_left()) {
            for i in 0..self.sprite_count {
                let s = self.sprites[i];
                let sx = s.x as usize;
                if px < sx || px >= sx + 8 {
                    continue;
                }
                let v = s.pattern[px - sx];
                if v == 0 {
                    continue;
                }

                if s.zero && bg != 0 && px != 255 {
                    self.status.set_sp0_hit(true);
                }
                if bg == 0 || !s.behind {
                    color = self.pal_cache.get(&self.vram, 4 + s.palette as usize)[v as usize];
                }
                // the foremost opaque sprite decides; the rest are hidden
                break;
            }
        }

        self.put_pixel(px, color);
    }

    fn put_pixel(&mut self, px: usize, color_index: u8) {
        let index = if self.mask.grey_scale() {
            color_index & 0x30
        } else {
            color_index
        };
        self.frame_buf[self.line * SCREEN_WIDTH + px] = NES_PALETTE[(index & 0x3f) as usize];
    }

    /// scan OAM for up to eight sprites on the next scanline and decode
    /// their pattern rows
    fn eval_sprites(&mut self, cart: &mut Cartridge) {
        let height = self.ctrl.sp_size();
        let double = height == 16;
        let line = self.line;

        self.sprite_count = 0;
        // unfilled slots fetch tile 0xff (bank 1 in 8x16 mode)
        self.sprite_banks = [double || self.ctrl.sp_pattern_table() != 0; 8];

        for n in 0..64 {
            let base = n * 4;
            let y = self.oam[base] as usize;
            if !(y <= line && line < y + height) {
                continue;
            }
            if self.sprite_count == 8 {
                self.status.set_sp_overflow(true);
                break;
            }

            let tile = self.oam[base + 1];
            let attr = self.oam[base + 2];

            let mut row = (line - y) as u16;
            let tile_base = if double {
                if attr.get_bit(7) {
                    row = 15 - row;
                }
                let mut tile_ix = (tile & 0xfe) as u16;
                if row >= 8 {
                    tile_ix += 1;
                    row -= 8;
                }
                self.sprite_banks[self.sprite_count] = tile & 1 != 0;
                (tile & 1) as u16 * 0x1000 + tile_ix * 16
            } else {
                if attr.get_bit(7) {
                    row = 7 - row;
                }
                self.ctrl.sp_pattern_table() + tile as u16 * 16
            };

            let p0 = self.vram.read(cart, tile_base + row);
            let p1 = self.vram.read(cart, tile_base + 8 + row);

            let flip_h = attr.get_bit(6);
            let mut pattern = [0u8; 8];
            for bit in 0..8 {
                let v = (p0.get_bit(bit) as u8) | ((p1.get_bit(bit) as u8) << 1);
                pattern[if flip_h { bit } else { 7 - bit }] = v;
            }

            self.sprites[self.sprite_count] = Sprite {
                x: self.oam[base + 3],
                pattern,
                palette: attr & 0b11,
                behind: attr.get_bit(5),
                zero: n == 0,
            };
            self.sprite_count += 1;
        }

        self.compute_a12_triggers();
    }

    /// which dots of the sprite fetch window raise A12; recomputed per
    /// scanline from the fetch slots' pattern banks
    fn compute_a12_triggers(&mut self) {
        let mut triggers = [false; A12_WINDOW];
        let mut level = self.ctrl.bg_pattern_table() != 0;

        for (i, &bank) in self.sprite_banks.iter().enumerate() {
            if bank && !level {
                triggers[i * 8 + 4] = true;
            }
            level = bank;
        }
        // dot 321 returns the bus to background fetches
        if self.ctrl.bg_pattern_table() != 0 && !level {
            triggers[64] = true;
        }

        self.a12_triggers = triggers;
    }

    fn a12_tick(&mut self, cart: &mut Cartridge) {
        if (257..257 + A12_WINDOW).contains(&self.dot) && self.a12_triggers[self.dot - 257] {
            cart.irq_tick();
        }
    }
}

impl Ppu {
    pub fn read_reg(&mut self, cart: &mut Cartridge, addr: u16) -> u8 {
        match (addr - 0x2000) & 0x07 {
            0x02 => {
                let b = self.status.get() | (self.io_latch & 0b0001_1111);
                self.status.set_vblank(false);
                self.w = false;
                self.io_latch = b;
                b
            }
            0x04 => {
                let b = self.oam[self.oam_addr as usize];
                self.io_latch = b;
                b
            }
            0x07 => {
                let addr = self.v.addr();
                let b = if addr < 0x3f00 {
                    let data = self.data_buf;
                    self.data_buf = self.vram.read(cart, addr);
                    data
                } else {
                    // palette reads bypass the buffer; the buffer picks
                    // up the nametable byte underneath
                    self.data_buf = self.vram.read(cart, addr - 0x1000);
                    self.vram.read(cart, addr)
                };
                self.increment_vram(cart);
                self.io_latch = b;
                b
            }
            _ => {
                log::debug!("read of write-only ppu register {:04x}", addr);
                self.io_latch
            }
        }
    }

    pub fn write_reg(&mut self, cart: &mut Cartridge, addr: u16, data: u8) {
        self.io_latch = data;
        match (addr - 0x2000) & 0x07 {
            0x00 => {
                if self.cycles < CTRL_WARMUP {
                    return;
                }
                let nmi_was_on = self.ctrl.nmi_on();
                self.ctrl.set(data);
                self.t.set_nm(self.ctrl.nametable());
                // enabling NMI during vblank fires one immediately
                if self.status.vblank() && self.ctrl.nmi_on() && !nmi_was_on {
                    self.nmi = true;
                }
            }
            0x01 => self.mask.set(data),
            0x02 => {}
            0x03 => self.oam_addr = data,
            0x04 => {
                self.oam[self.oam_addr as usize] = data;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            0x05 => {
                if !self.w {
                    self.t.set_coarse_x((data >> 3) as u16);
                    self.x = (data & 0b0111) as u16;
                } else {
                    self.t.set_coarse_y((data >> 3) as u16);
                    self.t.set_fine_y((data & 0b0111) as u16);
                }
                self.w = !self.w;
            }
            0x06 => {
                if !self.w {
                    self.t.set_bits(0x08..0x0f, (data & 0b0011_1111) as u16);
                } else {
                    self.t.set_bits(0x00..0x08, data as u16);
                    self.v = self.t;
                }
                self.w = !self.w;
            }
            0x07 => {
                let addr = self.v.addr();
                self.vram.write(cart, addr, data);
                if addr >= 0x3f00 {
                    self.pal_cache.invalidate();
                }
                self.increment_vram(cart);
            }
            _ => unreachable!(),
        }
    }

    fn increment_vram(&mut self, cart: &mut Cartridge) {
        let before = self.v.addr();
        self.v.inc(self.ctrl.addr_inc());
        let after = self.v.addr();
        if before & 0x1000 == 0 && after & 0x1000 != 0 {
            cart.irq_tick();
        }
    }

    pub fn write_oam(&mut self, addr: u8, data: u8) {
        self.oam[addr as usize] = data;
    }

    pub fn oam_addr(&self) -> u8 {
        self.oam_addr
    }

    pub fn frame(&self) -> &[u32] {
        &self.frame_buf[..]
    }

    pub(crate) fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi)
    }

    pub(crate) fn take_frame_done(&mut self) -> bool {
        std::mem::take(&mut self.frame_done)
    }

    pub fn reset(&mut self) {
        *self = Ppu::default();
    }
}

impl Ppu {
    pub(crate) fn save_state(&self) -> PpuState {
        PpuState {
            vram: self.vram.save_state(),
            oam: self.oam.to_vec(),
            ctrl: self.ctrl.get(),
            mask: self.mask.get(),
            status: self.status.get(),
            oam_addr: self.oam_addr,
            data_buf: self.data_buf,
            io_latch: self.io_latch,
            v: self.v,
            t: self.t,
            x: self.x,
            w: self.w,
            shift: self.shift,
            pal_latch: self.pal_latch,
            sprites: self.sprites,
            sprite_count: self.sprite_count,
            sprite_banks: self.sprite_banks,
            a12_triggers: self.a12_triggers.to_vec(),
            line: self.line,
            dot: self.dot,
            frame: self.frame,
            cycles: self.cycles,
            nmi: self.nmi,
            frame_done: self.frame_done,
        }
    }

    pub(crate) fn load_state(&mut self, state: &PpuState) -> bool {
        if !self.vram.load_state(&state.vram)
            || state.oam.len() != OAM_SIZE
            || state.a12_triggers.len() != A12_WINDOW
        {
            return false;
        }
        self.oam.copy_from_slice(&state.oam);
        self.ctrl.set(state.ctrl);
        self.mask.set(state.mask);
        self.status.load(state.status);
        self.oam_addr = state.oam_addr;
        self.data_buf = state.data_buf;
        self.io_latch = state.io_latch;
        self.v = state.v;
        self.t = state.t;
        self.x = state.x;
        self.w = state.w;
        self.shift = state.shift;
        self.pal_latch = state.pal_latch;
        self.sprites = state.sprites;
        self.sprite_count = state.sprite_count;
        self.sprite_banks = state.sprite_banks;
        self.a12_triggers.copy_from_slice(&state.a12_triggers);
        self.line = state.line;
        self.dot = state.dot;
        self.frame = state.frame;
        self.cycles = state.cycles;
        self.nmi = state.nmi;
        self.frame_done = state.frame_done;
        self.pal_cache.invalidate();
        true
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct PpuState {
    vram: VramState,
    oam: Vec<u8>,
    ctrl: u8,
    mask: u8,
    status: u8,
    oam_addr: u8,
    data_buf: u8,
    io_latch: u8,
    v: VramAddr,
    t: VramAddr,
    x: u16,
    w: bool,
    shift: ShiftReg,
    pal_latch: [[u8; 4]; 2],
    sprites: [Sprite; 8],
    sprite_count: usize,
    sprite_banks: [bool; 8],
    a12_triggers: Vec<bool>,
    line: usize,
    dot: usize,
    frame: u64,
    cycles: u64,
    nmi: bool,
    frame_done: bool,
}
