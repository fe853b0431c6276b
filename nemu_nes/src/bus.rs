use crate::apu::Apu;
use crate::cart::Cartridge;
use crate::interrupt::{DmaKind, Interrupts};
use crate::ppu::Ppu;

pub use joystick::Joystick;

mod joystick;

const RAM_SIZE: usize = 0x0800;

/// CPU-visible address space: internal RAM, PPU registers, APU and IO
/// registers, cartridge. Also drives the per-instruction device
/// catch-up and the OAM DMA engine.
pub struct Bus {
    ram: Box<[u8; RAM_SIZE]>,

    ppu: Ppu,
    apu: Apu,
    cart: Cartridge,
    joystick: Joystick,

    pub(crate) intr: Interrupts,
}

impl Bus {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            ram: Box::new([0u8; RAM_SIZE]),

            ppu: Ppu::default(),
            apu: Apu::default(),
            cart,
            joystick: Joystick::default(),

            intr: Interrupts::default(),
        }
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1fff => self.ram[addr as usize & (RAM_SIZE - 1)],
            0x2000..=0x3fff => self.ppu.read_reg(&mut self.cart, addr),
            0x4015 => self.apu.read_status(),
            0x4016..=0x4017 => self.joystick.read(addr),
            0x4000..=0x401f => {
                // write-only and unused IO space reads as open bus
                log::debug!("open bus read at {:04x}", addr);
                0x00
            }
            0x4020..=0xffff => self.cart.read(addr),
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1fff => self.ram[addr as usize & (RAM_SIZE - 1)] = data,
            0x2000..=0x3fff => self.ppu.write_reg(&mut self.cart, addr, data),
            0x4014 => self.oam_dma(data),
            0x4016 => self.joystick.write_strobe(data),
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, data),
            0x4018..=0x401f => {}
            0x4020..=0xffff => self.cart.write(addr, data),
        }
    }

    /// side-effect-free view for tracing and debuggers
    pub fn inspect(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1fff => self.ram[addr as usize & (RAM_SIZE - 1)],
            0x4020..=0xffff => self.cart.read(addr),
            _ => 0x00,
        }
    }

    /// copy a page into OAM over the live bus, then request the pause
    fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        let start = self.ppu.oam_addr();
        for i in 0..256u16 {
            let data = self.read(base + i);
            self.ppu.write_oam(start.wrapping_add(i as u8), data);
        }
        self.intr.raise_dma(DmaKind::Oam, 256);
    }

    /// let the PPU (3x) and APU (1x) catch up after a CPU step, then
    /// collect whatever interrupts and DMA traffic they produced
    pub(crate) fn run_devices(&mut self, cycles: u32, in_oam_dma: bool) {
        self.ppu.run(&mut self.cart, cycles * 3);
        if self.ppu.take_nmi() {
            self.intr.nmi = true;
        }
        if self.cart.poll_irq() {
            self.intr.irq = true;
        }

        self.apu.run(cycles);
        if self.apu.irq() {
            self.intr.irq = true;
        }
        if let Some(addr) = self.apu.dmc_request() {
            let data = self.read(addr);
            self.apu.dmc_response(data);
            let kind = if in_oam_dma {
                DmaKind::DmcDuringOam
            } else {
                DmaKind::Dmc
            };
            self.intr.raise_dma(kind, 1);
        }
    }

    pub fn set_buttons(&mut self, pad0: u8, pad1: u8) {
        self.joystick.set_buttons(pad0, pad1);
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub(crate) fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    pub(crate) fn apu_mut(&mut self) -> &mut Apu {
        &mut self.apu
    }

    pub fn cart(&self) -> &Cartridge {
        &self.cart
    }

    pub(crate) fn cart_mut(&mut self) -> &mut Cartridge {
        &mut self.cart
    }

    pub(crate) fn ram(&self) -> &[u8] {
        &self.ram[..]
    }

    pub(crate) fn load_ram(&mut self, data: &[u8]) -> bool {
        if data.len() != RAM_SIZE {
            return false;
        }
        self.ram.copy_from_slice(data);
        true
    }

    pub(crate) fn joystick_mut(&mut self) -> &mut Joystick {
        &mut self.joystick
    }

    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.ppu.reset();
        self.apu.reset();
        self.joystick = Joystick::default();
        self.intr = Interrupts::default();
    }
}
