//! Sega Master System / Game Gear memory map: cartridge ROM behind the Sega mapper, 8 KB of
//! system RAM mirrored across $C000-$FFFF, and the handful of registers carved out of the top of
//! that mirror that the mapper intercepts instead of passing through to RAM.

use bincode::{Decode, Encode};

const RAM_LEN: usize = 8 * 1024;
const PAGE_LEN: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
struct MapperRegisters {
    ram_mapped: bool,
    ram_bank: u8,
    page_0: u8,
    page_1: u8,
    page_2: u8,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Memory {
    rom: Vec<u8>,
    ram: Box<[u8; RAM_LEN]>,
    cartridge_ram: Vec<u8>,
    cartridge_ram_dirty: bool,
    mapper: MapperRegisters,
}

impl Memory {
    #[must_use]
    pub fn new(rom: Vec<u8>, cartridge_ram: Option<Vec<u8>>) -> Self {
        Self {
            rom,
            ram: Box::new([0; RAM_LEN]),
            cartridge_ram: cartridge_ram.unwrap_or_default(),
            cartridge_ram_dirty: false,
            mapper: MapperRegisters::default(),
        }
    }

    #[must_use]
    pub fn clone_without_rom(&self) -> Self {
        Self {
            rom: Vec::new(),
            ..self.clone()
        }
    }

    pub fn take_rom_from(&mut self, other: &mut Self) {
        self.rom = std::mem::take(&mut other.rom);
    }

    #[must_use]
    pub fn take_cartridge_rom_and_ram(&mut self) -> (Vec<u8>, Vec<u8>) {
        (std::mem::take(&mut self.rom), std::mem::take(&mut self.cartridge_ram))
    }

    fn rom_page(&self, page: u8, address: u16) -> u8 {
        if self.rom.is_empty() {
            return 0xFF;
        }
        let page_count = (self.rom.len() / PAGE_LEN).max(1) as u8;
        let page = page % page_count;
        let offset = usize::from(page) * PAGE_LEN + (address as usize & (PAGE_LEN - 1));
        self.rom.get(offset).copied().unwrap_or(0xFF)
    }

    pub fn read(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x03FF => self.rom_page(0, address),
            0x0400..=0x3FFF => self.rom_page(self.mapper.page_0, address),
            0x4000..=0x7FFF => self.rom_page(self.mapper.page_1, address),
            0x8000..=0xBFFF => {
                if self.mapper.ram_mapped && !self.cartridge_ram.is_empty() {
                    let bank_len = self.cartridge_ram.len().min(PAGE_LEN);
                    let offset =
                        usize::from(self.mapper.ram_bank) * PAGE_LEN + (address as usize & (PAGE_LEN - 1));
                    self.cartridge_ram[offset % bank_len.max(1)]
                } else {
                    self.rom_page(self.mapper.page_2, address)
                }
            }
            0xC000..=0xFFFB => self.ram[(address as usize - 0xC000) & (RAM_LEN - 1)],
            0xFFFC => self.mapper_control_byte(),
            0xFFFD => self.mapper.page_0,
            0xFFFE => self.mapper.page_1,
            0xFFFF => self.mapper.page_2,
        }
    }

    fn mapper_control_byte(&self) -> u8 {
        (u8::from(self.mapper.ram_mapped) << 3) | (self.mapper.ram_bank << 2)
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0xBFFF => {
                // Cartridge ROM is not writable; Codemasters-style mappers that redirect writes
                // in this range are out of scope.
            }
            0xC000..=0xFFFB => {
                self.ram[(address as usize - 0xC000) & (RAM_LEN - 1)] = value;
            }
            0xFFFC => {
                self.mapper.ram_mapped = value & 0x08 != 0;
                self.mapper.ram_bank = (value >> 2) & 0x01;
                if !self.cartridge_ram.is_empty() {
                    self.cartridge_ram_dirty = true;
                }
            }
            0xFFFD => self.mapper.page_0 = value,
            0xFFFE => self.mapper.page_1 = value,
            0xFFFF => self.mapper.page_2 = value,
        }
    }

    #[must_use]
    pub fn cartridge_has_battery(&self) -> bool {
        !self.cartridge_ram.is_empty()
    }

    #[must_use]
    pub fn cartridge_ram_dirty(&self) -> bool {
        self.cartridge_ram_dirty
    }

    pub fn clear_cartridge_ram_dirty(&mut self) {
        self.cartridge_ram_dirty = false;
    }

    #[must_use]
    pub fn cartridge_ram(&self) -> &[u8] {
        &self.cartridge_ram
    }
}
