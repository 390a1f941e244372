pub const PAGE_SIZE: usize = 0x2000; // 8 KiB per bank
pub const NUM_BANKS: usize = 8;
pub const NUM_PHYSICAL_PAGES: usize = 0x100;
pub const PHYSICAL_SIZE: usize = PAGE_SIZE * NUM_PHYSICAL_PAGES;
pub const PHYSICAL_ADDRESS_MASK: u32 = (PHYSICAL_SIZE as u32) - 1;
/// Value returned for reads that hit nothing.
pub const OPEN_BUS: u8 = 0xFF;
const RAM_PAGE: u8 = 0xF8;
const RAM_MIRRORS: u8 = 4;
const HARDWARE_PAGE: u8 = 0xFF;
const ROM_WINDOW_PAGES: usize = 0x80;

mod mapping;

pub use self::mapping::PageMapping;
use crate::error::{Error, Result};

/// Physical side of the HuC6280 bus: 21-bit addresses, 8-bit data.
///
/// Implemented by whatever the owning machine wires up (RAM, ROM, mapped
/// devices). Several cores may drive the same implementation in turn; the
/// core never owns it.
pub trait Bus {
    fn read(&mut self, addr: u32) -> u8;
    fn write(&mut self, addr: u32, value: u8);

    /// Read for debugger use. Implementations with read side effects
    /// should override this to leave device state untouched.
    fn debug_read(&mut self, addr: u32) -> u8 {
        self.read(addr)
    }
}

/// Translate a 16-bit logical address through the memory mapper.
///
/// `mmr[addr >> 13]` supplies physical address bits 20..13, the low 13 bits
/// pass through untouched.
#[inline]
pub fn translate(mmr: &[u8; NUM_BANKS], logical: u16) -> u32 {
    let bank = mmr[(logical as usize) >> 13] as u32;
    (bank << 13) | (logical as u32 & (PAGE_SIZE as u32 - 1))
}

/// Page-granular memory map over the 2 MiB physical space.
/// Each of the 256 physical pages is backed by ROM, RAM, or nothing.
#[derive(Clone, bincode::Encode, bincode::Decode)]
pub struct MemoryMap {
    rom: Vec<u8>,
    ram: Vec<u8>,
    pages: Vec<PageMapping>,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMap {
    /// Every page unmapped; reads return [`OPEN_BUS`].
    pub fn new() -> Self {
        Self {
            rom: Vec::new(),
            ram: Vec::new(),
            pages: vec![PageMapping::Unmapped; NUM_PHYSICAL_PAGES],
        }
    }

    /// RAM across the whole physical space.
    pub fn flat() -> Self {
        let mut map = Self::new();
        map.map_ram(0, NUM_PHYSICAL_PAGES);
        map
    }

    /// PC Engine style layout: ROM mirrored over pages $00-$7F, 8 KiB work
    /// RAM at $F8 (mirrored through $FB), hardware page $FF left to the
    /// core's internal registers and open bus.
    pub fn pc_engine(rom: &[u8]) -> Result<Self> {
        let capacity = ROM_WINDOW_PAGES * PAGE_SIZE;
        if rom.len() > capacity {
            return Err(Error::ImageTooLarge {
                len: rom.len(),
                capacity,
            });
        }
        let mut map = Self::new();
        map.install_rom(rom)?;
        let rom_pages = map.rom_pages();
        if rom_pages > 0 {
            for page in 0..ROM_WINDOW_PAGES {
                let rom_page = Self::mirror_rom_bank(page, rom_pages);
                map.pages[page] = PageMapping::Rom {
                    base: rom_page * PAGE_SIZE,
                };
            }
        }
        let base = map.grow_ram(1);
        for mirror in 0..RAM_MIRRORS {
            map.pages[(RAM_PAGE + mirror) as usize] = PageMapping::Ram { base };
        }
        map.pages[HARDWARE_PAGE as usize] = PageMapping::Unmapped;
        Ok(map)
    }

    /// Back `page_count` pages starting at `first_page` with fresh RAM.
    pub fn map_ram(&mut self, first_page: usize, page_count: usize) {
        let end = (first_page + page_count).min(NUM_PHYSICAL_PAGES);
        if first_page >= end {
            return;
        }
        let base = self.grow_ram(end - first_page);
        for (index, page) in (first_page..end).enumerate() {
            self.pages[page] = PageMapping::Ram {
                base: base + index * PAGE_SIZE,
            };
        }
    }

    /// Map `data` as read-only pages starting at `first_page`. A trailing
    /// partial page is padded with [`OPEN_BUS`].
    pub fn map_rom(&mut self, first_page: usize, data: &[u8]) -> Result<()> {
        let capacity = NUM_PHYSICAL_PAGES.saturating_sub(first_page) * PAGE_SIZE;
        if data.len() > capacity {
            return Err(Error::ImageTooLarge {
                len: data.len(),
                capacity,
            });
        }
        let base = self.rom.len();
        self.install_rom(data)?;
        let pages = data.len().div_ceil(PAGE_SIZE);
        for index in 0..pages {
            self.pages[first_page + index] = PageMapping::Rom {
                base: base + index * PAGE_SIZE,
            };
        }
        Ok(())
    }

    /// Store bytes at a physical address regardless of mapping kind, so ROM
    /// images and vectors can be patched. Unmapped pages are skipped.
    pub fn load(&mut self, addr: u32, data: &[u8]) {
        let mut cursor = addr;
        for &byte in data {
            if let Some(slot) = self.slot_mut(cursor) {
                *slot = byte;
            }
            cursor = cursor.wrapping_add(1) & PHYSICAL_ADDRESS_MASK;
        }
    }

    /// Side-effect free read.
    pub fn peek(&self, addr: u32) -> u8 {
        let (mapping, offset) = self.resolve(addr);
        match mapping {
            PageMapping::Ram { base } => self.ram.get(base + offset).copied().unwrap_or(OPEN_BUS),
            PageMapping::Rom { base } => self.rom.get(base + offset).copied().unwrap_or(OPEN_BUS),
            PageMapping::Unmapped => OPEN_BUS,
        }
    }

    pub fn mapping(&self, page: u8) -> PageMapping {
        self.pages[page as usize]
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn rom_pages(&self) -> usize {
        self.rom.len() / PAGE_SIZE
    }

    fn install_rom(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > PHYSICAL_SIZE {
            return Err(Error::ImageTooLarge {
                len: data.len(),
                capacity: PHYSICAL_SIZE,
            });
        }
        self.rom.extend_from_slice(data);
        let padded = self.rom.len().div_ceil(PAGE_SIZE) * PAGE_SIZE;
        self.rom.resize(padded, OPEN_BUS);
        Ok(())
    }

    fn grow_ram(&mut self, pages: usize) -> usize {
        let base = self.ram.len();
        self.ram.resize(base + pages * PAGE_SIZE, 0);
        base
    }

    fn slot_mut(&mut self, addr: u32) -> Option<&mut u8> {
        match self.resolve(addr) {
            (PageMapping::Ram { base }, offset) => self.ram.get_mut(base + offset),
            (PageMapping::Rom { base }, offset) => self.rom.get_mut(base + offset),
            (PageMapping::Unmapped, _) => None,
        }
    }
}

impl Bus for MemoryMap {
    #[inline]
    fn read(&mut self, addr: u32) -> u8 {
        self.peek(addr)
    }

    fn debug_read(&mut self, addr: u32) -> u8 {
        self.peek(addr)
    }

    #[inline]
    fn write(&mut self, addr: u32, value: u8) {
        if let (PageMapping::Ram { base }, offset) = self.resolve(addr) {
            if let Some(slot) = self.ram.get_mut(base + offset) {
                *slot = value;
            }
        }
    }
}

#[cfg(test)]
mod tests;
