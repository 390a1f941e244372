use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum PageMapping {
    Unmapped,
    Rom { base: usize },
    Ram { base: usize },
}

impl MemoryMap {
    pub(super) fn resolve(&self, addr: u32) -> (PageMapping, usize) {
        let addr = (addr & PHYSICAL_ADDRESS_MASK) as usize;
        let index = addr >> 13;
        let offset = addr & (PAGE_SIZE - 1);
        (self.pages[index], offset)
    }

    /// Map a logical ROM bank number to a physical ROM page, handling
    /// mirroring for non-power-of-2 ROM sizes.
    ///
    /// Power-of-2 images simply wrap. Otherwise the 128-bank window is split
    /// at bank 64: the lower half mirrors the largest power-of-2 prefix of
    /// the image, the upper half mirrors the remainder.
    pub(super) fn mirror_rom_bank(logical: usize, rom_pages: usize) -> usize {
        if rom_pages == 0 {
            return 0;
        }
        if rom_pages.is_power_of_two() {
            return logical % rom_pages;
        }
        let lower = rom_pages.next_power_of_two() >> 1;
        let upper = rom_pages - lower;

        let bank = logical & 0x7F;
        if bank < 64 {
            bank % lower.max(1)
        } else {
            ((bank - 64) % upper.max(1)) + lower
        }
    }
}
