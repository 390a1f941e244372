use super::*;

fn rom_with_page_markers(pages: usize) -> Vec<u8> {
    let mut rom = vec![0u8; pages * PAGE_SIZE];
    for page in 0..pages {
        rom[page * PAGE_SIZE] = page as u8;
    }
    rom
}

#[test]
fn translate_replaces_the_top_three_bits() {
    let mmr = [0xFF, 0xF8, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05];
    assert_eq!(translate(&mmr, 0x0000), 0x1F_E000);
    assert_eq!(translate(&mmr, 0x1C03), 0x1F_FC03);
    assert_eq!(translate(&mmr, 0x2010), 0x1F_0010);
    assert_eq!(translate(&mmr, 0x21FF), 0x1F_01FF);
    assert_eq!(translate(&mmr, 0xFFFE), 0x00_BFFE);
}

#[test]
fn translate_with_zeroed_mapper_hits_page_zero() {
    let mmr = [0u8; NUM_BANKS];
    for logical in [0x0000u16, 0x1FFE, 0x2000, 0xFFFE] {
        assert_eq!(translate(&mmr, logical), (logical & 0x1FFF) as u32);
    }
}

#[test]
fn flat_map_is_writable_everywhere() {
    let mut map = MemoryMap::flat();
    for addr in [0x00_0000u32, 0x0F_1234, 0x1F_FFFF] {
        map.write(addr, 0xA5);
        assert_eq!(map.read(addr), 0xA5);
    }
    assert_eq!(map.ram().len(), PHYSICAL_SIZE);
}

#[test]
fn physical_addresses_wrap_at_21_bits() {
    let mut map = MemoryMap::flat();
    map.write(0x20_0005, 0x42);
    assert_eq!(map.peek(0x00_0005), 0x42);

    map.load(0x1F_FFFF, &[0x11, 0x22]);
    assert_eq!(map.peek(0x1F_FFFF), 0x11);
    assert_eq!(map.peek(0x00_0000), 0x22);
}

#[test]
fn empty_map_reads_open_bus() {
    let mut map = MemoryMap::new();
    map.write(0x1000, 0x12);
    map.load(0x1000, &[0x34]);
    assert_eq!(map.read(0x1000), OPEN_BUS);
    assert_eq!(map.mapping(0x00), PageMapping::Unmapped);
}

#[test]
fn pc_engine_mirrors_power_of_two_rom() {
    let map = MemoryMap::pc_engine(&rom_with_page_markers(2)).expect("rom fits");
    assert_eq!(map.rom_pages(), 2);
    assert_eq!(map.peek(0x00_0000), 0);
    assert_eq!(map.peek(0x00_2000), 1);
    assert_eq!(map.peek(5 * PAGE_SIZE as u32), 1);
    assert_eq!(map.peek(0x7F * PAGE_SIZE as u32), 1);
}

#[test]
fn pc_engine_splits_odd_rom_at_bank_64() {
    // Three pages: the lower half mirrors pages 0-1, the upper half page 2.
    let map = MemoryMap::pc_engine(&rom_with_page_markers(3)).expect("rom fits");
    let page_marker = |bank: u32| map.peek(bank * PAGE_SIZE as u32);

    assert_eq!(page_marker(0), 0);
    assert_eq!(page_marker(1), 1);
    assert_eq!(page_marker(2), 0);
    assert_eq!(page_marker(63), 1);
    assert_eq!(page_marker(64), 2);
    assert_eq!(page_marker(0x7F), 2);
}

#[test]
fn pc_engine_work_ram_is_mirrored() {
    let mut map = MemoryMap::pc_engine(&rom_with_page_markers(1)).expect("rom fits");

    map.write(0x1F_0010, 0x5A);

    assert_eq!(map.peek(0x1F_2010), 0x5A);
    assert_eq!(map.peek(0x1F_6010), 0x5A);
    assert_eq!(map.ram().len(), PAGE_SIZE);
    assert_eq!(map.mapping(0xFC), PageMapping::Unmapped);
}

#[test]
fn pc_engine_leaves_hardware_page_open() {
    let mut map = MemoryMap::pc_engine(&rom_with_page_markers(1)).expect("rom fits");
    map.write(0x1F_E000, 0x12);
    assert_eq!(map.read(0x1F_E000), OPEN_BUS);
    assert_eq!(map.mapping(0xFF), PageMapping::Unmapped);
}

#[test]
fn pc_engine_rejects_rom_beyond_the_window() {
    let rom = vec![0u8; 0x80 * PAGE_SIZE + 1];
    match MemoryMap::pc_engine(&rom) {
        Err(Error::ImageTooLarge { len, capacity }) => {
            assert_eq!(len, rom.len());
            assert_eq!(capacity, 0x80 * PAGE_SIZE);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("oversized image accepted"),
    }
}

#[test]
fn rom_ignores_bus_writes_but_load_patches_it() {
    let mut map = MemoryMap::new();
    map.map_rom(0, &[0x10, 0x20, 0x30]).expect("rom fits");

    map.write(0x0001, 0xEE);
    assert_eq!(map.read(0x0001), 0x20);

    map.load(0x0001, &[0xEE]);
    assert_eq!(map.read(0x0001), 0xEE);
}

#[test]
fn map_rom_pads_the_last_page_with_open_bus() {
    let mut map = MemoryMap::new();
    map.map_rom(0x10, &[0xAA; 3]).expect("rom fits");

    assert_eq!(map.peek(0x10 * PAGE_SIZE as u32 + 2), 0xAA);
    assert_eq!(map.peek(0x10 * PAGE_SIZE as u32 + 3), OPEN_BUS);
    assert_eq!(map.mapping(0x10), PageMapping::Rom { base: 0 });
    assert_eq!(map.mapping(0x11), PageMapping::Unmapped);
}

#[test]
fn map_rom_rejects_images_past_the_last_page() {
    let mut map = MemoryMap::new();
    let result = map.map_rom(0xFF, &vec![0u8; PAGE_SIZE + 1]);
    assert!(matches!(
        result,
        Err(Error::ImageTooLarge { capacity, .. }) if capacity == PAGE_SIZE
    ));
}

#[test]
fn map_ram_allocates_fresh_pages() {
    let mut map = MemoryMap::new();
    map.map_ram(0xF8, 2);
    map.map_ram(0x00, 1);

    map.write(0x1F_0000, 1);
    map.write(0x1F_2000, 2);
    map.write(0x00_0000, 3);

    assert_eq!(map.ram().len(), 3 * PAGE_SIZE);
    assert_eq!(map.ram()[0], 1);
    assert_eq!(map.ram()[PAGE_SIZE], 2);
    assert_eq!(map.ram()[2 * PAGE_SIZE], 3);
}

#[test]
fn debug_read_has_no_side_effects() {
    let mut map = MemoryMap::flat();
    map.load(0x1234, &[0x77]);
    assert_eq!(map.debug_read(0x1234), 0x77);
    assert_eq!(map.peek(0x1234), 0x77);
}
