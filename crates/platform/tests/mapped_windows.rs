//! Drivers over real mappings.
//! A temp file stands in for `/dev/mem`; offsets into it play the role of
//! physical addresses.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::io::{Read, Seek, SeekFrom};

use platform::gpio::{AltFunction, GpioConfigurator, PinFunction};
use platform::i2s::registers::{CS_A, CS_EN, CS_STBY, CS_SYNC, CS_TXON, MODE_A, TXC_A};
use platform::mapper::page_size;
use platform::mocks::{MockWindow, RecordingDelay};
use platform::{DevMem, I2sConfig, I2sController, MapError, RegisterWindow};

fn synthetic_memory(pages: usize) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    file.as_file().set_len((pages * page_size()) as u64).unwrap();
    file
}

fn word_at(file: &tempfile::NamedTempFile, offset: u64) -> u32 {
    let mut raw = file.reopen().unwrap();
    raw.seek(SeekFrom::Start(offset)).unwrap();
    let mut word = [0u8; 4];
    raw.read_exact(&mut word).unwrap();
    u32::from_ne_bytes(word)
}

#[test]
fn two_blocks_map_to_distinct_windows() {
    let file = synthetic_memory(4);
    let page = page_size() as u64;
    let mem = DevMem::open(file.path()).unwrap();

    let gpio = mem.open_peripheral(page, page_size()).unwrap();
    let pcm = mem.open_peripheral(3 * page, page_size()).unwrap();
    assert_ne!(gpio.base_address(), pcm.base_address());
    assert_eq!(gpio.physical_base(), page);
    assert_eq!(pcm.physical_base(), 3 * page);

    gpio.write(0, 0x1111_1111).unwrap();
    pcm.write(0, 0x2222_2222).unwrap();
    assert_eq!(gpio.read(0).unwrap(), 0x1111_1111);
    assert_eq!(pcm.read(0).unwrap(), 0x2222_2222);
    drop((gpio, pcm));

    assert_eq!(word_at(&file, page), 0x1111_1111);
    assert_eq!(word_at(&file, 3 * page), 0x2222_2222);
}

#[test]
fn pcm_pins_configured_through_a_mapping() {
    let file = synthetic_memory(2);
    let mem = DevMem::open(file.path()).unwrap();
    let gpio = mem.open_peripheral(page_size() as u64, page_size()).unwrap();

    GpioConfigurator::new(&gpio)
        .configure_alt_function(&platform::config::PCM_PINS, 0)
        .unwrap();

    let cfg = GpioConfigurator::new(&gpio);
    for pin in platform::config::PCM_PINS {
        assert_eq!(
            cfg.function_of(pin).unwrap(),
            PinFunction::Alt(AltFunction::Alt0)
        );
    }
    drop(gpio);
    // GPFSEL1 holds GPIO18/19 at bits 24 and 27.
    assert_eq!(word_at(&file, page_size() as u64 + 4), (4 << 24) | (4 << 27));
}

#[test]
fn i2s_setup_through_a_mapping() {
    let file = synthetic_memory(1);
    let mem = DevMem::open(file.path()).unwrap();
    let pcm = mem.open_peripheral(0, page_size()).unwrap();

    let report = I2sController::new(&pcm, RecordingDelay::new(), I2sConfig::default())
        .setup()
        .unwrap();

    // Plain memory echoes SYNC back, like a block with a running clock.
    assert!(report.sync_observed);
    let run_bits = CS_STBY | CS_SYNC | CS_EN | CS_TXON;
    assert_eq!(pcm.read(CS_A).unwrap() & run_bits, run_bits);
    assert_eq!(pcm.read(TXC_A).unwrap(), 0x4008_4108);
    assert_eq!(pcm.read(MODE_A).unwrap(), 0x7C00);
}

fn assert_round_trip<W: RegisterWindow>(window: &W) {
    for (index, value) in [(0usize, 0u32), (5, 0xDEAD_BEEF), (15, u32::MAX)] {
        window.write(index, value).unwrap();
        assert_eq!(window.read(index).unwrap(), value);
    }
    assert!(window.read(16).is_err());
}

#[test]
fn window_round_trip_on_mock_and_mapping() {
    let file = synthetic_memory(1);
    let mem = DevMem::open(file.path()).unwrap();
    assert_round_trip(&mem.open_peripheral(0, 64).unwrap());
    assert_round_trip(&MockWindow::new(16));
}

#[test]
fn non_page_multiple_base_never_maps() {
    let file = synthetic_memory(2);
    let mem = DevMem::open(file.path()).unwrap();
    let err = mem.open_peripheral(0x20_3004, 64).unwrap_err();
    assert!(matches!(err, MapError::InvalidRegion { .. }));
}
