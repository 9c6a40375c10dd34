//! Format detection tests

mod common;

use common::builder::flat_image;
use common::ElfBuilder;
use lodestar_core::image::{detect, FlatImage, ImageFormat};

#[test]
fn test_built_elf_is_elf64() {
    let image = ElfBuilder::new().load(0x1000, 0x40_0000, &[0x90; 16], 0x20).build();
    assert_eq!(detect(&image), ImageFormat::Elf64);
}

#[test]
fn test_elf32_class_is_unsupported() {
    let image = ElfBuilder::new().class(1).build();
    assert_eq!(detect(&image), ImageFormat::UnsupportedElf { class: 1 });
}

#[test]
fn test_flat_image_entry_at_0x24() {
    // First 4 bytes are not the ELF magic, first 2 are 0x8664
    let image = flat_image(0x200, 0x0150);
    assert_ne!(&image[..4], b"\x7fELF");
    assert_eq!(detect(&image), ImageFormat::FlatX86_64);

    let flat = FlatImage::parse(&image).expect("flat image parses");
    assert_eq!(flat.entry_offset(), 0x0150);
    assert_eq!(flat.entry_address(), image.as_ptr() as u64 + 0x150);
}

#[test]
fn test_garbage_is_unrecognized() {
    let image: Vec<u8> = (0..0x100u32).map(|i| (i * 7 + 3) as u8).collect();
    assert_eq!(detect(&image), ImageFormat::Unrecognized);
}

#[test]
fn test_detection_is_deterministic() {
    let images = [
        ElfBuilder::new().build(),
        flat_image(0x40, 0x30),
        vec![0u8; 0x40],
        vec![0x7f, b'E'],
    ];

    for image in &images {
        let first = detect(image);
        let copy = image.clone();
        for _ in 0..4 {
            assert_eq!(detect(image), first);
        }
        assert_eq!(&copy, image);
    }
}

#[test]
fn test_0x27_bytes_is_too_short() {
    let image = flat_image(0x40, 0x30);
    assert_eq!(detect(&image[..0x27]), ImageFormat::Unrecognized);
    assert_eq!(detect(&image[..0x28]), ImageFormat::FlatX86_64);
}
