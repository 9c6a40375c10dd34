//! Synthetic ELF64 image builder

use lodestar_core::image::elf::{
    ELFDATA2LSB, ELF_HEADER_SIZE, PROGRAM_HEADER_SIZE, PT_LOAD,
};
use lodestar_core::image::{ELFCLASS64, ELF_MAGIC};

struct Segment {
    kind: u32,
    flags: u32,
    offset: u64,
    vaddr: u64,
    filesz: u64,
    memsz: u64,
    align: u64,
    bytes: Vec<u8>,
}

pub struct ElfBuilder {
    entry: u64,
    class: u8,
    data: u8,
    phentsize: u16,
    phoff: Option<u64>,
    phnum: Option<u16>,
    segments: Vec<Segment>,
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self {
            entry: 0x40_0000,
            class: ELFCLASS64,
            data: ELFDATA2LSB,
            phentsize: PROGRAM_HEADER_SIZE as u16,
            phoff: None,
            phnum: None,
            segments: Vec::new(),
        }
    }

    pub fn entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    #[allow(dead_code)]
    pub fn class(mut self, class: u8) -> Self {
        self.class = class;
        self
    }

    #[allow(dead_code)]
    pub fn data_encoding(mut self, data: u8) -> Self {
        self.data = data;
        self
    }

    /// Override the declared program-header count without adding entries.
    #[allow(dead_code)]
    pub fn declared_phnum(mut self, phnum: u16) -> Self {
        self.phnum = Some(phnum);
        self
    }

    #[allow(dead_code)]
    pub fn phoff(mut self, phoff: u64) -> Self {
        self.phoff = Some(phoff);
        self
    }

    /// LOAD segment whose file bytes are `bytes`, placed at `offset`.
    pub fn load(self, offset: u64, vaddr: u64, bytes: &[u8], memsz: u64) -> Self {
        self.segment(PT_LOAD, 0x5, offset, vaddr, bytes, memsz)
    }

    /// Any program-header entry. `filesz` is `bytes.len()`.
    pub fn segment(
        mut self,
        kind: u32,
        flags: u32,
        offset: u64,
        vaddr: u64,
        bytes: &[u8],
        memsz: u64,
    ) -> Self {
        self.segments.push(Segment {
            kind,
            flags,
            offset,
            vaddr,
            filesz: bytes.len() as u64,
            memsz,
            align: 0x1000,
            bytes: bytes.to_vec(),
        });
        self
    }

    /// LOAD entry with raw sizes and no backing bytes written.
    #[allow(dead_code)]
    pub fn raw_load(mut self, offset: u64, vaddr: u64, filesz: u64, memsz: u64) -> Self {
        self.segments.push(Segment {
            kind: PT_LOAD,
            flags: 0x4,
            offset,
            vaddr,
            filesz,
            memsz,
            align: 0x1000,
            bytes: Vec::new(),
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let phoff = self.phoff.unwrap_or(ELF_HEADER_SIZE as u64);
        let phnum = self.phnum.unwrap_or(self.segments.len() as u16);
        let table_end = phoff as usize + self.segments.len() * PROGRAM_HEADER_SIZE;

        let data_end = self
            .segments
            .iter()
            .map(|s| s.offset as usize + s.bytes.len())
            .max()
            .unwrap_or(0);
        let mut image = vec![0u8; table_end.max(data_end).max(ELF_HEADER_SIZE)];

        image[..4].copy_from_slice(&ELF_MAGIC);
        image[4] = self.class;
        image[5] = self.data;
        image[6] = 1;
        image[0x10..0x12].copy_from_slice(&2u16.to_le_bytes());
        image[0x12..0x14].copy_from_slice(&62u16.to_le_bytes());
        image[0x14..0x18].copy_from_slice(&1u32.to_le_bytes());
        image[0x18..0x20].copy_from_slice(&self.entry.to_le_bytes());
        image[0x20..0x28].copy_from_slice(&phoff.to_le_bytes());
        image[0x34..0x36].copy_from_slice(&(ELF_HEADER_SIZE as u16).to_le_bytes());
        image[0x36..0x38].copy_from_slice(&self.phentsize.to_le_bytes());
        image[0x38..0x3a].copy_from_slice(&phnum.to_le_bytes());

        for (i, s) in self.segments.iter().enumerate() {
            let at = phoff as usize + i * PROGRAM_HEADER_SIZE;
            let record = &mut image[at..at + PROGRAM_HEADER_SIZE];
            record[0..4].copy_from_slice(&s.kind.to_le_bytes());
            record[4..8].copy_from_slice(&s.flags.to_le_bytes());
            record[8..16].copy_from_slice(&s.offset.to_le_bytes());
            record[16..24].copy_from_slice(&s.vaddr.to_le_bytes());
            record[24..32].copy_from_slice(&s.vaddr.to_le_bytes());
            record[32..40].copy_from_slice(&s.filesz.to_le_bytes());
            record[40..48].copy_from_slice(&s.memsz.to_le_bytes());
            record[48..56].copy_from_slice(&s.align.to_le_bytes());
        }

        for s in &self.segments {
            let at = s.offset as usize;
            image[at..at + s.bytes.len()].copy_from_slice(&s.bytes);
        }

        image
    }
}

/// Flat x86-64 image of `len` bytes with its entry offset at 0x24.
#[allow(dead_code)]
pub fn flat_image(len: usize, entry_offset: u16) -> Vec<u8> {
    let mut image = vec![0u8; len];
    image[0..2].copy_from_slice(&0x8664u16.to_le_bytes());
    image[0x24..0x26].copy_from_slice(&entry_offset.to_le_bytes());
    image
}

/// PSF1 font with recognisable glyph bytes.
#[allow(dead_code)]
pub fn psf1_font(mode: u8, height: u8) -> Vec<u8> {
    let glyphs = if mode & 1 != 0 { 512 } else { 256 };
    let mut font = vec![0x36, 0x04, mode, height];
    font.extend((0..glyphs * height as usize).map(|i| (i % 251) as u8));
    font
}
