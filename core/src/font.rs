//! PC Screen Font v1.
//!
//! Layout: two magic bytes `36 04`, a mode byte, a glyph height byte, then
//! the glyph bitmaps, one byte per row. Bit 0 of the mode selects 512 glyphs
//! instead of 256.

use crate::error::{BootError, Result};

pub const PSF1_MAGIC: [u8; 2] = [0x36, 0x04];
pub const PSF1_MODE_512: u8 = 0x01;
pub const PSF1_HEADER_SIZE: usize = 4;

/// Font files are read whole; anything larger is not a console font.
pub const MAX_FONT_FILE_SIZE: usize = 1 << 20;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Psf1Header {
    pub magic: [u8; 2],
    pub mode: u8,
    pub height: u8,
}

impl Psf1Header {
    pub fn glyph_count(&self) -> usize {
        if self.mode & PSF1_MODE_512 != 0 {
            512
        } else {
            256
        }
    }

    /// Size of the glyph bitmap that follows the header.
    pub fn glyph_bytes(&self) -> usize {
        self.glyph_count() * self.height as usize
    }
}

/// A validated font borrowed from the file buffer.
#[derive(Debug, Clone, Copy)]
pub struct Psf1Font<'a> {
    header: Psf1Header,
    glyphs: &'a [u8],
}

impl<'a> Psf1Font<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < PSF1_HEADER_SIZE || bytes[..2] != PSF1_MAGIC {
            return Err(BootError::InvalidFont);
        }

        let header = Psf1Header {
            magic: PSF1_MAGIC,
            mode: bytes[2],
            height: bytes[3],
        };
        let glyphs = bytes
            .get(PSF1_HEADER_SIZE..PSF1_HEADER_SIZE + header.glyph_bytes())
            .ok_or(BootError::InvalidFont)?;

        Ok(Self { header, glyphs })
    }

    pub fn header(&self) -> Psf1Header {
        self.header
    }

    pub fn glyphs(&self) -> &'a [u8] {
        self.glyphs
    }

    /// Bitmap of one glyph, `height` bytes.
    pub fn glyph(&self, index: usize) -> Option<&'a [u8]> {
        let height = self.header.height as usize;
        let start = index.checked_mul(height)?;
        self.glyphs.get(start..start + height)
    }
}
