//! Firmware text console, used as the log sink until boot services end.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::SimpleTextOutputProtocol;

/// EFI_LIGHTCYAN on EFI_BLACK
const ATTRIBUTE_LIGHT_CYAN: usize = 0x0B;

const CHUNK: usize = 128;

static CON_OUT: AtomicPtr<SimpleTextOutputProtocol> = AtomicPtr::new(ptr::null_mut());

/// Reset the console and make it the output for [`write_line`].
pub fn attach(con_out: *mut SimpleTextOutputProtocol) {
    if con_out.is_null() {
        return;
    }
    // SAFETY: non-null ConOut from the system table, boot services live
    unsafe {
        ((*con_out).reset)(con_out, false);
        ((*con_out).set_attribute)(con_out, ATTRIBUTE_LIGHT_CYAN);
    }
    CON_OUT.store(con_out, Ordering::Release);
}

/// Stop writing to the console for the rest of the boot. Called before
/// ExitBootServices, whatever its outcome.
pub fn detach() {
    CON_OUT.store(ptr::null_mut(), Ordering::Release);
}

fn str_to_ucs2<I: Iterator<Item = char>>(chars: &mut I, buf: &mut [u16; CHUNK]) -> bool {
    let mut i = 0;
    let mut more = false;
    for ch in chars.by_ref() {
        buf[i] = if (ch as u32) < 0x1_0000 { ch as u16 } else { b'?' as u16 };
        i += 1;
        if i == CHUNK - 1 {
            more = true;
            break;
        }
    }
    buf[i] = 0;
    more
}

/// Write one line followed by CRLF. Does nothing once detached.
pub fn write_line(line: &str) {
    let con_out = CON_OUT.load(Ordering::Acquire);
    if con_out.is_null() {
        return;
    }

    let mut buf = [0u16; CHUNK];
    let mut chars = line.chars().chain("\r\n".chars());
    loop {
        let more = str_to_ucs2(&mut chars, &mut buf);
        // SAFETY: console is attached only while boot services are live
        unsafe {
            ((*con_out).output_string)(con_out, buf.as_ptr());
        }
        if !more {
            break;
        }
    }
}
