//! Hex dump formatting for trace logs

use std::fmt;

const BYTES_PER_LINE: usize = 16;

/// Display adapter printing bytes as offset, hex and ASCII columns
///
/// Formatting happens only when the value is displayed, so passing it to a
/// disabled `trace!` costs nothing.
#[derive(Clone, Copy)]
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, chunk) in self.0.chunks(BYTES_PER_LINE).enumerate() {
            if line > 0 {
                writeln!(f)?;
            }
            write!(f, "{:08x} ", line * BYTES_PER_LINE)?;

            for i in 0..BYTES_PER_LINE {
                match chunk.get(i) {
                    Some(b) => write!(f, " {:02x}", b)?,
                    None => write!(f, "   ")?,
                }
            }

            write!(f, "  ")?;
            for &b in chunk {
                let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' };
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
