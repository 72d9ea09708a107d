use std::fmt::{Debug, Formatter};

/// An 80-bit extended-precision float in its 16-byte x86-64 memory form.
///
/// Rust has no native `f80`, so values are carried opaquely: they round-trip
/// bit-exactly through the binary codec but support no arithmetic. The
/// padding bytes (10..16) are preserved as read.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct LongDouble([u8; 16]);

impl LongDouble {
    /// The in-memory and on-wire width.
    pub const WIDTH: usize = 16;

    /// Wrap a raw 16-byte representation.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw 16-byte representation.
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Byte-swapped copy, used by the non-native codec paths.
    pub fn swapped(self) -> Self {
        let mut bytes = self.0;
        bytes.reverse();
        Self(bytes)
    }
}

impl Debug for LongDouble {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LongDouble(0x")?;
        for b in self.0.iter().rev() {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}
