use crate::{LongDouble, SddsType};

/// A Rust scalar that maps 1:1 onto a fixed-width SDDS wire type.
///
/// Implementors provide native-order byte conversion and whole-value byte
/// reversal, which together form the non-string half of the scalar codec.
pub trait NativeScalar: Copy + Default + PartialEq + std::fmt::Debug + 'static {
    /// The wire type this scalar encodes as.
    const DTYPE: SddsType;
    /// The fixed wire width in bytes.
    const WIDTH: usize;

    /// Write the value's native-order bytes into `out`, which must be exactly
    /// [`Self::WIDTH`] long.
    fn write_native(self, out: &mut [u8]);

    /// Read a value from exactly [`Self::WIDTH`] native-order bytes.
    fn from_native(bytes: &[u8]) -> Self;

    /// The value with its byte order reversed.
    fn swap_order(self) -> Self;
}

macro_rules! native_int {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl NativeScalar for $t {
                const DTYPE: SddsType = SddsType::$dtype;
                const WIDTH: usize = size_of::<$t>();

                fn write_native(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }

                fn from_native(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_ne_bytes(raw)
                }

                fn swap_order(self) -> Self {
                    self.swap_bytes()
                }
            }
        )*
    };
}

native_int!(
    i16 => Short,
    u16 => UShort,
    i32 => Long,
    u32 => ULong,
    i64 => Long64,
    u64 => ULong64,
    u8 => Character,
);

macro_rules! native_float {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl NativeScalar for $t {
                const DTYPE: SddsType = SddsType::$dtype;
                const WIDTH: usize = size_of::<$t>();

                fn write_native(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }

                fn from_native(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_ne_bytes(raw)
                }

                fn swap_order(self) -> Self {
                    <$t>::from_bits(self.to_bits().swap_bytes())
                }
            }
        )*
    };
}

native_float!(
    f32 => Float,
    f64 => Double,
);

impl NativeScalar for LongDouble {
    const DTYPE: SddsType = SddsType::LongDouble;
    const WIDTH: usize = LongDouble::WIDTH;

    fn write_native(self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_bytes());
    }

    fn from_native(bytes: &[u8]) -> Self {
        let mut raw = [0u8; LongDouble::WIDTH];
        raw.copy_from_slice(bytes);
        Self::from_bytes(raw)
    }

    fn swap_order(self) -> Self {
        self.swapped()
    }
}
