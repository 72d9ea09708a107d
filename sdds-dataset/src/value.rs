use std::fmt::{Display, Formatter};

use sdds_dtype::{LongDouble, SddsType};

/// A single scalar value of one of the supported SDDS types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An 80-bit extended float in its opaque 16-byte form.
    LongDouble(LongDouble),
    /// A 64-bit float.
    Double(f64),
    /// A 32-bit float.
    Float(f32),
    /// A signed 64-bit integer.
    Long64(i64),
    /// An unsigned 64-bit integer.
    ULong64(u64),
    /// A signed 32-bit integer.
    Long(i32),
    /// An unsigned 32-bit integer.
    ULong(u32),
    /// A signed 16-bit integer.
    Short(i16),
    /// An unsigned 16-bit integer.
    UShort(u16),
    /// A string. A "null" string is represented as the empty string; the two
    /// encode identically (zero length prefix) on the wire.
    String(String),
    /// A single 8-bit character.
    Character(u8),
}

impl Value {
    /// The wire type of this value.
    pub const fn dtype(&self) -> SddsType {
        match self {
            Self::LongDouble(_) => SddsType::LongDouble,
            Self::Double(_) => SddsType::Double,
            Self::Float(_) => SddsType::Float,
            Self::Long64(_) => SddsType::Long64,
            Self::ULong64(_) => SddsType::ULong64,
            Self::Long(_) => SddsType::Long,
            Self::ULong(_) => SddsType::ULong,
            Self::Short(_) => SddsType::Short,
            Self::UShort(_) => SddsType::UShort,
            Self::String(_) => SddsType::String,
            Self::Character(_) => SddsType::Character,
        }
    }

    /// The zero/empty value for a type.
    pub fn default_for(dtype: SddsType) -> Self {
        match dtype {
            SddsType::LongDouble => Self::LongDouble(LongDouble::default()),
            SddsType::Double => Self::Double(0.0),
            SddsType::Float => Self::Float(0.0),
            SddsType::Long64 => Self::Long64(0),
            SddsType::ULong64 => Self::ULong64(0),
            SddsType::Long => Self::Long(0),
            SddsType::ULong => Self::ULong(0),
            SddsType::Short => Self::Short(0),
            SddsType::UShort => Self::UShort(0),
            SddsType::String => Self::String(String::new()),
            SddsType::Character => Self::Character(0),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LongDouble(v) => write!(f, "{v:?}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Long64(v) => write!(f, "{v}"),
            Self::ULong64(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::ULong(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::UShort(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Character(v) => write!(f, "{}", *v as char),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from!(
    LongDouble => LongDouble,
    f64 => Double,
    f32 => Float,
    i64 => Long64,
    u64 => ULong64,
    i32 => Long,
    u32 => ULong,
    i16 => Short,
    u16 => UShort,
    String => String,
    u8 => Character,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}
