use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use sdds_error::{sdds_err, SddsError, SddsResult};

/// The closed set of scalar types an SDDS dataset can carry.
///
/// The discriminants are the integer type codes used in file headers and must
/// never change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive,
)]
#[repr(i32)]
pub enum SddsType {
    /// 80-bit extended-precision float, stored in its 16-byte memory form.
    LongDouble = 1,
    /// 64-bit IEEE float.
    Double = 2,
    /// 32-bit IEEE float.
    Float = 3,
    /// Signed 64-bit integer.
    Long64 = 4,
    /// Unsigned 64-bit integer.
    ULong64 = 5,
    /// Signed 32-bit integer.
    Long = 6,
    /// Unsigned 32-bit integer.
    ULong = 7,
    /// Signed 16-bit integer.
    Short = 8,
    /// Unsigned 16-bit integer.
    UShort = 9,
    /// Variable-length string, length-prefixed on the wire.
    String = 10,
    /// Single 8-bit character.
    Character = 11,
}

/// All scalar types, in type-code order.
pub const ALL_TYPES: [SddsType; 11] = [
    SddsType::LongDouble,
    SddsType::Double,
    SddsType::Float,
    SddsType::Long64,
    SddsType::ULong64,
    SddsType::Long,
    SddsType::ULong,
    SddsType::Short,
    SddsType::UShort,
    SddsType::String,
    SddsType::Character,
];

impl SddsType {
    /// The fixed wire width in bytes, or `None` for [`SddsType::String`],
    /// whose width is value-dependent.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::LongDouble => Some(16),
            Self::Double | Self::Long64 | Self::ULong64 => Some(8),
            Self::Float | Self::Long | Self::ULong => Some(4),
            Self::Short | Self::UShort => Some(2),
            Self::Character => Some(1),
            Self::String => None,
        }
    }

    /// Whether values of this type require byte-swapping in non-native mode.
    ///
    /// Strings are "multi-byte" only in their 4-byte length prefix; the
    /// payload bytes are never swapped.
    pub const fn is_multi_byte(self) -> bool {
        !matches!(self, Self::Character)
    }

    /// The header keyword for this type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::LongDouble => "longdouble",
            Self::Double => "double",
            Self::Float => "float",
            Self::Long64 => "long64",
            Self::ULong64 => "ulong64",
            Self::Long => "long",
            Self::ULong => "ulong",
            Self::Short => "short",
            Self::UShort => "ushort",
            Self::String => "string",
            Self::Character => "character",
        }
    }

    /// Parse a header keyword into a type.
    pub fn from_name(name: &str) -> SddsResult<Self> {
        ALL_TYPES
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| sdds_err!(DecodeError: "unknown SDDS type name {:?}", name))
    }
}

impl Display for SddsType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<&str> for SddsType {
    type Error = SddsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_name(value)
    }
}
