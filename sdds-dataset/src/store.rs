use std::ops::Range;

use sdds_dtype::{LongDouble, NativeScalar, SddsType};
use sdds_error::{sdds_bail, SddsResult};

use crate::Value;

/// Column storage for one column (or one array's elements): a tagged variant
/// holding a growable vector of the column's native Rust type.
///
/// This replaces byte-offset arithmetic over an untyped row block: row-major
/// and column-major access are expressed over the typed vectors instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnStore {
    /// `longdouble` elements.
    LongDouble(Vec<LongDouble>),
    /// `double` elements.
    Double(Vec<f64>),
    /// `float` elements.
    Float(Vec<f32>),
    /// `long64` elements.
    Long64(Vec<i64>),
    /// `ulong64` elements.
    ULong64(Vec<u64>),
    /// `long` elements.
    Long(Vec<i32>),
    /// `ulong` elements.
    ULong(Vec<u32>),
    /// `short` elements.
    Short(Vec<i16>),
    /// `ushort` elements.
    UShort(Vec<u16>),
    /// `string` elements. Null strings are carried as empty strings.
    String(Vec<String>),
    /// `character` elements.
    Character(Vec<u8>),
}

/// Dispatch over the numeric (fixed-width) variants of a [`ColumnStore`],
/// binding the inner vector. Panics on a string store; callers that can see
/// strings match [`ColumnStore::String`] first or use [`match_each_store`].
#[macro_export]
macro_rules! match_each_numeric_store {
    ($store:expr, |$vec:ident| $body:expr) => {{
        match $store {
            $crate::ColumnStore::LongDouble($vec) => $body,
            $crate::ColumnStore::Double($vec) => $body,
            $crate::ColumnStore::Float($vec) => $body,
            $crate::ColumnStore::Long64($vec) => $body,
            $crate::ColumnStore::ULong64($vec) => $body,
            $crate::ColumnStore::Long($vec) => $body,
            $crate::ColumnStore::ULong($vec) => $body,
            $crate::ColumnStore::Short($vec) => $body,
            $crate::ColumnStore::UShort($vec) => $body,
            $crate::ColumnStore::Character($vec) => $body,
            $crate::ColumnStore::String(_) => {
                ::sdds_error::sdds_panic!("string store has no fixed-width form")
            }
        }
    }};
}

/// Dispatch over every variant of a [`ColumnStore`], with a separate arm for
/// the string store.
#[macro_export]
macro_rules! match_each_store {
    ($store:expr, |$vec:ident| $numeric:expr, |$strings:ident| $string:expr) => {{
        match $store {
            $crate::ColumnStore::String($strings) => $string,
            other => $crate::match_each_numeric_store!(other, |$vec| $numeric),
        }
    }};
}

impl ColumnStore {
    /// An empty store for `dtype`.
    pub fn new(dtype: SddsType) -> Self {
        Self::with_capacity(dtype, 0)
    }

    /// An empty store for `dtype` with room for `capacity` elements.
    pub fn with_capacity(dtype: SddsType, capacity: usize) -> Self {
        match dtype {
            SddsType::LongDouble => Self::LongDouble(Vec::with_capacity(capacity)),
            SddsType::Double => Self::Double(Vec::with_capacity(capacity)),
            SddsType::Float => Self::Float(Vec::with_capacity(capacity)),
            SddsType::Long64 => Self::Long64(Vec::with_capacity(capacity)),
            SddsType::ULong64 => Self::ULong64(Vec::with_capacity(capacity)),
            SddsType::Long => Self::Long(Vec::with_capacity(capacity)),
            SddsType::ULong => Self::ULong(Vec::with_capacity(capacity)),
            SddsType::Short => Self::Short(Vec::with_capacity(capacity)),
            SddsType::UShort => Self::UShort(Vec::with_capacity(capacity)),
            SddsType::String => Self::String(Vec::with_capacity(capacity)),
            SddsType::Character => Self::Character(Vec::with_capacity(capacity)),
        }
    }

    /// The element type.
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

    /// Number of elements.
    pub fn len(&self) -> usize {
        match_each_store!(self, |v| v.len(), |s| s.len())
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the first `len` elements.
    pub fn truncate(&mut self, len: usize) {
        match_each_store!(self, |v| v.truncate(len), |s| s.truncate(len));
    }

    /// Remove all elements, keeping capacity.
    pub fn clear(&mut self) {
        match_each_store!(self, |v| v.clear(), |s| s.clear());
    }

    /// Reserve room for `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        match_each_store!(self, |v| v.reserve(additional), |s| s.reserve(additional));
    }

    /// Append a value, checking its type against the store's.
    pub fn push(&mut self, value: Value) -> SddsResult<()> {
        if value.dtype() != self.dtype() {
            sdds_bail!(
                "cannot push {} value into {} store",
                value.dtype(),
                self.dtype()
            );
        }
        match (self, value) {
            (Self::LongDouble(v), Value::LongDouble(x)) => v.push(x),
            (Self::Double(v), Value::Double(x)) => v.push(x),
            (Self::Float(v), Value::Float(x)) => v.push(x),
            (Self::Long64(v), Value::Long64(x)) => v.push(x),
            (Self::ULong64(v), Value::ULong64(x)) => v.push(x),
            (Self::Long(v), Value::Long(x)) => v.push(x),
            (Self::ULong(v), Value::ULong(x)) => v.push(x),
            (Self::Short(v), Value::Short(x)) => v.push(x),
            (Self::UShort(v), Value::UShort(x)) => v.push(x),
            (Self::String(v), Value::String(x)) => v.push(x),
            (Self::Character(v), Value::Character(x)) => v.push(x),
            // dtype equality above makes any other pairing unreachable
            _ => unreachable!(),
        }
        Ok(())
    }

    /// The element at `index`, cloned out as a [`Value`].
    pub fn get(&self, index: usize) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        Some(match self {
            Self::LongDouble(v) => Value::LongDouble(v[index]),
            Self::Double(v) => Value::Double(v[index]),
            Self::Float(v) => Value::Float(v[index]),
            Self::Long64(v) => Value::Long64(v[index]),
            Self::ULong64(v) => Value::ULong64(v[index]),
            Self::Long(v) => Value::Long(v[index]),
            Self::ULong(v) => Value::ULong(v[index]),
            Self::Short(v) => Value::Short(v[index]),
            Self::UShort(v) => Value::UShort(v[index]),
            Self::String(v) => Value::String(v[index].clone()),
            Self::Character(v) => Value::Character(v[index]),
        })
    }

    /// Reverse the byte order of every element in `rows`, in place.
    ///
    /// No-op for string stores; string payload bytes are never swapped.
    pub fn swap_byte_order(&mut self, rows: Range<usize>) {
        fn swap_range<T: NativeScalar>(vec: &mut [T], rows: Range<usize>) {
            for v in &mut vec[rows] {
                *v = v.swap_order();
            }
        }
        if matches!(self, Self::String(_)) {
            return;
        }
        match_each_numeric_store!(self, |v| swap_range(v, rows));
    }
}

macro_rules! store_accessors {
    ($(($variant:ident, $t:ty, $name:ident)),* $(,)?) => {
        paste::paste! {
            impl ColumnStore {
                $(
                    #[doc = concat!("The elements as a `", stringify!($t), "` slice, if this is a ", stringify!($name), " store.")]
                    pub fn [<as_ $name>](&self) -> Option<&[$t]> {
                        match self {
                            Self::$variant(v) => Some(v),
                            _ => None,
                        }
                    }

                    #[doc = concat!("Mutable access to the `", stringify!($t), "` vector, if this is a ", stringify!($name), " store.")]
                    pub fn [<as_ $name _mut>](&mut self) -> Option<&mut Vec<$t>> {
                        match self {
                            Self::$variant(v) => Some(v),
                            _ => None,
                        }
                    }
                )*
            }
        }
    };
}

store_accessors!(
    (LongDouble, LongDouble, long_double),
    (Double, f64, double),
    (Float, f32, float),
    (Long64, i64, long64),
    (ULong64, u64, ulong64),
    (Long, i32, long),
    (ULong, u32, ulong),
    (Short, i16, short),
    (UShort, u16, ushort),
    (String, String, string),
    (Character, u8, character),
);
