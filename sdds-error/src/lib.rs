#![deny(missing_docs)]

//! Error types and helpers shared across the SDDS crates.
//!
//! The conventions mirror the rest of the workspace: fallible functions return
//! [`SddsResult`], errors are raised with [`sdds_err`]/[`sdds_bail`], and
//! unrecoverable programming errors go through [`sdds_panic`] so they carry a
//! formatted message rather than a bare panic.

use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::io;

/// An owned-or-static error message.
#[derive(Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        Self(msg.into())
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// The top-level error type for the SDDS crates.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum SddsError {
    /// A caller-supplied argument was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(ErrString),
    /// Bytes were available but violated a structural invariant of the wire
    /// format (negative length, over-ceiling row count, and so on).
    #[error("decode error: {0}")]
    DecodeError(ErrString),
    /// Fewer bytes were transferred than requested, and the channel was not
    /// at end-of-file. Kept distinct from [`SddsError::IoError`] so callers
    /// can treat a truncated tail differently from a failed syscall.
    #[error("truncated transfer: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the caller asked for.
        expected: usize,
        /// Bytes actually moved.
        actual: usize,
    },
    /// Zero bytes were available where more were expected. Distinct from
    /// [`SddsError::Truncated`]: the channel hit end-of-file, not a partial
    /// transfer.
    #[error("unexpected end of file: expected {expected} more bytes")]
    UnexpectedEof {
        /// Bytes the caller asked for.
        expected: usize,
    },
    /// The requested operation is not supported by this build.
    #[error("not implemented: {0}")]
    NotImplemented(ErrString),
    /// An operating-system level I/O failure.
    #[error(transparent)]
    IoError(#[from] io::Error),
    /// An error wrapped with additional context.
    #[error("{0}: {1}")]
    Context(ErrString, Box<SddsError>),
}

impl SddsError {
    /// Wrap this error with a context message.
    pub fn with_context(self, msg: impl Into<ErrString>) -> Self {
        Self::Context(msg.into(), Box::new(self))
    }
}

/// A [`Result`] whose error type is [`SddsError`].
pub type SddsResult<T> = Result<T, SddsError>;

#[doc(hidden)]
#[allow(clippy::panic)]
pub fn __panic(err: SddsError) -> ! {
    panic!("{err}")
}

/// Construct an [`SddsError`].
///
/// `sdds_err!("bad {}", x)` builds an `InvalidArgument`; a leading variant
/// name selects another message-carrying variant, e.g.
/// `sdds_err!(DecodeError: "negative length {}", len)`.
#[macro_export]
macro_rules! sdds_err {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::SddsError::$variant(format!($fmt $(, $arg)*).into())
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::SddsError::InvalidArgument(format!($fmt $(, $arg)*).into())
    };
}

/// Return early with an [`SddsError`], `bail!`-style.
#[macro_export]
macro_rules! sdds_bail {
    ($($tt:tt)+) => {
        return Err($crate::sdds_err!($($tt)+))
    };
}

/// Panic with a formatted [`SddsError`]. Reserved for unreachable states and
/// violated internal invariants; recoverable failures use [`sdds_bail`].
#[macro_export]
macro_rules! sdds_panic {
    ($($tt:tt)+) => {
        $crate::__panic($crate::sdds_err!($($tt)+))
    };
}

/// Unwrap with a static message, funneling through [`SddsError`] formatting.
///
/// The workspace denies `expect_used`; this is the one sanctioned escape
/// hatch for conditions the caller has already checked.
pub trait SddsExpect {
    /// The unwrapped type.
    type Output;

    /// Unwrap or panic with `msg`.
    fn sdds_expect(self, msg: &'static str) -> Self::Output;
}

impl<T> SddsExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    fn sdds_expect(self, msg: &'static str) -> T {
        self.unwrap_or_else(|| sdds_panic!("{}", msg))
    }
}

impl<T, E: Display> SddsExpect for Result<T, E> {
    type Output = T;

    #[inline(always)]
    fn sdds_expect(self, msg: &'static str) -> T {
        self.unwrap_or_else(|e| sdds_panic!("{}: {}", msg, e))
    }
}

/// Unwrap a result whose error is already an [`SddsError`]-convertible
/// infallible conversion failure, e.g. lossless integer casts.
pub trait SddsUnwrap {
    /// The unwrapped type.
    type Output;

    /// Unwrap, panicking with the underlying error on failure.
    fn sdds_unwrap(self) -> Self::Output;
}

impl<T, E: Display> SddsUnwrap for Result<T, E> {
    type Output = T;

    #[inline(always)]
    fn sdds_unwrap(self) -> T {
        self.unwrap_or_else(|e| sdds_panic!("{}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails() -> SddsResult<()> {
        sdds_bail!(DecodeError: "negative length {}", -4)
    }

    #[test]
    fn bail_formats_variant() {
        let err = fails().unwrap_err();
        assert!(matches!(err, SddsError::DecodeError(_)));
        assert_eq!(err.to_string(), "decode error: negative length -4");
    }

    #[test]
    fn context_chains() {
        let err = fails().unwrap_err().with_context("reading page title");
        assert_eq!(
            err.to_string(),
            "reading page title: decode error: negative length -4"
        );
    }
}
