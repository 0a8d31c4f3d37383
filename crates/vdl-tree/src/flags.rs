//! Status bits the debugger attaches to locals, watches and chase results.

use std::ops::BitOr;

/// Backend status flags for one evaluated item.
///
/// Zero means the accompanying VDL is valid. Any other value means the
/// item could not be evaluated and only [`error_text`](Self::error_text)
/// should be shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ValueFlags(u32);

impl ValueFlags {
    /// The expression is not in scope at the current frame.
    pub const OUT_OF_SCOPE: Self = Self(0x01);
    /// The variable has not been allocated yet.
    pub const NOT_ALLOC: Self = Self(0x02);
    /// The value exceeds the debugger's maximum object size.
    pub const TOO_BIG: Self = Self(0x04);
    /// The value is not available (optimised out, no debug info).
    pub const NOT_AVAILABLE: Self = Self(0x08);
    /// Generic evaluation error.
    pub const ERROR: Self = Self(0x10);

    /// No flags set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wrap raw bits as sent by the backend.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bit value.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` when no status bit is set.
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// `true` when every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Text shown in place of the value, or `None` when no bit is set.
    ///
    /// The more specific conditions win over [`ERROR`](Self::ERROR), which
    /// the backend frequently sets alongside them.
    pub fn error_text(self) -> Option<&'static str> {
        if self.is_ok() {
            None
        } else if self.contains(Self::OUT_OF_SCOPE) {
            Some("<OUT_OF_SCOPE>")
        } else if self.contains(Self::NOT_ALLOC) {
            Some("<NOT_ALLOC>")
        } else if self.contains(Self::TOO_BIG) {
            Some("<TOO_BIG - Use \"Set Max Object Size\" to see expression value>")
        } else if self.contains(Self::NOT_AVAILABLE) {
            Some("<NOT_AVAILABLE>")
        } else {
            Some("<ERROR>")
        }
    }
}

impl BitOr for ValueFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
