//! Serial number arithmetic (RFC 1982) for transfer and delivery ids

use std::{
    cmp::Ordering,
    fmt::Display,
    ops::{Add, AddAssign, Sub},
};

use crate::Error;

/// A 32-bit sequence number that wraps around.
///
/// Two numbers compare by the sign of their wrapping difference. When they are
/// exactly 2^31 apart the order is undefined and [`try_cmp`](Self::try_cmp)
/// fails instead of picking a direction, which is why the type does not
/// implement [`PartialOrd`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    /// Creates a new sequence number
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// The raw value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Signed distance from `other` to `self`
    pub fn difference(self, other: SequenceNumber) -> i32 {
        self.0.wrapping_sub(other.0) as i32
    }

    /// Compares two sequence numbers
    pub fn try_cmp(self, other: SequenceNumber) -> Result<Ordering, Error> {
        match self.difference(other) {
            i32::MIN => Err(Error::AmbiguousSequenceNumber(self.0, other.0)),
            diff => Ok(diff.cmp(&0)),
        }
    }

    /// Whether `self` comes before `other`
    pub fn is_before(self, other: SequenceNumber) -> Result<bool, Error> {
        self.try_cmp(other).map(Ordering::is_lt)
    }

    /// Whether `self` comes after `other`
    pub fn is_after(self, other: SequenceNumber) -> Result<bool, Error> {
        self.try_cmp(other).map(Ordering::is_gt)
    }

    /// Advances by one and returns the value before the increment
    pub fn increment(&mut self) -> SequenceNumber {
        let current = *self;
        self.0 = self.0.wrapping_add(1);
        current
    }
}

impl From<u32> for SequenceNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for u32 {
    fn from(value: SequenceNumber) -> Self {
        value.0
    }
}

impl Add<u32> for SequenceNumber {
    type Output = SequenceNumber;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.wrapping_add(rhs))
    }
}

impl AddAssign<u32> for SequenceNumber {
    fn add_assign(&mut self, rhs: u32) {
        self.0 = self.0.wrapping_add(rhs);
    }
}

impl Sub for SequenceNumber {
    type Output = i32;

    fn sub(self, rhs: Self) -> Self::Output {
        self.difference(rhs)
    }
}

impl Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
