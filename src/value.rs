//! Bit-vector values.
//!
//! A [`LogicValue`] is an unsigned binary vector of a given size. Bits are
//! indexed from the least significant one (index 0). A value of size 0 is the
//! *null* value: it stands for "undefined" and is what every operation returns
//! when its operands do not make sense together.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{Error, Result};

/// A fixed-but-resizable-width logic value.
///
/// Equality is only meaningful between values of the same size: values of
/// different sizes always compare unequal, and two null values are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LogicValue {
    /// Bits, least significant first.
    bits: Vec<bool>,
}

impl LogicValue {
    /// The null (undefined) value.
    pub const fn null() -> Self {
        Self { bits: Vec::new() }
    }

    /// All-zero vector of the given width.
    pub fn zeros(size: usize) -> Self {
        Self {
            bits: vec![false; size],
        }
    }

    /// All-one vector of the given width.
    pub fn ones(size: usize) -> Self {
        Self {
            bits: vec![true; size],
        }
    }

    /// Single-bit value.
    pub fn from_bool(bit: bool) -> Self {
        Self { bits: vec![bit] }
    }

    /// Builds a value from bits given least significant first.
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        Self {
            bits: bits.into_iter().collect(),
        }
    }

    /// Builds a value of width `size` from the low-order bits of `value`.
    pub fn from_u64(value: u64, size: usize) -> Self {
        Self::from_bits((0..size).map(|i| i < 64 && (value >> i) & 1 == 1))
    }

    /// Builds a value of width `size` from the low-order bits of `value`.
    pub fn from_biguint(value: &BigUint, size: usize) -> Self {
        Self::from_bits((0..size).map(|i| value.bit(i as u64)))
    }

    /// Parses a binary string, most significant bit first.
    ///
    /// Empty or malformed strings give the null value.
    pub fn from_string(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    pub fn size(&self) -> usize {
        self.bits.len()
    }

    /// Returns true for the size-0 value.
    pub fn is_null(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns true if every bit is 0 (the null value is not zero).
    pub fn is_zero(&self) -> bool {
        !self.is_null() && self.bits.iter().all(|b| !b)
    }

    /// Returns true for the 1-bit value `1`.
    pub fn is_true(&self) -> bool {
        self.bits == [true]
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn bit(&self, index: usize) -> Result<bool> {
        self.bits.get(index).copied().ok_or(Error::OutOfRange {
            index,
            size: self.size(),
        })
    }

    pub fn set_bit(&mut self, index: usize, bit: bool) -> Result<()> {
        let size = self.size();
        match self.bits.get_mut(index) {
            Some(b) => {
                *b = bit;
                Ok(())
            }
            None => Err(Error::OutOfRange { index, size }),
        }
    }

    /// Truncates or zero-extends at the most significant end.
    pub fn resize(&mut self, size: usize) {
        self.bits.resize(size, false);
    }

    /// Returns a copy resized to `size`.
    pub fn resized(&self, size: usize) -> Self {
        let mut value = self.clone();
        value.resize(size);
        value
    }

    /// Adds one, wrapping around modulo `2^size`.
    pub fn increment(&mut self) {
        for bit in self.bits.iter_mut() {
            *bit = !*bit;
            if *bit {
                break;
            }
        }
    }

    /// Subtracts one, wrapping around modulo `2^size`.
    pub fn decrement(&mut self) {
        for bit in self.bits.iter_mut() {
            *bit = !*bit;
            if !*bit {
                break;
            }
        }
    }

    /// Bits `right..=left` of the value.
    pub fn extract(&self, left: usize, right: usize) -> Result<Self> {
        if left >= self.size() {
            return Err(Error::OutOfRange {
                index: left,
                size: self.size(),
            });
        }
        if right > left {
            return Err(Error::OutOfRange {
                index: right,
                size: left + 1,
            });
        }
        Ok(Self::from_bits(self.bits[right..=left].iter().copied()))
    }

    /// Concatenation with `self` in the most significant position.
    pub fn concat(&self, low: &LogicValue) -> Self {
        let mut bits = low.bits.clone();
        bits.extend_from_slice(&self.bits);
        Self { bits }
    }

    /// Overwrites the bits addressed by `range` with `value`.
    pub fn write_range(&mut self, range: BitRange, value: &LogicValue) -> Result<()> {
        let (left, right) = range.bounds_in(self.size())?;
        let width = left - right + 1;
        if value.size() != width {
            return Err(Error::SizeMismatch {
                expected: width,
                found: value.size(),
            });
        }
        self.bits[right..=left].copy_from_slice(&value.bits);
        Ok(())
    }

    /// Bits addressed by `range`.
    pub fn read_range(&self, range: BitRange) -> Result<Self> {
        let (left, right) = range.bounds_in(self.size())?;
        self.extract(left, right)
    }

    /// Unsigned integer value, if the width fits in 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.is_null() || self.size() > 64 {
            return None;
        }
        Some(
            self.bits
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, &b)| acc | ((b as u64) << i)),
        )
    }

    /// Unsigned integer value of any width (null gives zero).
    pub fn to_biguint(&self) -> BigUint {
        let mut value = BigUint::zero();
        for (i, &b) in self.bits.iter().enumerate() {
            if b {
                value.set_bit(i as u64, true);
            }
        }
        value
    }

    fn zip_with(&self, rhs: &LogicValue, f: impl Fn(bool, bool) -> bool) -> LogicValue {
        if self.size() != rhs.size() {
            return LogicValue::null();
        }
        Self::from_bits(self.bits.iter().zip(&rhs.bits).map(|(&a, &b)| f(a, b)))
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.bits.iter().rev() {
            f.write_str(if b { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for LogicValue {
    type Err = Error;

    /// Strict parser: `0`/`1` only, most significant bit first.
    fn from_str(s: &str) -> Result<Self> {
        let mut bits = Vec::with_capacity(s.len());
        for c in s.chars().rev() {
            match c {
                '0' => bits.push(false),
                '1' => bits.push(true),
                other => return Err(Error::UnsupportedChar(other)),
            }
        }
        Ok(Self { bits })
    }
}

impl Not for &LogicValue {
    type Output = LogicValue;

    fn not(self) -> LogicValue {
        LogicValue::from_bits(self.bits.iter().map(|b| !b))
    }
}

impl Not for LogicValue {
    type Output = LogicValue;

    fn not(self) -> LogicValue {
        !&self
    }
}

impl BitAnd for &LogicValue {
    type Output = LogicValue;

    fn bitand(self, rhs: Self) -> LogicValue {
        self.zip_with(rhs, |a, b| a & b)
    }
}

impl BitOr for &LogicValue {
    type Output = LogicValue;

    fn bitor(self, rhs: Self) -> LogicValue {
        self.zip_with(rhs, |a, b| a | b)
    }
}

impl BitXor for &LogicValue {
    type Output = LogicValue;

    fn bitxor(self, rhs: Self) -> LogicValue {
        self.zip_with(rhs, |a, b| a ^ b)
    }
}

/// Addressing of bits inside a variable.
///
/// In the flat `(left, right)` form used by exporters, `-1` marks an unset
/// bound: `(-1, -1)` is the whole variable, `(l, -1)` the single bit `l`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BitRange {
    #[default]
    Whole,
    Bit(usize),
    /// Bits `right..=left`, with `left > right`.
    Slice { left: usize, right: usize },
}

impl BitRange {
    /// Range `right..=left`, collapsing to a single bit when both are equal.
    pub fn slice(left: usize, right: usize) -> Self {
        if left == right {
            BitRange::Bit(left)
        } else {
            BitRange::Slice { left, right }
        }
    }

    /// Decodes the flat form. Returns `None` for combinations that address nothing.
    pub fn from_bounds(left: i64, right: i64) -> Option<Self> {
        match (left, right) {
            (-1, -1) => Some(BitRange::Whole),
            (l, -1) if l >= 0 => Some(BitRange::Bit(l as usize)),
            (l, r) if r >= 0 && l >= r => Some(BitRange::slice(l as usize, r as usize)),
            _ => None,
        }
    }

    /// Flat `(left, right)` form.
    pub fn bounds(self) -> (i64, i64) {
        match self {
            BitRange::Whole => (-1, -1),
            BitRange::Bit(i) => (i as i64, -1),
            BitRange::Slice { left, right } => (left as i64, right as i64),
        }
    }

    /// Returns true if the range addresses existing bits of a `size`-bit value.
    pub fn fits(self, size: usize) -> bool {
        match self {
            BitRange::Whole => size > 0,
            BitRange::Bit(i) => i < size,
            BitRange::Slice { left, right } => left > right && left < size,
        }
    }

    /// Number of addressed bits within a `size`-bit value.
    pub fn width(self, size: usize) -> usize {
        match self {
            BitRange::Whole => size,
            BitRange::Bit(_) => 1,
            BitRange::Slice { left, right } => left.saturating_sub(right) + 1,
        }
    }

    /// Inclusive `(left, right)` bit indices inside a `size`-bit value.
    pub fn bounds_in(self, size: usize) -> Result<(usize, usize)> {
        if !self.fits(size) {
            let (left, right) = match self {
                BitRange::Whole => (0, 0),
                BitRange::Bit(i) => (i, i),
                BitRange::Slice { left, right } => (left, right),
            };
            return Err(Error::IllegalRange { left, right, size });
        }
        Ok(match self {
            BitRange::Whole => (size - 1, 0),
            BitRange::Bit(i) => (i, i),
            BitRange::Slice { left, right } => (left, right),
        })
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitRange::Whole => Ok(()),
            BitRange::Bit(i) => write!(f, "[{}]", i),
            BitRange::Slice { left, right } => write!(f, "[{}:{}]", left, right),
        }
    }
}
