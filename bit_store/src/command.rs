//! Command model shared by every [`BitStore`](crate::BitStore) backend.
//!
//! The types here mirror the argument grammar of the bit commands
//! (`BITFIELD`, `BITOP`, `BITCOUNT`, `BITPOS`) so that the in-memory engine
//! and the wire client interpret a request the same way.
//!
//! ```rust
//! use bit_store::{FieldOp, FieldType, Offset, Overflow};
//!
//! let ty: FieldType = "u12".parse().unwrap();
//! let ops = [
//!     FieldOp::Overflow(Overflow::Sat),
//!     FieldOp::IncrBy { ty, offset: Offset::Index(2), delta: 7 },
//! ];
//! assert_eq!(ops[1].to_args(), vec!["INCRBY", "u12", "#2", "7"]);
//! ```

use core::fmt;
use core::str::FromStr;

use crate::StoreError;

/// Largest unsigned width the store accepts for a bitfield segment.
pub const MAX_FIELD_BITS: u8 = 63;

/// Bits addressable in one value (512 MiB). Every bit touched by a command
/// must lie below this.
pub const MAX_BIT_OFFSET: u64 = 1 << 32;

/// Rejects a single-bit offset the store would refuse.
pub fn check_bit_offset(offset: u64) -> Result<u64, StoreError> {
    if offset < MAX_BIT_OFFSET {
        Ok(offset)
    } else {
        Err(out_of_range())
    }
}

fn out_of_range() -> StoreError {
    StoreError::InvalidArgument("bit offset is not an integer or out of range".into())
}

/// Unsigned segment type token, `u<N>` on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldType {
    bits: u8,
}

impl FieldType {
    pub fn unsigned(bits: u8) -> Result<Self, StoreError> {
        if (1..=MAX_FIELD_BITS).contains(&bits) {
            Ok(Self { bits })
        } else {
            Err(StoreError::InvalidFieldType(format!("u{bits}")))
        }
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.bits
    }

    /// Largest value the segment can hold.
    #[inline]
    pub fn max_value(self) -> u64 {
        (1u64 << self.bits) - 1
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.bits)
    }
}

impl FromStr for FieldType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .strip_prefix('u')
            .and_then(|n| n.parse::<u8>().ok())
            .ok_or_else(|| StoreError::InvalidFieldType(s.to_owned()))?;
        Self::unsigned(bits)
    }
}

/// Position of a segment inside a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Offset {
    /// Absolute bit offset from the start of the value.
    Bit(u64),
    /// Segment index, `#N` on the wire; resolves to `N * width`.
    Index(u64),
}

impl Offset {
    /// First bit of the segment. Fails unless the whole segment lies below
    /// [`MAX_BIT_OFFSET`].
    pub fn resolve(self, ty: FieldType) -> Result<u64, StoreError> {
        let first = match self {
            Offset::Bit(bit) => Some(bit),
            Offset::Index(index) => index.checked_mul(ty.bits() as u64),
        };
        first
            .filter(|first| {
                first
                    .checked_add(ty.bits() as u64)
                    .is_some_and(|end| end <= MAX_BIT_OFFSET)
            })
            .ok_or_else(out_of_range)
    }
}

impl From<u64> for Offset {
    fn from(bit: u64) -> Self {
        Offset::Bit(bit)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Bit(bit) => write!(f, "{bit}"),
            Offset::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// Overflow policy for `SET` and `INCRBY` sub-operations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Overflow {
    /// Modular arithmetic; the store's default at the start of a command.
    #[default]
    Wrap,
    /// Clamp to `0..=max`.
    Sat,
    /// Leave the segment untouched and reply nil.
    Fail,
}

impl Overflow {
    pub fn as_str(self) -> &'static str {
        match self {
            Overflow::Wrap => "WRAP",
            Overflow::Sat => "SAT",
            Overflow::Fail => "FAIL",
        }
    }
}

/// One sub-operation of a batched bitfield command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldOp {
    Get { ty: FieldType, offset: Offset },
    Set { ty: FieldType, offset: Offset, value: i64 },
    IncrBy { ty: FieldType, offset: Offset, delta: i64 },
    /// Changes the policy for every following `Set`/`IncrBy`. Produces no reply.
    Overflow(Overflow),
}

impl FieldOp {
    pub fn is_read_only(&self) -> bool {
        matches!(self, FieldOp::Get { .. })
    }

    /// Whether this sub-operation contributes an entry to the reply.
    pub fn has_reply(&self) -> bool {
        !matches!(self, FieldOp::Overflow(_))
    }

    pub fn to_args(&self) -> Vec<String> {
        match *self {
            FieldOp::Get { ty, offset } => {
                vec!["GET".into(), ty.to_string(), offset.to_string()]
            }
            FieldOp::Set { ty, offset, value } => vec![
                "SET".into(),
                ty.to_string(),
                offset.to_string(),
                value.to_string(),
            ],
            FieldOp::IncrBy { ty, offset, delta } => vec![
                "INCRBY".into(),
                ty.to_string(),
                offset.to_string(),
                delta.to_string(),
            ],
            FieldOp::Overflow(mode) => vec!["OVERFLOW".into(), mode.as_str().into()],
        }
    }
}

/// Whole-value boolean combination for `BITOP`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
    Not,
}

impl BitOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BitOp::And => "AND",
            BitOp::Or => "OR",
            BitOp::Xor => "XOR",
            BitOp::Not => "NOT",
        }
    }
}

impl FromStr for BitOp {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(BitOp::And),
            "OR" => Ok(BitOp::Or),
            "XOR" => Ok(BitOp::Xor),
            "NOT" => Ok(BitOp::Not),
            _ => Err(StoreError::InvalidArgument(format!("unknown BITOP `{s}`"))),
        }
    }
}

/// Inclusive range in bit units. Negative indexes count back from the end
/// of the value, `-1` being the last bit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitRange {
    pub start: i64,
    pub end: i64,
}

impl BitRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Clamps the range against a value of `total_bits` bits.
    /// Returns `None` when nothing is selected.
    pub fn normalize(self, total_bits: u64) -> Option<(u64, u64)> {
        if total_bits == 0 {
            return None;
        }
        let total = total_bits as i64;
        let mut start = if self.start < 0 { self.start + total } else { self.start };
        let mut end = if self.end < 0 { self.end + total } else { self.end };
        start = start.max(0);
        end = end.max(0);
        if end >= total {
            end = total - 1;
        }
        if start > end {
            return None;
        }
        Some((start as u64, end as u64))
    }
}

/// One complete command, as sent to the store.
#[derive(Copy, Clone, Debug)]
pub enum Command<'a> {
    SetBit { key: &'a str, offset: u64, on: bool },
    GetBit { key: &'a str, offset: u64 },
    BitCount { key: &'a str, range: Option<BitRange> },
    BitPos { key: &'a str, bit: bool, range: Option<BitRange> },
    BitOp { op: BitOp, dest: &'a str, sources: &'a [&'a str] },
    BitField { key: &'a str, ops: &'a [FieldOp] },
    BitFieldRo { key: &'a str, ops: &'a [FieldOp] },
    Expire { key: &'a str, seconds: u64 },
    Del { key: &'a str },
}

impl Command<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetBit { .. } => "SETBIT",
            Command::GetBit { .. } => "GETBIT",
            Command::BitCount { .. } => "BITCOUNT",
            Command::BitPos { .. } => "BITPOS",
            Command::BitOp { .. } => "BITOP",
            Command::BitField { .. } => "BITFIELD",
            Command::BitFieldRo { .. } => "BITFIELD_RO",
            Command::Expire { .. } => "EXPIRE",
            Command::Del { .. } => "DEL",
        }
    }

    /// Full argument vector, command name first.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.name().to_owned()];
        match *self {
            Command::SetBit { key, offset, on } => {
                args.extend([key.to_owned(), offset.to_string(), (on as u8).to_string()]);
            }
            Command::GetBit { key, offset } => {
                args.extend([key.to_owned(), offset.to_string()]);
            }
            Command::BitCount { key, range } => {
                args.push(key.to_owned());
                push_range(&mut args, range);
            }
            Command::BitPos { key, bit, range } => {
                args.extend([key.to_owned(), (bit as u8).to_string()]);
                push_range(&mut args, range);
            }
            Command::BitOp { op, dest, sources } => {
                args.extend([op.as_str().to_owned(), dest.to_owned()]);
                args.extend(sources.iter().map(|s| (*s).to_owned()));
            }
            Command::BitField { key, ops } | Command::BitFieldRo { key, ops } => {
                args.push(key.to_owned());
                args.extend(ops.iter().flat_map(FieldOp::to_args));
            }
            Command::Expire { key, seconds } => {
                args.extend([key.to_owned(), seconds.to_string()]);
            }
            Command::Del { key } => args.push(key.to_owned()),
        }
        args
    }
}

fn push_range(args: &mut Vec<String>, range: Option<BitRange>) {
    if let Some(range) = range {
        args.extend([range.start.to_string(), range.end.to_string(), "BIT".to_owned()]);
    }
}
