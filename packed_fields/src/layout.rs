//! Field layout: widths and the bit offsets derived from them.
//!
//! Fields are laid out in order, each followed by one unused guard bit:
//! `offset(0) = 0`, `offset(i) = offset(i - 1) + width(i - 1) + 1`.
//!
//! ```rust
//! use packed_fields::{FieldLayout, LayoutBuilder};
//!
//! let layout = FieldLayout::new(&[4, 4, 12]).unwrap();
//! assert_eq!(layout.offsets(), &[0, 5, 10]);
//! assert_eq!(layout.total_bits(), 22);
//!
//! let same = LayoutBuilder::new().field(4).field(4).field(12).build().unwrap();
//! assert_eq!(layout, same);
//! ```

use bit_store::{FieldOp, Offset, Overflow};

use crate::{FieldError, Result, Width};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    widths: Vec<Width>,
    offsets: Vec<u64>,
}

impl FieldLayout {
    pub fn new(widths: &[u8]) -> Result<Self> {
        let widths = widths
            .iter()
            .map(|&bits| Width::new(bits))
            .collect::<Result<Vec<_>>>()?;
        Self::from_widths(widths)
    }

    pub fn from_widths(widths: Vec<Width>) -> Result<Self> {
        if widths.is_empty() {
            return Err(FieldError::EmptyLayout);
        }
        let offsets = widths
            .iter()
            .scan(0u64, |next, width| {
                let offset = *next;
                *next += width.bits() as u64 + 1;
                Some(offset)
            })
            .collect();
        Ok(Self { widths, offsets })
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    pub fn widths(&self) -> &[Width] {
        &self.widths
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn width(&self, index: usize) -> Option<Width> {
        self.widths.get(index).copied()
    }

    pub fn offset(&self, index: usize) -> Option<u64> {
        self.offsets.get(index).copied()
    }

    pub fn max_value(&self, index: usize) -> Option<u32> {
        self.width(index).map(Width::max_value)
    }

    /// Bits from the start of the value to the end of the last field.
    pub fn total_bits(&self) -> u64 {
        let last = self.len() - 1;
        self.offsets[last] + self.widths[last].bits() as u64
    }

    /// Bytes the stored value grows to once every field has been written.
    pub fn byte_len(&self) -> usize {
        self.total_bits().div_ceil(8) as usize
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Width, u64)> + '_ {
        self.widths.iter().copied().zip(self.offsets.iter().copied())
    }

    pub(crate) fn check_arity(&self, found: usize) -> Result<()> {
        if found == self.len() {
            Ok(())
        } else {
            Err(FieldError::ArityMismatch { expected: self.len(), found })
        }
    }

    pub(crate) fn check_index(&self, index: usize) -> Result<(Width, u64)> {
        match (self.width(index), self.offset(index)) {
            (Some(width), Some(offset)) => Ok((width, offset)),
            _ => Err(FieldError::FieldIndexOutOfBounds { index, len: self.len() }),
        }
    }

    /// `OVERFLOW SAT SET u<w> <offset> <value>` for every field.
    pub fn set_ops(&self, values: &[u32]) -> Result<Vec<FieldOp>> {
        self.check_arity(values.len())?;
        Ok(self
            .iter()
            .zip(values)
            .flat_map(|((width, offset), &value)| saturating(set_op(width, offset, value)))
            .collect())
    }

    /// `OVERFLOW SAT INCRBY u<w> <offset> <delta>` for every field.
    pub fn incr_ops(&self, deltas: &[u32]) -> Result<Vec<FieldOp>> {
        self.check_arity(deltas.len())?;
        Ok(self
            .iter()
            .zip(deltas)
            .flat_map(|((width, offset), &delta)| saturating(incr_op(width, offset, delta)))
            .collect())
    }

    /// `GET u<w> <offset>` for every field.
    pub fn get_ops(&self) -> Vec<FieldOp> {
        self.iter().map(|(width, offset)| get_op(width, offset)).collect()
    }

    /// Narrows a batch reply to one value per field. The reply must carry
    /// exactly one entry per field.
    pub fn decode(&self, replies: Vec<Option<i64>>) -> Result<Vec<u32>> {
        if replies.len() != self.len() {
            return Err(FieldError::ResponseLength {
                expected: self.len(),
                found: replies.len(),
            });
        }
        replies.into_iter().map(narrow).collect()
    }
}

pub(crate) fn saturating(op: FieldOp) -> [FieldOp; 2] {
    [FieldOp::Overflow(Overflow::Sat), op]
}

pub(crate) fn get_op(width: Width, offset: u64) -> FieldOp {
    FieldOp::Get { ty: width.field_type(), offset: Offset::Bit(offset) }
}

pub(crate) fn set_op(width: Width, offset: u64, value: u32) -> FieldOp {
    FieldOp::Set {
        ty: width.field_type(),
        offset: Offset::Bit(offset),
        value: value as i64,
    }
}

pub(crate) fn incr_op(width: Width, offset: u64, delta: u32) -> FieldOp {
    FieldOp::IncrBy {
        ty: width.field_type(),
        offset: Offset::Bit(offset),
        delta: delta as i64,
    }
}

pub(crate) fn narrow(reply: Option<i64>) -> Result<u32> {
    reply
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(FieldError::UnexpectedReply(reply))
}

/// Decodes the reply of a one-field command.
pub(crate) fn single(replies: Vec<Option<i64>>) -> Result<u32> {
    match replies.as_slice() {
        [reply] => narrow(*reply),
        _ => Err(FieldError::ResponseLength {
            expected: 1,
            found: replies.len(),
        }),
    }
}

/// Fluent construction of a [`FieldLayout`]; widths are validated once, in
/// [`build`](LayoutBuilder::build).
#[derive(Clone, Debug, Default)]
pub struct LayoutBuilder {
    widths: Vec<u8>,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, bits: u8) -> Self {
        self.widths.push(bits);
        self
    }

    pub fn fields<I: IntoIterator<Item = u8>>(mut self, widths: I) -> Self {
        self.widths.extend(widths);
        self
    }

    pub fn build(self) -> Result<FieldLayout> {
        FieldLayout::new(&self.widths)
    }
}
