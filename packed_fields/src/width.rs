use core::fmt;
use core::str::FromStr;

use bit_store::FieldType;

use crate::FieldError;

/// Largest field width a layout accepts.
pub const MAX_WIDTH: u8 = 32;

/// Validated bit width of one unsigned field, `1..=32`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Width(FieldType);

impl Width {
    pub fn new(bits: u8) -> Result<Self, FieldError> {
        if !(1..=MAX_WIDTH).contains(&bits) {
            return Err(FieldError::InvalidWidth(bits));
        }
        Ok(Self(FieldType::unsigned(bits)?))
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0.bits()
    }

    /// `2^bits - 1`, the value every write to the field saturates at.
    #[inline]
    pub fn max_value(self) -> u32 {
        self.0.max_value() as u32
    }

    #[inline]
    pub fn field_type(self) -> FieldType {
        self.0
    }
}

impl TryFrom<u8> for Width {
    type Error = FieldError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl From<Width> for FieldType {
    fn from(width: Width) -> Self {
        width.0
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Parses the wire type token, `u1` through `u32`.
impl FromStr for Width {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty: FieldType = s.parse()?;
        Self::new(ty.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert!(matches!(Width::new(0), Err(FieldError::InvalidWidth(0))));
        assert!(matches!(Width::new(33), Err(FieldError::InvalidWidth(33))));
        assert_eq!(Width::new(1).unwrap().max_value(), 1);
        assert_eq!(Width::new(32).unwrap().max_value(), u32::MAX);
    }

    #[test]
    fn parse_type_tokens() {
        let w: Width = "u12".parse().unwrap();
        assert_eq!(w.bits(), 12);
        assert_eq!(w.to_string(), "u12");
        assert!(matches!("u40".parse::<Width>(), Err(FieldError::InvalidWidth(40))));
        assert!(matches!("i8".parse::<Width>(), Err(FieldError::Store(_))));
    }
}
