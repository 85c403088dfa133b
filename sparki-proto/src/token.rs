//! Argument tokens: command arguments as decimal ASCII text.

/// A single command argument.
///
/// Arguments travel as their shortest decimal text: integers without
/// padding or leading zeroes, floats as the shortest positional form that
/// reads back to the same value (`2.5`, `5`, `-0.25`). The firmware only
/// parses plain decimals, so a non-finite float (`NaN`, `inf`) has no valid
/// encoding; check [`Arg::is_finite`] before sending.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum Arg {
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Single-precision float.
    Float(f32),
}

impl Arg {
    /// Whether the argument is a plain decimal number. Only floats can fail.
    pub const fn is_finite(&self) -> bool {
        match self {
            Self::Int(_) | Self::Uint(_) => true,
            Self::Float(v) => v.is_finite(),
        }
    }

    /// Encodes the argument as a frame payload.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Int(v) => v.to_string().into_bytes(),
            Self::Uint(v) => v.to_string().into_bytes(),
            Self::Float(v) => v.to_string().into_bytes(),
        }
    }
}

/// Implements `From<$t> for Arg` via a lossless widening into `$variant`.
macro_rules! impl_from {
    ($variant:ident($wide:ty): $($t:ty),+) => {
        $(
            impl From<$t> for Arg {
                fn from(v: $t) -> Self {
                    Self::$variant(<$wide>::from(v))
                }
            }
        )+
    };
}

impl_from!(Int(i64): i8, i16, i32, i64);
impl_from!(Uint(u64): u8, u16, u32, u64);
impl_from!(Float(f32): f32);

#[cfg(test)]
mod tests {
    use super::*;

    fn text(arg: impl Into<Arg>) -> String {
        String::from_utf8(arg.into().encode()).unwrap()
    }

    #[test]
    fn integers_read_back_unchanged() {
        let samples = [
            i64::MIN,
            -1_000_000,
            -255,
            -1,
            0,
            1,
            9,
            10,
            100,
            57_600,
            i64::MAX,
        ];
        for n in samples {
            assert_eq!(text(n).parse::<i64>().unwrap(), n);
        }
        assert_eq!(text(u64::MAX).parse::<u64>().unwrap(), u64::MAX);
    }

    #[test]
    fn integers_are_minimal() {
        assert_eq!(text(0_u32), "0");
        assert_eq!(text(7_u8), "7");
        assert_eq!(text(-30_i32), "-30");
        assert_eq!(text(100_u32), "100");
    }

    #[test]
    fn floats_are_shortest() {
        assert_eq!(text(2.5_f32), "2.5");
        assert_eq!(text(5.0_f32), "5");
        assert_eq!(text(-0.25_f32), "-0.25");
        assert_eq!(text(5.1_f32), "5.1");
        assert_eq!(text(0.1_f32), "0.1");
    }

    #[test]
    fn floats_read_back_unchanged() {
        for v in [0.1_f32, 1.0 / 3.0, 12.75, -7.125, 1e-3, 3.402_823_5e38] {
            assert_eq!(text(v).parse::<f32>().unwrap(), v);
        }
    }

    #[test]
    fn only_non_finite_floats_are_flagged() {
        assert!(Arg::from(i64::MIN).is_finite());
        assert!(Arg::from(u64::MAX).is_finite());
        assert!(Arg::from(-0.0_f32).is_finite());
        assert!(Arg::from(f32::MAX).is_finite());
        for v in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(!Arg::from(v).is_finite());
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(Arg::from(-42_i32).encode(), Arg::from(-42_i32).encode());
        assert_eq!(Arg::from(1.5_f32).encode(), b"1.5".to_vec());
    }
}
