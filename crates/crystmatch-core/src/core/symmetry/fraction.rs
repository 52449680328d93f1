use std::fmt;
use std::ops::Neg;

fn gcd(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// An exact rational number in lowest terms with a positive denominator.
///
/// Symmetry operations store their coefficients and translations this way so
/// that parsing, composition and printing never accumulate rounding error.
/// Arithmetic is checked: results that do not fit in `i64` give `None`.
/// Neither part is ever `i64::MIN`, so negation cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    num: i64,
    den: i64,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction { num: 0, den: 1 };
    pub const ONE: Fraction = Fraction { num: 1, den: 1 };

    /// Creates `num / den` in lowest terms; `None` when `den` is zero or a
    /// part is out of range.
    pub fn new(num: i64, den: i64) -> Option<Self> {
        Self::reduced(num.into(), den.into())
    }

    fn reduced(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num, den).max(1);
        let sign = if den < 0 { -1 } else { 1 };
        let num = i64::try_from(sign * num / g).ok()?;
        let den = i64::try_from(sign * den / g).ok()?;
        (num != i64::MIN).then_some(Self { num, den })
    }

    pub fn from_integer(value: i64) -> Self {
        Self { num: value, den: 1 }
    }

    pub fn numerator(&self) -> i64 {
        self.num
    }

    pub fn denominator(&self) -> i64 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_integer(&self) -> bool {
        self.den == 1
    }

    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Fractional part in `[0, 1)`.
    pub fn fract(&self) -> Self {
        Self {
            num: self.num.rem_euclid(self.den),
            den: self.den,
        }
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        let (a, b) = (i128::from(self.num), i128::from(self.den));
        let (c, d) = (i128::from(other.num), i128::from(other.den));
        Self::reduced(a * d + c * b, b * d)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.checked_add(-other)
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        Self::reduced(
            i128::from(self.num) * i128::from(other.num),
            i128::from(self.den) * i128::from(other.den),
        )
    }

    /// `self / other`, `None` when dividing by zero or on overflow.
    pub fn checked_div(self, other: Self) -> Option<Self> {
        Self::reduced(
            i128::from(self.num) * i128::from(other.den),
            i128::from(self.den) * i128::from(other.num),
        )
    }

    pub fn abs(&self) -> Self {
        Self {
            num: self.num.abs(),
            den: self.den,
        }
    }

    /// Parses an unsigned decimal literal such as `"3"`, `"0.25"` or `".5"`.
    pub fn parse_decimal(text: &str) -> Option<Self> {
        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) || frac.len() > 12 {
            return None;
        }
        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let scale = 10_i64.pow(frac.len() as u32);
        let frac: i64 = if frac.is_empty() { 0 } else { frac.parse().ok()? };
        Self::new(whole.checked_mul(scale)?.checked_add(frac)?, scale)
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Fraction {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Self {
        Self {
            num: -self.num,
            den: self.den,
        }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frac(n: i64, d: i64) -> Fraction {
        Fraction::new(n, d).unwrap()
    }

    #[test]
    fn new_normalizes_sign_and_terms() {
        assert_eq!(frac(2, -4), frac(-1, 2));
        assert_eq!(frac(-2, -4).denominator(), 2);
        assert_eq!(frac(0, 7), Fraction::ZERO);
        assert!(Fraction::new(1, 0).is_none());
    }

    #[test]
    fn arithmetic_is_exact() {
        assert_eq!(frac(1, 3).checked_add(frac(1, 6)), Some(frac(1, 2)));
        assert_eq!(frac(1, 2).checked_sub(frac(3, 4)), Some(frac(-1, 4)));
        assert_eq!(frac(2, 3).checked_mul(frac(3, 4)), Some(frac(1, 2)));
        assert_eq!(frac(1, 2).checked_div(frac(1, 4)), Some(Fraction::from(2)));
        assert_eq!(frac(1, 2).checked_div(Fraction::ZERO), None);
    }

    #[test]
    fn overflowing_arithmetic_gives_none() {
        let a = frac(1, 999_999_999_989);
        let b = frac(1, 999_999_999_971);
        assert_eq!(a.checked_add(b), None);
        assert_eq!(a.checked_mul(b), None);
        assert_eq!(Fraction::from(i64::MAX).checked_add(Fraction::ONE), None);
        assert_eq!(Fraction::new(i64::MIN, 1), None);
        assert_eq!(Fraction::new(i64::MIN, 2), Some(frac(-(1 << 62), 1)));
    }

    #[test]
    fn wide_intermediates_reduce_back_into_range() {
        let big = frac(i64::MAX, 2);
        assert_eq!(big.checked_mul(frac(2, i64::MAX)), Some(Fraction::ONE));
        assert_eq!(big.checked_sub(big), Some(Fraction::ZERO));
    }

    #[test]
    fn fract_wraps_into_unit_interval() {
        assert_eq!(frac(-1, 4).fract(), frac(3, 4));
        assert_eq!(frac(5, 4).fract(), frac(1, 4));
        assert_eq!(Fraction::ONE.fract(), Fraction::ZERO);
    }

    #[test]
    fn decimals_parse_exactly() {
        assert_eq!(Fraction::parse_decimal("0.25"), Some(frac(1, 4)));
        assert_eq!(Fraction::parse_decimal(".5"), Some(frac(1, 2)));
        assert_eq!(Fraction::parse_decimal("3"), Some(Fraction::from(3)));
        assert_eq!(Fraction::parse_decimal("."), None);
        assert_eq!(Fraction::parse_decimal("1e3"), None);
    }

    #[test]
    fn display_omits_unit_denominator() {
        assert_eq!(frac(-1, 2).to_string(), "-1/2");
        assert_eq!(Fraction::from(3).to_string(), "3");
    }
}
