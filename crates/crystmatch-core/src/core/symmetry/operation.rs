use super::fraction::Fraction;
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const AXES: [char; 3] = ['x', 'y', 'z'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymopErrorReason {
    #[error("expected 3 comma-separated components, found {0}")]
    ComponentCount(usize),
    #[error("component {0} is empty")]
    EmptyComponent(usize),
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unknown variable '{0}'")]
    UnknownVariable(char),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("expression is not affine in x, y, z")]
    NotAffine,
    #[error("division by a variable")]
    DivisionByVariable,
    #[error("division by zero")]
    DivisionByZero,
    #[error("a coefficient exceeds the representable range")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid symmetry operation '{input}': {reason}")]
pub struct SymopParseError {
    pub input: String,
    pub reason: SymopErrorReason,
}

/// An affine map `p ↦ R·p + t` on fractional coordinates with exact rational
/// coefficients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymmetryOperation {
    rotation: [[Fraction; 3]; 3],
    translation: [Fraction; 3],
}

impl SymmetryOperation {
    pub fn new(rotation: [[Fraction; 3]; 3], translation: [Fraction; 3]) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        let mut rotation = [[Fraction::ZERO; 3]; 3];
        for (i, row) in rotation.iter_mut().enumerate() {
            row[i] = Fraction::ONE;
        }
        Self::new(rotation, [Fraction::ZERO; 3])
    }

    /// Parses a string such as `-x+1/2,y,-z` or `'1/2+x, 1/2-y, z'`.
    pub fn parse(text: &str) -> Result<Self, SymopParseError> {
        parse_operation(text).map_err(|reason| SymopParseError {
            input: text.to_string(),
            reason,
        })
    }

    pub fn rotation(&self) -> &[[Fraction; 3]; 3] {
        &self.rotation
    }

    pub fn translation(&self) -> &[Fraction; 3] {
        &self.translation
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Returns `true` if this operation equals the identity up to a lattice
    /// translation.
    pub fn is_pure_lattice_translation(&self) -> bool {
        self.rotation == Self::identity().rotation
            && self.translation.iter().all(Fraction::is_integer)
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|i, j| self.rotation[i][j].to_f64())
    }

    pub fn translation_vector(&self) -> Vector3<f64> {
        Vector3::from_fn(|i, _| self.translation[i].to_f64())
    }

    /// The same operation followed by an extra translation; `None` if a
    /// component overflows.
    pub fn translated(&self, shift: &[Fraction; 3]) -> Option<Self> {
        let mut translation = self.translation;
        for (t, s) in translation.iter_mut().zip(shift) {
            *t = t.checked_add(*s)?;
        }
        Some(Self::new(self.rotation, translation))
    }

    /// Applies `R·p + t`, reducing each component into `[0, 1)` when `wrap` is set.
    pub fn apply(&self, point: &Point3<f64>, wrap: bool) -> Point3<f64> {
        let image = self.rotation_matrix() * point + self.translation_vector();
        if wrap { wrap_fractional(&image) } else { image }
    }
}

/// Reduces every component into `[0, 1)`.
pub fn wrap_fractional(point: &Point3<f64>) -> Point3<f64> {
    point.map(|v| {
        let wrapped = v.rem_euclid(1.0);
        if wrapped >= 1.0 { 0.0 } else { wrapped }
    })
}

impl Default for SymmetryOperation {
    fn default() -> Self {
        Self::identity()
    }
}

impl FromStr for SymmetryOperation {
    type Err = SymopParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SymmetryOperation {
    type Error = SymopParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SymmetryOperation> for String {
    fn from(op: SymmetryOperation) -> Self {
        op.to_string()
    }
}

impl fmt::Display for SymmetryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rotation.iter().zip(&self.translation);
        for (row, (coefficients, constant)) in rows.enumerate() {
            if row > 0 {
                f.write_str(",")?;
            }
            let mut first = true;
            for (axis, coefficient) in AXES.iter().zip(coefficients) {
                if coefficient.is_zero() {
                    continue;
                }
                if coefficient.numerator() < 0 {
                    f.write_str("-")?;
                } else if !first {
                    f.write_str("+")?;
                }
                let magnitude = coefficient.abs();
                if magnitude != Fraction::ONE {
                    write!(f, "{magnitude}*")?;
                }
                write!(f, "{axis}")?;
                first = false;
            }
            if !constant.is_zero() {
                if constant.numerator() > 0 && !first {
                    f.write_str("+")?;
                }
                write!(f, "{constant}")?;
            } else if first {
                f.write_str("0")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(Fraction),
    Var(usize),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

fn tokenize(component: &str) -> Result<Vec<Token>, SymopErrorReason> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = component.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {}
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i + 1 < chars.len()
                    && (chars[i + 1].is_ascii_digit() || chars[i + 1] == '.')
                {
                    i += 1;
                }
                let literal: String = chars[start..=i].iter().collect();
                let value = Fraction::parse_decimal(&literal)
                    .ok_or(SymopErrorReason::InvalidNumber(literal))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() => {
                let axis = AXES
                    .iter()
                    .position(|a| a.eq_ignore_ascii_case(&c))
                    .ok_or(SymopErrorReason::UnknownVariable(c))?;
                tokens.push(Token::Var(axis));
            }
            other => return Err(SymopErrorReason::UnexpectedChar(other)),
        }
        i += 1;
    }
    Ok(tokens)
}

/// An affine form `c·(x, y, z) + k` produced while parsing one component.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    coefficients: [Fraction; 3],
    constant: Fraction,
}

impl Affine {
    fn constant(value: Fraction) -> Self {
        Self {
            coefficients: [Fraction::ZERO; 3],
            constant: value,
        }
    }

    fn variable(axis: usize) -> Self {
        let mut coefficients = [Fraction::ZERO; 3];
        coefficients[axis] = Fraction::ONE;
        Self {
            coefficients,
            constant: Fraction::ZERO,
        }
    }

    fn as_constant(&self) -> Option<Fraction> {
        self.coefficients
            .iter()
            .all(Fraction::is_zero)
            .then_some(self.constant)
    }

    fn scale(self, factor: Fraction) -> Result<Self, SymopErrorReason> {
        let mut coefficients = self.coefficients;
        for c in &mut coefficients {
            *c = c.checked_mul(factor).ok_or(SymopErrorReason::Overflow)?;
        }
        let constant = self
            .constant
            .checked_mul(factor)
            .ok_or(SymopErrorReason::Overflow)?;
        Ok(Self {
            coefficients,
            constant,
        })
    }

    fn add(self, other: Self) -> Result<Self, SymopErrorReason> {
        let mut coefficients = self.coefficients;
        for (c, o) in coefficients.iter_mut().zip(other.coefficients) {
            *c = c.checked_add(o).ok_or(SymopErrorReason::Overflow)?;
        }
        let constant = self
            .constant
            .checked_add(other.constant)
            .ok_or(SymopErrorReason::Overflow)?;
        Ok(Self {
            coefficients,
            constant,
        })
    }

    fn multiply(self, other: Self) -> Result<Self, SymopErrorReason> {
        match (self.as_constant(), other.as_constant()) {
            (Some(k), _) => other.scale(k),
            (_, Some(k)) => self.scale(k),
            _ => Err(SymopErrorReason::NotAffine),
        }
    }

    fn divide(self, other: Self) -> Result<Self, SymopErrorReason> {
        let divisor = other
            .as_constant()
            .ok_or(SymopErrorReason::DivisionByVariable)?;
        let reciprocal = Fraction::ONE
            .checked_div(divisor)
            .ok_or(SymopErrorReason::DivisionByZero)?;
        self.scale(reciprocal)
    }
}

/// Recursive-descent parser over the tokens of one component.
struct ComponentParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ComponentParser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<Affine, SymopErrorReason> {
        let mut value = self.term()?;
        while let Some(token @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let term = self.term()?;
            let term = if token == Token::Plus {
                term
            } else {
                term.scale(-Fraction::ONE)?
            };
            value = value.add(term)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Affine, SymopErrorReason> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value = value.multiply(self.factor()?)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    value = value.divide(self.factor()?)?;
                }
                // Implicit multiplication as in "2x" or "1/2(x+y)".
                Some(Token::Number(_) | Token::Var(_) | Token::Open) => {
                    value = value.multiply(self.factor()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<Affine, SymopErrorReason> {
        match self.next() {
            Some(Token::Plus) => self.factor(),
            Some(Token::Minus) => self.factor()?.scale(-Fraction::ONE),
            Some(Token::Number(value)) => Ok(Affine::constant(value)),
            Some(Token::Var(axis)) => Ok(Affine::variable(axis)),
            Some(Token::Open) => {
                let inner = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    Some(other) => Err(SymopErrorReason::UnexpectedToken(format!("{other:?}"))),
                    None => Err(SymopErrorReason::UnexpectedEnd),
                }
            }
            Some(other) => Err(SymopErrorReason::UnexpectedToken(format!("{other:?}"))),
            None => Err(SymopErrorReason::UnexpectedEnd),
        }
    }
}

fn parse_component(index: usize, component: &str) -> Result<Affine, SymopErrorReason> {
    let tokens = tokenize(component)?;
    if tokens.is_empty() {
        return Err(SymopErrorReason::EmptyComponent(index));
    }
    let mut parser = ComponentParser { tokens, pos: 0 };
    let value = parser.expression()?;
    match parser.peek() {
        None => Ok(value),
        Some(other) => Err(SymopErrorReason::UnexpectedToken(format!("{other:?}"))),
    }
}

fn parse_operation(text: &str) -> Result<SymmetryOperation, SymopErrorReason> {
    let trimmed = text.trim().trim_matches(|c| c == '\'' || c == '"');
    let components: Vec<&str> = trimmed.split(',').collect();
    if components.len() != 3 {
        return Err(SymopErrorReason::ComponentCount(components.len()));
    }
    let mut rotation = [[Fraction::ZERO; 3]; 3];
    let mut translation = [Fraction::ZERO; 3];
    for (row, component) in components.iter().enumerate() {
        let affine = parse_component(row, component)?;
        rotation[row] = affine.coefficients;
        translation[row] = affine.constant;
    }
    Ok(SymmetryOperation::new(rotation, translation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frac(n: i64, d: i64) -> Fraction {
        Fraction::new(n, d).unwrap()
    }

    fn op(text: &str) -> SymmetryOperation {
        SymmetryOperation::parse(text).unwrap()
    }

    #[test]
    fn parses_standard_operation() {
        let parsed = op("-x+1/2, y, -z");
        assert_eq!(parsed.rotation()[0], [-Fraction::ONE, Fraction::ZERO, Fraction::ZERO]);
        assert_eq!(parsed.rotation()[2][2], -Fraction::ONE);
        assert_eq!(parsed.translation(), &[frac(1, 2), Fraction::ZERO, Fraction::ZERO]);
    }

    #[test]
    fn accepts_quotes_case_and_leading_constants() {
        assert_eq!(op("'1/2+X,1/2-y,Z'"), op("x+1/2,-y+1/2,z"));
        assert_eq!(op("x+0.5,y,z"), op("x+1/2,y,z"));
        assert_eq!(op("x-y,x,z+1/3"), op("+x-y, x, z+1/3"));
    }

    #[test]
    fn implicit_and_explicit_multiplication_agree() {
        assert_eq!(op("2x,y,z"), op("2*x,y,z"));
        assert_eq!(op("x/2,y,z"), op("1/2*x,y,z"));
        assert_eq!(op("-(x-y),y,z"), op("-x+y,y,z"));
    }

    #[test]
    fn rejects_malformed_operations() {
        let reason = |text: &str| SymmetryOperation::parse(text).unwrap_err().reason;
        assert_eq!(reason("x,y"), SymopErrorReason::ComponentCount(2));
        assert_eq!(reason("x,,z"), SymopErrorReason::EmptyComponent(1));
        assert_eq!(reason("x,w,z"), SymopErrorReason::UnknownVariable('w'));
        assert_eq!(reason("x*y,y,z"), SymopErrorReason::NotAffine);
        assert_eq!(reason("1/x,y,z"), SymopErrorReason::DivisionByVariable);
        assert_eq!(reason("x/0,y,z"), SymopErrorReason::DivisionByZero);
        assert_eq!(reason("x+,y,z"), SymopErrorReason::UnexpectedEnd);
        assert_eq!(reason("x;y,z,0"), SymopErrorReason::UnexpectedChar(';'));
    }

    #[test]
    fn coefficients_beyond_i64_are_rejected() {
        let reason = |text: &str| SymmetryOperation::parse(text).unwrap_err().reason;
        assert_eq!(
            reason("x+1/999999999989+1/999999999971,y,z"),
            SymopErrorReason::Overflow
        );
        assert_eq!(reason("x/999999999989/999999999971,y,z"), SymopErrorReason::Overflow);
        assert_eq!(reason("9223372036854775807x+x,y,z"), SymopErrorReason::Overflow);

        let tight = op("x+1/999999999989,y,z");
        let shift = [frac(1, 999_999_999_971), Fraction::ZERO, Fraction::ZERO];
        assert_eq!(tight.translated(&shift), None);
        assert!(tight.translated(&[frac(1, 3), Fraction::ZERO, Fraction::ZERO]).is_some());
    }

    #[test]
    fn apply_wraps_into_unit_cell() {
        let screw = op("-x,y+1/2,-z");
        let image = screw.apply(&Point3::new(0.2, 0.75, 0.0), true);
        assert!((image - Point3::new(0.8, 0.25, 0.0)).norm() < 1e-12);
        let raw = screw.apply(&Point3::new(0.2, 0.75, 0.0), false);
        assert!((raw - Point3::new(-0.2, 1.25, 0.0)).norm() < 1e-12);
        let tiny = wrap_fractional(&Point3::new(-1e-17, 0.0, 1.0));
        assert!(tiny.coords.iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn display_round_trips() {
        for text in ["x,y,z", "-x+1/2,y,-z", "x-y,x,z+1/6", "2*x,-1/2*y,-1/4", "1/2*x+y-1/3,0,z"] {
            let parsed = op(text);
            assert_eq!(op(&parsed.to_string()), parsed, "{text}");
        }
        assert_eq!(op("y+1/2, -x, z").to_string(), "y+1/2,-x,z");
        assert_eq!(SymmetryOperation::identity().to_string(), "x,y,z");
    }

    #[test]
    fn identity_and_lattice_translations() {
        assert!(op("x,y,z").is_identity());
        assert!(!op("x+1,y,z").is_identity());
        assert!(op("x+1,y,z").is_pure_lattice_translation());
        let centred = op("x,y,z").translated(&[frac(1, 2), frac(1, 2), Fraction::ZERO]);
        assert_eq!(centred, Some(op("x+1/2,y+1/2,z")));
    }
}
