//! Explicit/implicit classification of LaTeX equations.
use super::*;
use regex::Regex;
use std::sync::LazyLock;
use translate::translate;

static HAS_Y: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\by\b").expect("valid regex literal"));
static Y_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^y\s*=\s*").expect("valid regex literal"));

/// Whether the curve is `y = f(x)` or the zero set of `f(x, y)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Explicit,
    Implicit,
}

/// The result of [`parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEquation {
    pub kind: Kind,

    /// Translated expression.
    /// For implicit equations this is always `(left_side) - (right_side)`.
    pub expression: String,

    /// Translated left hand side, implicit equations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_side: Option<String>,

    /// Translated right hand side, implicit equations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_side: Option<String>,
}

/// Classify and translate a LaTeX equation.
///
/// A single `=` with `y` on either side gives an implicit equation, unless the left side is just
/// `y` and the right side is free of it. Everything else is explicit, with a leading `y=`
/// stripped. Never fails; malformed input shows up as NaN at evaluation.
///
/// # Example
/// ```rust
/// use pixplot::classify::{parse, Kind};
///
/// let eq = parse(r"\frac{x^2}{4}+\frac{y^2}{9}=1");
/// assert_eq!(eq.kind, Kind::Implicit);
/// assert_eq!(eq.expression, "(((x**2)/(4))+((y**2)/(9))) - (1)");
///
/// let eq = parse("y = x^2");
/// assert_eq!(eq.kind, Kind::Explicit);
/// assert_eq!(eq.expression, "x**2");
/// ```
pub fn parse(raw: &str) -> ParsedEquation {
    let raw = raw.trim();

    if let Some((l, r)) = raw.split_once('=') {
        if !r.contains('=') {
            let left = translate(l.trim());
            let right = translate(r.trim());
            let (ly, ry) = (HAS_Y.is_match(&left), HAS_Y.is_match(&right));

            if left == translate::Y && !ry {
                log::debug!("{raw:?} is explicit in y");
                return ParsedEquation::explicit(right);
            }

            if ly || ry {
                log::debug!("{raw:?} is implicit");
                return ParsedEquation::implicit(left, right);
            }
        }
    }

    let body = Y_PREFIX.replace(raw, "");
    ParsedEquation::explicit(translate(&body))
}

impl ParsedEquation {
    pub fn explicit(expression: String) -> Self {
        Self {
            kind: Kind::Explicit,
            expression,
            left_side: None,
            right_side: None,
        }
    }

    pub fn implicit(left: String, right: String) -> Self {
        Self {
            kind: Kind::Implicit,
            expression: format!("({left}) - ({right})"),
            left_side: Some(left),
            right_side: Some(right),
        }
    }
}
