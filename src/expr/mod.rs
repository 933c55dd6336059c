//! Curves that can be sampled by the rasterizer.

use super::*;
use classify::Kind;

pub mod latex;
pub mod plain;

/// Parse and sample a curve.
pub trait Curve: Sized {
    /// Parse a text expression into a curve.
    fn parse(expr: &str) -> Result<Self>;

    /// Explicit `y = f(x)` or implicit `f(x, y) = 0`.
    fn kind(&self) -> Kind;

    /// Sample the curve.
    ///
    /// Explicit curves ignore `y` and return `f(x)`, implicit curves return `f(x, y)`.
    /// Failure is reported as a non-finite value, never as a panic.
    fn eval(&self, x: f64, y: f64) -> f64;

    /// Fetch the normalized string form of the expression, if it exists.
    fn expr(&self) -> Option<String>;
}
