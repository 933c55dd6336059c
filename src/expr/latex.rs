use super::*;
use classify::ParsedEquation;
use eval::{Axis, Expr};

/// A classified LaTeX equation with its expression compiled once.
#[derive(Debug, Clone)]
pub struct Eq {
    parsed: ParsedEquation,
    compiled: Expr,
}

impl Curve for Eq {
    fn parse(expr: &str) -> Result<Self> {
        Self::compile(classify::parse(expr)).wrap_err_with(|| format!("parsing '{expr}' failed"))
    }

    fn kind(&self) -> Kind {
        self.parsed.kind
    }

    fn eval(&self, x: f64, y: f64) -> f64 {
        match self.parsed.kind {
            Kind::Explicit => self.compiled.eval_explicit(x),
            Kind::Implicit => self.compiled.eval(x, y),
        }
    }

    fn expr(&self) -> Option<String> {
        Some(self.parsed.expression.clone())
    }
}

impl Eq {
    /// Compile an already classified equation.
    pub fn compile(parsed: ParsedEquation) -> Result<Self> {
        let compiled = Expr::parse(&parsed.expression)
            .wrap_err_with(|| format!("translated to '{}'", parsed.expression))?;

        ensure!(
            parsed.kind == Kind::Implicit || !compiled.uses(Axis::Y),
            "explicit expression '{}' must not depend on y",
            parsed.expression
        );

        Ok(Self { parsed, compiled })
    }
}
