use super::*;
use meval::{tokenizer::Token, Context, ContextProvider, Expr};

/*** A note on the implementation ***
 *
 * Plain expressions are what a user types into a calculator: `x^2`, `sin(x) + 1`, `pi * x`.
 * They are always treated as `y = f(x)`.
 *
 * `meval` consumes the parsed expression when binding, and the bound closure borrows the
 * context for its lifetime. The context is built from `'static` function pointers and moved
 * into the closure, so the closure can be boxed and kept alongside the source text.
 */

pub struct Eq {
    /// Source text, as written.
    src: String,

    /// Bound `f(x)`.
    func: Box<dyn Fn(f64) -> f64>,
}

impl Curve for Eq {
    fn parse(expr: &str) -> Result<Self> {
        let func = expr
            .parse::<Expr>()
            .into_diagnostic()
            .wrap_err_with(|| format!("parsing '{expr}' failed"))?;

        let ctx = context();

        // any variable that is neither `x` nor a known constant would fail at bind time
        // with a less helpful message
        for t in func.iter() {
            if let Token::Var(n) = t {
                if n != "x" && ctx.get_var(n).is_none() {
                    return Err(unknown_variable(n)).wrap_err_with(|| format!("in '{expr}'"));
                }
            }
        }

        let f = func
            .bind_with_context(ctx, "x")
            .into_diagnostic()
            .wrap_err_with(|| format!("binding '{expr}' failed"))?;

        Ok(Self {
            src: expr.to_string(),
            func: Box::new(f),
        })
    }

    fn kind(&self) -> Kind {
        Kind::Explicit
    }

    fn eval(&self, x: f64, _: f64) -> f64 {
        (self.func)(x)
    }

    fn expr(&self) -> Option<String> {
        Some(self.src.clone())
    }
}

/// Built-in constants and functions, plus the spellings a calculator user expects.
fn context() -> Context<'static> {
    let mut ctx = Context::new();
    ctx.func("log", f64::ln)
        .func("log10", f64::log10)
        // half-way cases round up, -2.5 -> -2
        .func("round", |a| (a + 0.5).floor())
        .func2("pow", f64::powf);
    ctx
}

fn unknown_variable(name: &str) -> miette::Report {
    let help = if name == "y" {
        "plain expressions are functions of x, use the LaTeX syntax for implicit equations"
            .to_string()
    } else {
        did_you_mean(name, ["x", "pi", "e"])
            .map(|s| format!("did you mean '{s}'?"))
            .unwrap_or_else(|| "the only variable is x".to_string())
    };

    miette::Report::new(MietteDiagnostic::new(format!("unknown variable '{name}'")).with_help(help))
}
