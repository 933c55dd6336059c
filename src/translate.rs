//! LaTeX subset to arithmetic expression translation.
//!
//! The output is the language understood by [`crate::eval`]: infix arithmetic, `**` for powers,
//! and plain function calls such as `sqrt(..)` or `lg(..)`. Translation never fails. Anything
//! not recognised passes through as literal text and surfaces later as an evaluation failure.
//!
//! The passes run in a fixed order, later rewrites rely on the earlier ones having resolved
//! every brace group they would otherwise trip over.
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Horizontal axis variable.
pub const X: &str = "x";
/// Vertical axis variable.
pub const Y: &str = "y";

const PI: &str = "(3.141592653589793)";
const E: &str = "(2.718281828459045)";

static LEFT_RIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(?:left|right)\s*").expect("valid regex literal"));
static POW_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^([0-9]+)").expect("valid regex literal"));
static POW_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^([a-zA-Z])").expect("valid regex literal"));
static COMMAND_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([a-zA-Z]+)\s*").expect("valid regex literal"));
static COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([a-zA-Z]+)").expect("valid regex literal"));
static PIPES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|([^|]+)\|").expect("valid regex literal"));

/// Implicit multiplication junctures, applied in order.
static JUNCTURES: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        r"([0-9])([xy])",    // 2x
        r"([xy])(\()",       // x(
        r"(\))(\()",         // )(
        r"([0-9])(\()",      // 2(
        r"(\))([xy0-9])",    // )x
    ]
    .map(|re| Regex::new(re).expect("valid regex literal"))
});

/// Translate a LaTeX subset string into an evaluable expression.
///
/// # Example
/// ```rust
/// use pixplot::translate::translate;
///
/// assert_eq!(translate(r"\frac{x^2}{4}"), "((x**2)/(4))");
/// assert_eq!(translate(r"\sin(2x)+\sqrt[3]{x}"), "sin(2*x)+pow(x,1/(3))");
/// assert_eq!(translate("x**2+y**2-1"), "x**2+y**2-1");
/// ```
pub fn translate(latex: &str) -> String {
    let s = latex.replace('$', "");
    let s = LEFT_RIGHT.replace_all(s.trim(), "");
    let s = resolve_fractions(&s);
    let s = resolve_roots(&s);
    let s = resolve_powers(&s);
    let s = COMMAND_WS.replace_all(&s, |c: &Captures| match function(&c[1]) {
        Some(f) => f.to_string(),
        None => c[0].to_string(),
    });
    let s = resolve_abs(&s);
    let s = PIPES.replace_all(&s, "abs(${1})");
    let s = COMMAND.replace_all(&s, |c: &Captures| match symbol(&c[1]) {
        Some(sym) => sym.to_string(),
        None => c[0].to_string(),
    });
    let s: String = s
        .chars()
        .filter(|&c| c != '\\')
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            c => c,
        })
        .collect();
    let s = JUNCTURES
        .iter()
        .fold(s, |s, re| re.replace_all(&s, "${1}*${2}").into_owned());
    let out: String = s.chars().filter(|c| !c.is_whitespace()).collect();

    log::trace!("translated {latex:?} -> {out:?}");
    out
}

fn function(cmd: &str) -> Option<&'static str> {
    let f = match cmd {
        "sin" => "sin",
        "cos" => "cos",
        "tan" => "tan",
        "arcsin" => "asin",
        "arccos" => "acos",
        "arctan" => "atan",
        "sinh" => "sinh",
        "cosh" => "cosh",
        "tanh" => "tanh",
        "ln" => "ln",
        // base 10, spelled without digits so the juncture pass leaves it alone
        "log" | "lg" => "lg",
        "exp" => "exp",
        _ => return None,
    };
    Some(f)
}

fn symbol(cmd: &str) -> Option<&'static str> {
    let s = match cmd {
        "pi" => PI,
        "e" => E,
        "cdot" | "times" => "*",
        "div" => "/",
        _ => return None,
    };
    Some(s)
}

/// `\frac{A}{B}` -> `((A)/(B))`, leftmost first until none remain.
fn resolve_fractions(s: &str) -> String {
    let mut out = s.to_string();

    while let Some(at) = out.find(r"\frac") {
        let Some((num_open, num_close)) = next_group(&out, at + 5) else {
            break;
        };
        let Some((den_open, den_close)) = next_group(&out, num_close + 1) else {
            break;
        };

        let replacement = format!(
            "(({})/({}))",
            &out[num_open + 1..num_close],
            &out[den_open + 1..den_close]
        );
        out.replace_range(at..=den_close, &replacement);
    }

    out
}

/// `\sqrt{A}` -> `sqrt(A)` and `\sqrt[n]{A}` -> `pow(A,1/(n))`.
fn resolve_roots(s: &str) -> String {
    let mut out = s.to_string();
    let mut from = 0;

    while let Some(rel) = out[from..].find(r"\sqrt") {
        let at = from + rel;
        let arg = skip_ws(&out, at + 5);

        let resolved = match out.as_bytes().get(arg) {
            Some(b'{') => find_matching_brace(&out, arg)
                .map(|close| (close, format!("sqrt({})", &out[arg + 1..close]))),
            Some(b'[') => out[arg..].find(']').and_then(|i| {
                let idx_close = arg + i;
                let open = skip_ws(&out, idx_close + 1);
                find_matching_brace(&out, open).map(|close| {
                    let f = format!(
                        "pow({},1/({}))",
                        &out[open + 1..close],
                        &out[arg + 1..idx_close]
                    );
                    (close, f)
                })
            }),
            _ => None,
        };

        match resolved {
            Some((close, replacement)) => {
                // rescan from the replacement so nested roots are picked up
                out.replace_range(at..=close, &replacement);
                from = at;
            }
            None => from = at + 5,
        }
    }

    out
}

/// `^{A}` -> `**(A)` (nested groups included), then `^2` and `^x`.
fn resolve_powers(s: &str) -> String {
    let mut out = s.to_string();
    let mut from = 0;

    while let Some(rel) = out[from..].find('^') {
        let at = from + rel;
        let open = skip_ws(&out, at + 1);

        match find_matching_brace(&out, open) {
            Some(close) => {
                let replacement = format!("**({})", &out[open + 1..close]);
                out.replace_range(at..=close, &replacement);
                from = at + 2;
            }
            None => from = at + 1,
        }
    }

    let out = POW_DIGITS.replace_all(&out, "**${1}");
    POW_LETTER.replace_all(&out, "**${1}").into_owned()
}

/// `\abs{A}` -> `abs(A)`.
fn resolve_abs(s: &str) -> String {
    let mut out = s.to_string();
    let mut from = 0;

    while let Some(rel) = out[from..].find(r"\abs") {
        let at = from + rel;
        let open = skip_ws(&out, at + 4);

        match find_matching_brace(&out, open) {
            Some(close) => {
                let replacement = format!("abs({})", &out[open + 1..close]);
                out.replace_range(at..=close, &replacement);
                from = at;
            }
            None => from = at + 4,
        }
    }

    out
}

/// The next brace group at or after `from`, skipping anything in between.
fn next_group(s: &str, from: usize) -> Option<(usize, usize)> {
    let open = from + s.get(from..)?.find('{')?;
    find_matching_brace(s, open).map(|close| (open, close))
}

/// Byte index of the `}` closing the `{` at `open`.
fn find_matching_brace(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => (),
        }
    }

    None
}

fn skip_ws(s: &str, from: usize) -> usize {
    s[from..]
        .find(|c: char| !c.is_whitespace())
        .map_or(s.len(), |i| from + i)
}
