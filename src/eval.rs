//! Numeric evaluation of translated expressions.
//!
//! An expression is tokenized and parsed once into a [`Node`] tree, then evaluated as many times
//! as needed with different axis bindings.
//! The accepted language is the output of [`crate::translate`]: `+ - * / %`, right associative
//! `**`, parentheses, numeric literals, the axis variables `x` and `y`, the constants `pi` and
//! `e`, and the functions listed in [`Func`].
//! Nesting depth is bounded, deeper input is a parse error.
use super::*;
use std::{f64::consts, fmt, ops::Range, str::FromStr};

/// An axis variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

/// Built-in functions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sqrt,
    Exp,
    /// Natural logarithm, spelled `ln` or `log`.
    Ln,
    /// Base 10 logarithm, spelled `lg` or `log10`.
    Lg,
    Abs,
    Floor,
    Ceil,
    Round,
    Pow,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(f64),
    Variable(Axis),
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Call {
        func: Func,
        args: Vec<Node>,
    },
}

/// A compiled expression.
///
/// # Example
/// ```rust
/// use pixplot::eval::Expr;
///
/// let f = Expr::parse("(x**2+y**2) - (1)").unwrap();
/// assert_eq!(f.eval(0.0, 0.0), -1.0);
/// assert_eq!(f.eval(1.0, 0.0), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    root: Node,
}

/// Evaluate `expr` as `y = f(x)`.
///
/// Returns NaN if the expression does not parse or mentions `y`. Never panics.
pub fn evaluate_explicit(expr: &str, x: f64) -> f64 {
    match Expr::parse(expr) {
        Ok(f) => f.eval_explicit(x),
        Err(e) => {
            log::debug!("explicit evaluation of {expr:?} failed: {e}");
            f64::NAN
        }
    }
}

/// Evaluate `expr` as `f(x, y)`.
///
/// Returns NaN if the expression does not parse. Never panics.
pub fn evaluate_implicit(expr: &str, x: f64, y: f64) -> f64 {
    match Expr::parse(expr) {
        Ok(f) => f.eval(x, y),
        Err(e) => {
            log::debug!("implicit evaluation of {expr:?} failed: {e}");
            f64::NAN
        }
    }
}

impl Expr {
    pub fn parse(src: &str) -> Result<Self> {
        let toks = tokenize(src)?;
        let mut p = Parser::new(src, toks);

        ensure!(!p.toks.is_empty(), "expression is empty");

        let (root, _) = p.expr()?;
        if let Some(t) = p.peek() {
            return Err(diagnostic(
                src,
                t.span.clone(),
                "unexpected input",
                "expected an operator or end of expression",
                None,
            ));
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Does the expression reference the given axis?
    pub fn uses(&self, axis: Axis) -> bool {
        self.root.uses(axis)
    }

    /// Evaluate with both axis bindings.
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        self.root.eval(x, y)
    }

    /// Evaluate with only `x` bound; NaN if `y` is referenced.
    pub fn eval_explicit(&self, x: f64) -> f64 {
        if self.uses(Axis::Y) {
            f64::NAN
        } else {
            self.root.eval(x, f64::NAN)
        }
    }
}

impl FromStr for Expr {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self> {
        Expr::parse(s)
    }
}

impl Node {
    fn uses(&self, axis: Axis) -> bool {
        match self {
            Node::Literal(_) => false,
            Node::Variable(a) => *a == axis,
            Node::Unary { operand, .. } => operand.uses(axis),
            Node::Binary { lhs, rhs, .. } => lhs.uses(axis) || rhs.uses(axis),
            Node::Call { args, .. } => args.iter().any(|a| a.uses(axis)),
        }
    }

    fn eval(&self, x: f64, y: f64) -> f64 {
        match self {
            Node::Literal(v) => *v,
            Node::Variable(Axis::X) => x,
            Node::Variable(Axis::Y) => y,
            Node::Unary { op, operand } => {
                let v = operand.eval(x, y);
                match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Plus => v,
                }
            }
            Node::Binary { op, lhs, rhs } => {
                let (a, b) = (lhs.eval(x, y), rhs.eval(x, y));
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Rem => a % b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Node::Call { func, args } => match args.as_slice() {
                [a] => func.apply(a.eval(x, y), f64::NAN),
                [a, b] => func.apply(a.eval(x, y), b.eval(x, y)),
                _ => f64::NAN,
            },
        }
    }
}

impl Func {
    pub const ALL: [Func; 18] = [
        Func::Sin,
        Func::Cos,
        Func::Tan,
        Func::Asin,
        Func::Acos,
        Func::Atan,
        Func::Sinh,
        Func::Cosh,
        Func::Tanh,
        Func::Sqrt,
        Func::Exp,
        Func::Ln,
        Func::Lg,
        Func::Abs,
        Func::Floor,
        Func::Ceil,
        Func::Round,
        Func::Pow,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        let f = match name {
            "log" => Func::Ln,
            "log10" => Func::Lg,
            _ => return Func::ALL.into_iter().find(|f| f.name() == name),
        };
        Some(f)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Sqrt => "sqrt",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Lg => "lg",
            Func::Abs => "abs",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Round => "round",
            Func::Pow => "pow",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Func::Pow => 2,
            _ => 1,
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Func::Sin => a.sin(),
            Func::Cos => a.cos(),
            Func::Tan => a.tan(),
            Func::Asin => a.asin(),
            Func::Acos => a.acos(),
            Func::Atan => a.atan(),
            Func::Sinh => a.sinh(),
            Func::Cosh => a.cosh(),
            Func::Tanh => a.tanh(),
            Func::Sqrt => a.sqrt(),
            Func::Exp => a.exp(),
            Func::Ln => a.ln(),
            Func::Lg => a.log10(),
            Func::Abs => a.abs(),
            Func::Floor => a.floor(),
            Func::Ceil => a.ceil(),
            // half-way cases round up, -2.5 -> -2
            Func::Round => (a + 0.5).floor(),
            Func::Pow => a.powf(b),
        }
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" | "PI" => Some(consts::PI),
        "e" | "E" => Some(consts::E),
        _ => None,
    }
}

/// Every identifier the parser understands, for suggestions.
fn known_names() -> impl Iterator<Item = &'static str> {
    ["x", "y", "pi", "e", "log", "log10"]
        .into_iter()
        .chain(Func::ALL.into_iter().map(Func::name))
}

// ###### TOKENIZER ############################################################

#[derive(Debug, Copy, Clone, PartialEq)]
enum Kind<'a> {
    Num(f64),
    Ident(&'a str),
    Op(BinOp),
    Minus,
    Plus,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone)]
struct Token<'a> {
    kind: Kind<'a>,
    span: Range<usize>,
}

fn tokenize(src: &str) -> Result<Vec<Token<'_>>> {
    let bytes = src.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let kind = match bytes[i] {
            b if b.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                i = scan_number(bytes, i);
                let v = src[start..i].parse::<f64>().map_err(|_| {
                    diagnostic(src, start..i, "here", "malformed number", None)
                })?;
                Kind::Num(v)
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                Kind::Ident(&src[start..i])
            }
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                Kind::Op(BinOp::Pow)
            }
            b => {
                let kind = match b {
                    b'+' => Kind::Plus,
                    b'-' => Kind::Minus,
                    b'*' => Kind::Op(BinOp::Mul),
                    b'/' => Kind::Op(BinOp::Div),
                    b'%' => Kind::Op(BinOp::Rem),
                    b'(' => Kind::LParen,
                    b')' => Kind::RParen,
                    b',' => Kind::Comma,
                    _ => {
                        let len = src[start..].chars().next().map_or(1, char::len_utf8);
                        return Err(diagnostic(
                            src,
                            start..start + len,
                            "here",
                            "unexpected character",
                            None,
                        ));
                    }
                };
                i += 1;
                kind
            }
        };

        toks.push(Token {
            kind,
            span: start..i,
        });
    }

    Ok(toks)
}

/// Scan a decimal literal with an optional exponent, returning the end index.
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    let digits = |i: &mut usize| {
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
    };

    digits(&mut i);
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        digits(&mut i);
    }

    if let Some(b'e' | b'E') = bytes.get(i) {
        let mut j = i + 1;
        if let Some(b'+' | b'-') = bytes.get(j) {
            j += 1;
        }
        if bytes.get(j).map_or(false, u8::is_ascii_digit) {
            i = j;
            digits(&mut i);
        }
    }

    i
}

// ###### PARSER ###############################################################

/// Deepest nesting of parentheses, calls, and signs the parser descends into.
const MAX_NESTING: usize = 256;
/// Tallest tree accepted, long operator chains included.
const MAX_HEIGHT: usize = 1024;

/// A parsed subtree and its height.
type Parsed = (Node, usize);

struct Parser<'a> {
    src: &'a str,
    toks: Vec<Token<'a>>,
    pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, toks: Vec<Token<'a>>) -> Self {
        Self {
            src,
            toks,
            pos: 0,
            nesting: 0,
        }
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let t = self.toks.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn eat(&mut self, kind: Kind<'a>) -> bool {
        match self.peek() {
            Some(t) if t.kind == kind => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn end_span(&self) -> Range<usize> {
        self.src.len()..self.src.len()
    }

    fn here(&self) -> Range<usize> {
        self.peek().map_or_else(|| self.end_span(), |t| t.span.clone())
    }

    fn expect(&mut self, kind: Kind<'a>, what: &str) -> Result<()> {
        if self.eat(kind) {
            return Ok(());
        }

        Err(diagnostic(
            self.src,
            self.here(),
            "here",
            &format!("expected {what}"),
            None,
        ))
    }

    /// `term (('+'|'-') term)*`
    fn expr(&mut self) -> Result<Parsed> {
        let mut lhs = self.term()?;
        loop {
            let span = self.here();
            let op = if self.eat(Kind::Plus) {
                BinOp::Add
            } else if self.eat(Kind::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.term()?;
            lhs = self.binary(op, lhs, rhs, span)?;
        }
        Ok(lhs)
    }

    /// `unary (('*'|'/'|'%') unary)*`
    fn term(&mut self) -> Result<Parsed> {
        let mut lhs = self.unary()?;
        while let Some(Kind::Op(op @ (BinOp::Mul | BinOp::Div | BinOp::Rem))) =
            self.peek().map(|t| t.kind)
        {
            let span = self.here();
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs, span)?;
        }
        Ok(lhs)
    }

    /// `('-'|'+') unary | power`
    ///
    /// Every recursive path passes through here, so this is where nesting is bounded.
    fn unary(&mut self) -> Result<Parsed> {
        let span = self.here();
        if self.nesting >= MAX_NESTING {
            return Err(too_deep(self.src, span, MAX_NESTING));
        }

        self.nesting += 1;
        let parsed = self.signed(span);
        self.nesting -= 1;
        parsed
    }

    fn signed(&mut self, span: Range<usize>) -> Result<Parsed> {
        let op = if self.eat(Kind::Minus) {
            UnaryOp::Neg
        } else if self.eat(Kind::Plus) {
            UnaryOp::Plus
        } else {
            return self.power();
        };

        let (operand, h) = self.unary()?;
        let h = self.grow(h, span)?;
        let operand = Box::new(operand);
        Ok((Node::Unary { op, operand }, h))
    }

    /// `atom ('**' unary)?`, right associative.
    fn power(&mut self) -> Result<Parsed> {
        let base = self.atom()?;
        let span = self.here();
        if self.eat(Kind::Op(BinOp::Pow)) {
            let exp = self.unary()?;
            return self.binary(BinOp::Pow, base, exp, span);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Parsed> {
        let Some(tok) = self.next() else {
            return Err(diagnostic(
                self.src,
                self.end_span(),
                "here",
                "unexpected end of expression",
                None,
            ));
        };

        match tok.kind {
            Kind::Num(v) => Ok((Node::Literal(v), 1)),
            Kind::LParen => {
                let inner = self.expr()?;
                self.expect(Kind::RParen, "`)`")?;
                Ok(inner)
            }
            Kind::Ident(name) => self.ident(name, tok.span),
            _ => Err(diagnostic(
                self.src,
                tok.span,
                "here",
                "expected a number, variable, or function call",
                None,
            )),
        }
    }

    fn ident(&mut self, name: &str, span: Range<usize>) -> Result<Parsed> {
        match name {
            "x" => return Ok((Node::Variable(Axis::X), 1)),
            "y" => return Ok((Node::Variable(Axis::Y), 1)),
            _ => (),
        }

        if let Some(v) = constant(name) {
            return Ok((Node::Literal(v), 1));
        }

        let Some(func) = Func::lookup(name) else {
            let help = did_you_mean(name, known_names()).map(|s| format!("did you mean `{s}`?"));
            return Err(diagnostic(
                self.src,
                span,
                "not a variable, constant, or function",
                &format!("unknown identifier `{name}`"),
                help,
            ));
        };

        self.expect(Kind::LParen, &format!("`(` after `{func}`"))?;
        let mut args = vec![self.expr()?];
        while self.eat(Kind::Comma) {
            args.push(self.expr()?);
        }
        let close = self.peek().map(|t| t.span.end).unwrap_or(self.src.len());
        self.expect(Kind::RParen, "`)`")?;

        if args.len() != func.arity() {
            return Err(diagnostic(
                self.src,
                span.start..close,
                "in this call",
                &format!(
                    "`{func}` takes {} argument(s) but {} were supplied",
                    func.arity(),
                    args.len()
                ),
                None,
            ));
        }

        let h = args.iter().map(|(_, h)| *h).max().unwrap_or_default();
        let h = self.grow(h, span)?;
        let args = args.into_iter().map(|(a, _)| a).collect();
        Ok((Node::Call { func, args }, h))
    }

    fn binary(&self, op: BinOp, lhs: Parsed, rhs: Parsed, span: Range<usize>) -> Result<Parsed> {
        let h = self.grow(lhs.1.max(rhs.1), span)?;
        let node = Node::Binary {
            op,
            lhs: Box::new(lhs.0),
            rhs: Box::new(rhs.0),
        };
        Ok((node, h))
    }

    /// Height of a node over a child of height `h`.
    fn grow(&self, h: usize, span: Range<usize>) -> Result<usize> {
        if h >= MAX_HEIGHT {
            return Err(too_deep(self.src, span, MAX_HEIGHT));
        }
        Ok(h + 1)
    }
}

fn too_deep(src: &str, span: Range<usize>, limit: usize) -> miette::Report {
    diagnostic(
        src,
        span,
        "here",
        "expression is nested too deeply",
        Some(format!("at most {limit} levels are supported")),
    )
}

fn diagnostic(
    src: &str,
    span: Range<usize>,
    label: &str,
    msg: &str,
    help: Option<String>,
) -> miette::Report {
    let mut diag = MietteDiagnostic::new(msg).with_label(LabeledSpan::at(span, label));
    if let Some(help) = help {
        diag = diag.with_help(help);
    }

    miette::Report::new(diag).with_source_code(src.to_string())
}
