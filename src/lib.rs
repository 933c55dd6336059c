use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::*;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

pub mod classify;
pub mod data;
pub mod eval;
pub mod expr;
pub mod raster;
pub mod translate;

use expr::Curve;
use raster::{GridCell, GridRange, PixelMap, Stroke, Viewport};

/// CLI curve rasterizer.
/// Mark the grid cells a LaTeX equation passes through.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Classify and translate a LaTeX equation.
    Parse {
        /// The LaTeX equation.
        expr: String,

        /// The output format to write to stdout.
        #[arg(short, long, default_value_t, value_enum)]
        out: Format,
    },

    /// Evaluate an expression at a single point.
    Eval {
        /// The equation or expression.
        expr: String,

        /// Horizontal coordinate.
        #[arg(short, long, allow_negative_numbers = true)]
        x: f64,

        /// Vertical coordinate, used by implicit equations only.
        #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
        y: f64,

        /// The syntax the expression is written in.
        #[arg(short, long, default_value_t, value_enum)]
        syntax: Syntax,
    },

    /// Mark the grid cells a curve passes through.
    Mark(MarkArgs),

    /// Trace a curve across a screen viewport.
    Draw(DrawArgs),
}

#[derive(Args, Debug)]
pub struct MarkArgs {
    /// The equation to mark.
    #[arg(required_unless_present = "functions")]
    pub expr: Option<String>,

    /// Path to a CSV function list with `expression`, `color`, `latex`, and `visible` columns.
    /// Use `-` to read stdin.
    #[arg(short, long, conflicts_with = "expr")]
    pub functions: Option<PathBuf>,

    /// Colour written to each marked cell.
    #[arg(short, long, default_value = "#2ecc71")]
    pub color: String,

    /// The syntax the expression is written in.
    #[arg(short, long, default_value_t, value_enum)]
    pub syntax: Syntax,

    #[command(flatten)]
    pub range: RangeArgs,

    /// The output format to write to stdout.
    #[arg(short, long, default_value_t, value_enum)]
    pub out: Output,
}

#[derive(Args, Debug)]
pub struct RangeArgs {
    #[arg(long, default_value_t = -10, allow_negative_numbers = true)]
    pub x_min: i64,
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    pub x_max: i64,
    #[arg(long, default_value_t = -10, allow_negative_numbers = true)]
    pub y_min: i64,
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    pub y_max: i64,
}

#[derive(Args, Debug)]
pub struct DrawArgs {
    /// The equation to draw.
    pub expr: String,

    /// The syntax the expression is written in.
    #[arg(short, long, default_value_t, value_enum)]
    pub syntax: Syntax,

    /// Surface width in pixels.
    #[arg(long, default_value_t = 800.)]
    pub width: f64,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 600.)]
    pub height: f64,

    /// Screen x of the grid origin.
    #[arg(long, default_value_t = 400., allow_negative_numbers = true)]
    pub offset_x: f64,

    /// Screen y of the grid origin.
    #[arg(long, default_value_t = 300., allow_negative_numbers = true)]
    pub offset_y: f64,

    /// Pixels per grid unit.
    #[arg(long, default_value_t = 24.)]
    pub grid_size: f64,

    /// The output format to write to stdout.
    #[arg(short, long, default_value_t, value_enum)]
    pub out: Format,
}

#[derive(Debug, Copy, Clone, ValueEnum, Default)]
pub enum Syntax {
    /// LaTeX subset: `\frac{x^2}{4}+\frac{y^2}{9}=1`.
    #[default]
    Latex,

    /// Calculator syntax, always `y = f(x)`: `x^2`, `sin(x)`.
    Plain,
}

#[derive(Debug, Copy, Clone, ValueEnum, Default)]
pub enum Output {
    /// Rich table view.
    #[default]
    Table,

    /// One `x,y colour` line per cell.
    Plain,

    /// JSON object keyed by `"x,y"`.
    Json,

    /// Character grid, `#` for marked cells.
    Grid,
}

#[derive(Debug, Copy, Clone, ValueEnum, Default)]
pub enum Format {
    #[default]
    Plain,
    Json,
}

impl App {
    pub fn run(self) -> Result<()> {
        match self.cmd {
            Cmd::Parse { expr, out } => {
                write_parsed(&classify::parse(&expr), out).into_diagnostic()
            }
            Cmd::Eval { expr, x, y, syntax } => {
                let v = evaluate(&expr, syntax, x, y)?;
                writeln!(io::stdout(), "{v}").into_diagnostic()
            }
            Cmd::Mark(args) => run_mark(args),
            Cmd::Draw(args) => run_draw(args),
        }
    }
}

fn run_mark(args: MarkArgs) -> Result<()> {
    let MarkArgs {
        expr,
        functions,
        color,
        syntax,
        range,
        out,
    } = args;

    let RangeArgs {
        x_min,
        x_max,
        y_min,
        y_max,
    } = range;
    ensure!(x_min <= x_max, "x-min ({x_min}) must not exceed x-max ({x_max})");
    ensure!(y_min <= y_max, "y-min ({y_min}) must not exceed y-max ({y_max})");
    let range = GridRange::new(x_min, x_max, y_min, y_max);

    let pixels = match (expr, functions) {
        (Some(expr), _) => {
            let mut pixels = PixelMap::new();
            mark(&expr, syntax, range, &color, &mut pixels)?;
            pixels
        }
        (None, Some(path)) => read_functions(&path)?.mark(range),
        (None, None) => bail!("supply an equation or a function list"),
    };

    let written = match out {
        Output::Table => write_table(&pixels),
        Output::Plain => write_plain(&pixels),
        Output::Json => write_json(&pixels),
        Output::Grid => write_grid(&pixels, range),
    };
    written.into_diagnostic()
}

fn run_draw(args: DrawArgs) -> Result<()> {
    let DrawArgs {
        expr,
        syntax,
        width,
        height,
        offset_x,
        offset_y,
        grid_size,
        out,
    } = args;

    ensure!(
        width.is_finite() && height.is_finite() && width >= 0. && height >= 0.,
        "width ({width}) and height ({height}) must be finite and not negative"
    );
    ensure!(offset_x.is_finite() && offset_y.is_finite(), "offsets must be finite");
    ensure!(grid_size.is_finite() && grid_size > 0., "grid size must be positive");

    let vp = Viewport {
        width,
        height,
        offset_x,
        offset_y,
        grid_size,
    };
    let strokes = trace(&expr, syntax, &vp)?;

    let written = match out {
        Format::Plain => write_strokes(&strokes),
        Format::Json => write_json(&strokes),
    };
    written.into_diagnostic()
}

fn read_functions(path: &Path) -> Result<data::FunctionList> {
    let rdr = if path.as_os_str() == "-" {
        eprintln!("Reading function list from stdin");
        data::CsvReader::new(io::stdin())
    } else {
        data::CsvReader::new(io::BufReader::new(
            fs::File::open(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to open '{}'", path.display()))?,
        ))
    };

    rdr.into_functions()
        .wrap_err_with(|| format!("in '{}'", path.display()))
}

/// Parse `expr` in the given syntax and mark it into `pixels`.
///
/// Returns the number of writes made.
///
/// # Example
/// ```rust
/// use pixplot::{mark, raster::{GridCell, GridRange, PixelMap}, Syntax};
///
/// let mut pixels = PixelMap::new();
/// mark("x^2+y^2=1", Syntax::Latex, GridRange::new(-2, 1, -2, 1), "red", &mut pixels).unwrap();
///
/// assert_eq!(pixels.len(), 4);
/// assert_eq!(pixels.get(GridCell::new(-1, -1)), Some("red"));
/// ```
pub fn mark(
    expr: &str,
    syntax: Syntax,
    range: GridRange,
    color: &str,
    pixels: &mut PixelMap,
) -> Result<usize> {
    fn go<C: Curve>(expr: &str, range: GridRange, color: &str, px: &mut PixelMap) -> Result<usize> {
        C::parse(expr).map(|c| raster::mark_cells(&c, range, color, px))
    }

    match syntax {
        Syntax::Latex => go::<expr::latex::Eq>(expr, range, color, pixels),
        Syntax::Plain => go::<expr::plain::Eq>(expr, range, color, pixels),
    }
}

/// Parse `expr` in the given syntax and trace it across the viewport.
pub fn trace(expr: &str, syntax: Syntax, vp: &Viewport) -> Result<Vec<Stroke>> {
    fn go<C: Curve>(expr: &str, vp: &Viewport) -> Result<Vec<Stroke>> {
        C::parse(expr).map(|c| raster::trace(&c, vp))
    }

    match syntax {
        Syntax::Latex => go::<expr::latex::Eq>(expr, vp),
        Syntax::Plain => go::<expr::plain::Eq>(expr, vp),
    }
}

/// Parse `expr` in the given syntax and evaluate it at a single point.
///
/// Unlike [`eval::evaluate_implicit`], parse failures are reported rather than folded into NaN.
pub fn evaluate(expr: &str, syntax: Syntax, x: f64, y: f64) -> Result<f64> {
    fn go<C: Curve>(expr: &str, x: f64, y: f64) -> Result<f64> {
        C::parse(expr).map(|c| c.eval(x, y))
    }

    match syntax {
        Syntax::Latex => go::<expr::latex::Eq>(expr, x, y),
        Syntax::Plain => go::<expr::plain::Eq>(expr, x, y),
    }
}

/// The closest candidate to `word`, if any is reasonably close.
pub(crate) fn did_you_mean<'a, I>(word: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut engine = simsearch::SimSearch::new();
    for c in candidates {
        engine.insert(c, c);
    }

    engine.search(word).into_iter().next()
}

fn write_parsed(eq: &classify::ParsedEquation, out: Format) -> io::Result<()> {
    let w = &mut io::stdout();

    if let Format::Json = out {
        serde_json::to_writer_pretty(&mut *w, eq)?;
        return writeln!(w);
    }

    let kind = match eq.kind {
        classify::Kind::Explicit => "explicit",
        classify::Kind::Implicit => "implicit",
    };
    writeln!(w, "kind: {kind}")?;
    writeln!(w, "expression: {}", eq.expression)?;
    if let (Some(l), Some(r)) = (&eq.left_side, &eq.right_side) {
        writeln!(w, "left: {l}")?;
        writeln!(w, "right: {r}")?;
    }

    Ok(())
}

fn write_table(pixels: &PixelMap) -> io::Result<()> {
    use comfy_table::{Cell, CellAlignment as CA, Row, Table};

    let w = &mut io::stdout();

    let mut table = Table::new();

    table.set_header(["X", "Y", "Colour"]);

    for (cell, color) in pixels.iter() {
        let mut row = Row::new();
        row.add_cell(Cell::new(cell.x).set_alignment(CA::Right))
            .add_cell(Cell::new(cell.y).set_alignment(CA::Right))
            .add_cell(Cell::new(color));
        table.add_row(row);
    }

    table.load_preset(comfy_table::presets::UTF8_HORIZONTAL_ONLY);

    writeln!(w, "{table}")?;
    writeln!(w, "  Marked cells: {}", pixels.len())
}

fn write_plain(pixels: &PixelMap) -> io::Result<()> {
    let w = &mut io::stdout();
    for (cell, color) in pixels.iter() {
        writeln!(w, "{cell} {color}")?;
    }
    Ok(())
}

fn write_json<T: Serialize>(x: &T) -> io::Result<()> {
    let w = &mut io::stdout();
    serde_json::to_writer_pretty(&mut *w, x)?;
    writeln!(w)
}

fn write_grid(pixels: &PixelMap, range: GridRange) -> io::Result<()> {
    let w = &mut io::stdout();

    for y in (range.y_min..=range.y_max).rev() {
        let line: String = (range.x_min..=range.x_max)
            .map(|x| match pixels.get(GridCell::new(x, y)) {
                Some(_) => '#',
                None => '.',
            })
            .collect();
        writeln!(w, "{line}")?;
    }

    Ok(())
}

fn write_strokes(strokes: &[Stroke]) -> io::Result<()> {
    let w = &mut io::stdout();

    let mut nfmtr = "[.2]".parse::<numfmt::Formatter>().expect("just fine");

    for stroke in strokes {
        let line = stroke
            .points
            .iter()
            .map(|p| {
                let x = nfmtr.fmt(p.x).to_string();
                format!("{x},{}", nfmtr.fmt(p.y))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(w, "{line}")?;
    }

    Ok(())
}
