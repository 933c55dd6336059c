//! Rasterization of curves onto a grid or a screen.
//!
//! There are two consumers:
//! - marking, which paints whole grid cells the curve passes through into a [`PixelMap`];
//! - tracing, which produces screen space [`Stroke`]s for a live drawing surface.
//!
//! Implicit curves are found by sign changes across the corners of a cell (marching squares
//! without the interpolation step). Neither mode aims for precision, both favour speed.
use super::*;
use classify::{Kind, ParsedEquation};
use expr::Curve;
use serde::Serializer;
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Samples taken per grid column when marking an explicit curve.
pub const SUBSAMPLES: u32 = 10;
/// Screen pixels between explicit samples when tracing.
pub const COLUMN_STEP: f64 = 2.0;
/// Screen block size, in pixels, used when tracing an implicit curve.
pub const BLOCK_STEP: f64 = 4.0;
/// Default tolerance for [`is_on_implicit_curve`].
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// A grid cell, keyed as `"x,y"`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i64,
    pub y: i64,
}

/// Inclusive rectangular range of grid cells.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRange {
    pub x_min: i64,
    pub x_max: i64,
    pub y_min: i64,
    pub y_max: i64,
}

/// Cell colours. Later writes to the same cell win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelMap(BTreeMap<GridCell, String>);

/// Screen to grid transform of a drawing surface.
///
/// The grid origin sits at `(offset_x, offset_y)` on screen, and the mathematical y axis points
/// up while the screen y axis points down.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Screen pixels per grid unit.
    pub grid_size: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A connected screen space polyline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
}

// ###### MARKING ##############################################################

/// Mark the cells `curve` passes through, returning the number of writes made.
///
/// Explicit curves are sampled [`SUBSAMPLES`] times across each column and the cell holding
/// `floor(y)` is marked. Implicit curves mark every cell whose corners change sign.
pub fn mark_cells<C: Curve>(
    curve: &C,
    range: GridRange,
    color: &str,
    pixels: &mut PixelMap,
) -> usize {
    let mut n = 0;

    match curve.kind() {
        Kind::Explicit => {
            for x in range.x_min..=range.x_max {
                for i in 0..SUBSAMPLES {
                    let mx = x as f64 + f64::from(i) / f64::from(SUBSAMPLES);
                    let my = curve.eval(mx, f64::NAN);
                    if !my.is_finite() {
                        continue;
                    }

                    let gy = my.floor();
                    if gy >= range.y_min as f64 && gy <= range.y_max as f64 {
                        pixels.insert(GridCell::new(x, gy as i64), color);
                        n += 1;
                    }
                }
            }
        }
        Kind::Implicit => {
            for cell in range.cells() {
                if crosses(|x, y| curve.eval(x, y), cell.x as f64, cell.y as f64, 1.0) {
                    pixels.insert(cell, color);
                    n += 1;
                }
            }
        }
    }

    log::debug!(
        "marked {n} cells for {:?} in {range:?}",
        curve.expr().unwrap_or_default()
    );
    n
}

/// Mark a parsed equation into a fresh [`PixelMap`].
///
/// An equation that does not compile marks nothing.
pub fn mark_equation(eq: &ParsedEquation, range: GridRange, color: &str) -> PixelMap {
    let mut pixels = PixelMap::new();

    match expr::latex::Eq::compile(eq.clone()) {
        Ok(curve) => {
            mark_cells(&curve, range, color, &mut pixels);
        }
        Err(e) => log::warn!("nothing marked: {e:?}"),
    }

    pixels
}

/// Does the zero set of `expr` pass through the square cell at `(x, y)`?
///
/// True only if all four corners evaluate to finite values, at least one positive and at least
/// one negative. A corner that is exactly zero counts as neither.
///
/// # Example
/// ```rust
/// use pixplot::raster::check_grid_cell;
///
/// assert!(check_grid_cell("x**2+y**2-1", 0.0, 0.0, 1.0));
/// assert!(!check_grid_cell("x**2+y**2-1", 5.0, 5.0, 1.0));
/// ```
pub fn check_grid_cell(expr: &str, x: f64, y: f64, cell_size: f64) -> bool {
    match eval::Expr::parse(expr) {
        Ok(f) => crosses(|x, y| f.eval(x, y), x, y, cell_size),
        Err(_) => false,
    }
}

/// Is `(x, y)` within `tolerance` of the zero set of `expr`?
pub fn is_on_implicit_curve(expr: &str, x: f64, y: f64, tolerance: f64) -> bool {
    eval::evaluate_implicit(expr, x, y).abs() < tolerance
}

fn crosses<F>(f: F, x: f64, y: f64, size: f64) -> bool
where
    F: Fn(f64, f64) -> f64,
{
    let corners = [f(x, y), f(x + size, y), f(x, y + size), f(x + size, y + size)];

    corners.iter().all(|v| v.is_finite())
        && corners.iter().any(|&v| v > 0.0)
        && corners.iter().any(|&v| v < 0.0)
}

// ###### TRACING ##############################################################

/// Trace `curve` across the viewport.
///
/// A viewport without a finite, non-negative width and height traces nothing.
pub fn trace<C: Curve>(curve: &C, vp: &Viewport) -> Vec<Stroke> {
    let strokes = match curve.kind() {
        Kind::Explicit => trace_explicit(curve, vp),
        Kind::Implicit => trace_implicit(curve, vp),
    };

    log::debug!("traced {} strokes", strokes.len());
    strokes
}

/// Sample every [`COLUMN_STEP`] pixels across the screen and join finite samples.
///
/// A non-finite sample breaks the polyline. Strokes of a single point draw nothing and are
/// dropped.
pub fn trace_explicit<C: Curve>(curve: &C, vp: &Viewport) -> Vec<Stroke> {
    let mut strokes = Vec::new();
    let mut current = Stroke::default();

    for sx in steps(COLUMN_STEP, vp.width) {
        let mx = (sx - vp.offset_x) / vp.grid_size;
        let my = curve.eval(mx, f64::NAN);

        if my.is_finite() {
            current.points.push(Point {
                x: sx,
                y: vp.offset_y - my * vp.grid_size,
            });
        } else {
            finish(&mut strokes, &mut current);
        }
    }

    finish(&mut strokes, &mut current);
    strokes
}

/// Tile the screen into [`BLOCK_STEP`] blocks and flag those the curve crosses.
///
/// A crossed block gets a fixed diagonal from its top-left to its bottom-right corner,
/// regardless of which edges the curve actually crosses.
pub fn trace_implicit<C: Curve>(curve: &C, vp: &Viewport) -> Vec<Stroke> {
    let mut strokes = Vec::new();

    for sx in steps(BLOCK_STEP, vp.width).filter(|&sx| sx < vp.width) {
        for sy in steps(BLOCK_STEP, vp.height).filter(|&sy| sy < vp.height) {
            let p0 = vp.to_math(Point { x: sx, y: sy });
            let p1 = vp.to_math(Point {
                x: sx + BLOCK_STEP,
                y: sy + BLOCK_STEP,
            });

            let v00 = curve.eval(p0.x, p0.y);
            let v10 = curve.eval(p1.x, p0.y);
            let v01 = curve.eval(p0.x, p1.y);
            let v11 = curve.eval(p1.x, p1.y);

            if ![v00, v10, v01, v11].iter().all(|v| v.is_finite()) {
                continue;
            }

            let config = (u8::from(v00 > 0.0) << 3)
                | (u8::from(v10 > 0.0) << 2)
                | (u8::from(v11 > 0.0) << 1)
                | u8::from(v01 > 0.0);

            if config == 0 || config == 15 {
                continue;
            }

            strokes.push(Stroke {
                points: vec![
                    Point { x: sx, y: sy },
                    Point {
                        x: sx + BLOCK_STEP,
                        y: sy + BLOCK_STEP,
                    },
                ],
            });
        }
    }

    strokes
}

/// `0, step, 2*step, ..` up to and including `limit`. Empty if `limit` is not a finite,
/// non-negative extent.
fn steps(step: f64, limit: f64) -> impl Iterator<Item = f64> {
    let n = (limit.is_finite() && limit >= 0.).then(|| (limit / step).floor() as u64);
    n.into_iter()
        .flat_map(move |n| (0..=n).map(move |i| i as f64 * step))
}

fn finish(strokes: &mut Vec<Stroke>, current: &mut Stroke) {
    let stroke = std::mem::take(current);
    if stroke.points.len() > 1 {
        strokes.push(stroke);
    }
}

// ###### TYPES ################################################################

impl GridCell {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for GridCell {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| miette!("expected a cell key of the form 'x,y', found '{s}'"))?;

        let parse = |v: &str| {
            v.trim()
                .parse::<i64>()
                .into_diagnostic()
                .wrap_err_with(|| format!("in cell key '{s}'"))
        };

        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

impl GridRange {
    pub fn new(x_min: i64, x_max: i64, y_min: i64, y_max: i64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        (self.x_min..=self.x_max).contains(&cell.x) && (self.y_min..=self.y_max).contains(&cell.y)
    }

    /// Cells in column-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> {
        let Self {
            x_min,
            x_max,
            y_min,
            y_max,
        } = *self;
        (x_min..=x_max).flat_map(move |x| (y_min..=y_max).map(move |y| GridCell::new(x, y)))
    }
}

impl PixelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the colour of a cell, returning the colour it replaced.
    pub fn insert(&mut self, cell: GridCell, color: &str) -> Option<String> {
        self.0.insert(cell, color.to_string())
    }

    pub fn get(&self, cell: GridCell) -> Option<&str> {
        self.0.get(&cell).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` into this map, `other` wins on conflicts.
    pub fn merge(&mut self, other: PixelMap) {
        self.0.extend(other.0);
    }

    /// Cells ordered by `x` then `y`.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (GridCell, &str)> {
        self.0.iter().map(|(c, v)| (*c, v.as_str()))
    }
}

impl Serialize for PixelMap {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_map(self.0.iter().map(|(k, v)| (k.to_string(), v)))
    }
}

impl Viewport {
    /// Screen point to grid coordinates.
    pub fn to_math(&self, p: Point) -> Point {
        Point {
            x: (p.x - self.offset_x) / self.grid_size,
            y: -(p.y - self.offset_y) / self.grid_size,
        }
    }

    /// Grid coordinates to screen point.
    pub fn to_screen(&self, p: Point) -> Point {
        Point {
            x: p.x * self.grid_size + self.offset_x,
            y: self.offset_y - p.y * self.grid_size,
        }
    }

    /// The cell under a screen point, eg a mouse click.
    pub fn cell_at(&self, p: Point) -> GridCell {
        let x = ((p.x - self.offset_x) / self.grid_size).floor();
        let y = -((p.y - self.offset_y) / self.grid_size).floor() - 1.;
        GridCell::new(x as i64, y as i64)
    }

    /// Top-left screen corner of a cell's square.
    pub fn cell_origin(&self, cell: GridCell) -> Point {
        Point {
            x: cell.x as f64 * self.grid_size + self.offset_x,
            y: -(cell.y as f64) * self.grid_size + self.offset_y - self.grid_size,
        }
    }
}
