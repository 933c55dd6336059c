use pixplot::{
    classify::{self, ParsedEquation},
    mark,
    raster::*,
    trace, Syntax,
};

fn marked(expr: &str, range: GridRange) -> Vec<(i64, i64)> {
    let mut pixels = PixelMap::new();
    mark(expr, Syntax::Latex, range, "c", &mut pixels).unwrap();
    pixels.iter().map(|(c, _)| (c.x, c.y)).collect()
}

fn vp(size: f64, grid_size: f64) -> Viewport {
    Viewport {
        width: size,
        height: size,
        offset_x: size / 2.,
        offset_y: size / 2.,
        grid_size,
    }
}

#[test]
fn grid_cell_corners() {
    let circle = "x**2+y**2-1";
    assert!(check_grid_cell(circle, 0.0, 0.0, 1.0));
    assert!(check_grid_cell(circle, -1.0, -1.0, 1.0));
    assert!(!check_grid_cell(circle, 5.0, 5.0, 1.0));
    // wholly inside
    assert!(!check_grid_cell(circle, -0.25, -0.25, 0.5));
    // a larger cell reaches the curve
    assert!(check_grid_cell(circle, -0.25, -0.25, 2.0));

    assert!(!check_grid_cell("not an expression", 0.0, 0.0, 1.0));
    assert!(!check_grid_cell("0", 0.0, 0.0, 1.0));
    // zero corners count as neither sign
    assert!(!check_grid_cell("x", 0.0, 0.0, 1.0));
    assert!(check_grid_cell("x", -0.5, 0.0, 1.0));
    // an undefined corner rejects the cell
    assert!(!check_grid_cell("1/x", 0.0, 0.0, 1.0));
}

#[test]
fn on_implicit_curve() {
    let circle = "(x**2+y**2) - (1)";
    assert!(is_on_implicit_curve(circle, 1.0, 0.0, DEFAULT_TOLERANCE));
    assert!(is_on_implicit_curve(circle, 0.0, 1.02, DEFAULT_TOLERANCE));
    assert!(!is_on_implicit_curve(circle, 0.0, 0.0, DEFAULT_TOLERANCE));
    assert!(!is_on_implicit_curve("nope(", 1.0, 0.0, DEFAULT_TOLERANCE));
}

#[test]
fn parabola_cells() {
    let cells = marked("x^2", GridRange::new(-2, 2, 0, 4));
    assert_eq!(
        cells,
        vec![
            (-2, 1),
            (-2, 2),
            (-2, 3),
            (-2, 4),
            (-1, 0),
            (-1, 1),
            (0, 0),
            (1, 1),
            (1, 2),
            (1, 3),
            (2, 4),
        ]
    );
}

#[test]
fn unit_circle_cells() {
    let cells = marked("x^2+y^2=1", GridRange::new(-2, 1, -2, 1));
    assert_eq!(cells, vec![(-1, -1), (-1, 0), (0, -1), (0, 0)]);
}

#[test]
fn marks_stay_in_range() {
    let range = GridRange::new(-3, 3, -3, 3);
    for expr in ["x^3", "\\frac{1}{x}", "\\sin(x)*5", "x^2+y^2=9", "\\abs{x}+\\abs{y}=2"] {
        for (x, y) in marked(expr, range) {
            assert!(range.contains(GridCell::new(x, y)), "{expr} marked {x},{y}");
        }
    }
}

#[test]
fn last_write_wins() {
    let range = GridRange::new(-2, 1, -2, 1);
    let mut pixels = PixelMap::new();

    let n = mark("x^2+y^2=1", Syntax::Latex, range, "red", &mut pixels).unwrap();
    assert_eq!(n, 4);
    let n = mark("y=x", Syntax::Latex, range, "blue", &mut pixels).unwrap();
    assert_eq!(n, 40);

    assert_eq!(pixels.get(GridCell::new(-1, -1)), Some("blue"));
    assert_eq!(pixels.get(GridCell::new(0, 0)), Some("blue"));
    assert_eq!(pixels.get(GridCell::new(-1, 0)), Some("red"));
    assert_eq!(pixels.get(GridCell::new(0, -1)), Some("red"));
    assert_eq!(pixels.get(GridCell::new(-2, -2)), Some("blue"));
    assert_eq!(pixels.get(GridCell::new(-2, 1)), None);
}

#[test]
fn plain_syntax_marks_the_same() {
    let range = GridRange::new(-2, 2, 0, 4);
    let mut pixels = PixelMap::new();
    mark("x^2", Syntax::Plain, range, "c", &mut pixels).unwrap();

    let plain: Vec<_> = pixels.iter().map(|(c, _)| (c.x, c.y)).collect();
    assert_eq!(plain, marked("x^2", range));
}

#[test]
fn mark_invalid_input() {
    let range = GridRange::new(-2, 2, -2, 2);

    let mut pixels = PixelMap::new();
    assert!(mark("\\foo{x}", Syntax::Latex, range, "c", &mut pixels).is_err());
    assert!(mark("x +", Syntax::Plain, range, "c", &mut pixels).is_err());
    assert!(pixels.is_empty());

    let eq = ParsedEquation::explicit("x +".to_string());
    assert!(mark_equation(&eq, range, "c").is_empty());

    let eq = classify::parse("x^2+y^2=1");
    assert_eq!(mark_equation(&eq, range, "c").len(), 4);
}

#[test]
fn grid_cell_keys() {
    let c: GridCell = "-3, 4".parse().unwrap();
    assert_eq!(c, GridCell::new(-3, 4));
    assert_eq!(c.to_string(), "-3,4");

    assert!("3".parse::<GridCell>().is_err());
    assert!("a,1".parse::<GridCell>().is_err());
    assert!("1,2,3".parse::<GridCell>().is_err());
}

#[test]
fn pixel_map_json() {
    let mut pixels = PixelMap::new();
    pixels.insert(GridCell::new(1, -2), "#fff");
    pixels.insert(GridCell::new(0, 0), "red");
    assert_eq!(pixels.insert(GridCell::new(0, 0), "blue"), Some("red".to_string()));

    let json = serde_json::to_string(&pixels).unwrap();
    assert_eq!(json, r##"{"0,0":"blue","1,-2":"#fff"}"##);
}

#[test]
fn range_cells() {
    let range = GridRange::new(-1, 0, 5, 6);
    let cells: Vec<_> = range.cells().map(|c| (c.x, c.y)).collect();
    assert_eq!(cells, vec![(-1, 5), (-1, 6), (0, 5), (0, 6)]);

    assert!(range.contains(GridCell::new(0, 6)));
    assert!(!range.contains(GridCell::new(1, 6)));
}

#[test]
fn trace_line() {
    let strokes = trace("y=x", Syntax::Latex, &vp(8., 1.)).unwrap();
    assert_eq!(strokes.len(), 1);

    let pts = &strokes[0].points;
    assert_eq!(pts.len(), 5);
    assert_eq!(pts[0], Point { x: 0., y: 8. });
    assert_eq!(pts[4], Point { x: 8., y: 0. });
}

#[test]
fn trace_breaks_on_undefined_samples() {
    let strokes = trace("\\sqrt{x}", Syntax::Latex, &vp(8., 1.)).unwrap();
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].points[0], Point { x: 4., y: 4. });
    assert_eq!(strokes[0].points.len(), 3);

    let strokes = trace("\\frac{1}{x}", Syntax::Latex, &vp(8., 1.)).unwrap();
    assert_eq!(strokes.len(), 2);
    assert!(strokes[0].points.iter().all(|p| p.x < 4.));
    assert!(strokes[1].points.iter().all(|p| p.x > 4.));
}

#[test]
fn trace_implicit_circle() {
    let vp = vp(80., 10.);
    let strokes = trace("x^2+y^2=4", Syntax::Latex, &vp).unwrap();
    assert!(!strokes.is_empty());

    for s in &strokes {
        assert_eq!(s.points.len(), 2);
        let a = s.points[0];
        let b = s.points[1];
        assert_eq!((b.x - a.x, b.y - a.y), (BLOCK_STEP, BLOCK_STEP));

        let m = vp.to_math(a);
        let r = m.x.hypot(m.y);
        assert!((r - 2.).abs() < 0.6, "block at {a:?} is {r} from the origin");
    }

    let strokes = trace("x^2+y^2=-1", Syntax::Latex, &vp).unwrap();
    assert!(strokes.is_empty());
}

#[test]
fn viewport_mapping() {
    let vp = Viewport {
        width: 800.,
        height: 600.,
        offset_x: 400.,
        offset_y: 300.,
        grid_size: 24.,
    };

    assert_eq!(vp.to_math(Point { x: 400., y: 300. }), Point { x: 0., y: 0. });
    assert_eq!(vp.to_math(Point { x: 424., y: 276. }), Point { x: 1., y: 1. });
    assert_eq!(vp.to_screen(Point { x: -1., y: 2. }), Point { x: 376., y: 252. });

    for _ in 0..100 {
        let c = GridCell::new(fastrand::i64(-20..20), fastrand::i64(-20..20));
        let o = vp.cell_origin(c);
        assert_eq!(vp.cell_at(Point { x: o.x + 1., y: o.y + 1. }), c);
        let p = vp.to_screen(vp.to_math(o));
        assert!((p.x - o.x).abs() < 1e-9 && (p.y - o.y).abs() < 1e-9);
    }

    // just above and right of the origin
    assert_eq!(vp.cell_at(Point { x: 401., y: 299. }), GridCell::new(0, 0));
    assert_eq!(vp.cell_at(Point { x: 399., y: 301. }), GridCell::new(-1, -1));
}

#[test]
fn trace_unbounded_viewport() {
    for width in [f64::INFINITY, f64::NAN, -8.] {
        let vp = Viewport {
            width,
            height: 10.,
            offset_x: 0.,
            offset_y: 5.,
            grid_size: 1.,
        };
        assert!(trace("x^2+y^2=1", Syntax::Latex, &vp).unwrap().is_empty());
        assert!(trace("y=x", Syntax::Latex, &vp).unwrap().is_empty());
    }

    // columns come from an integer index, so the last one lands exactly on the edge
    let vp = Viewport {
        width: 1e6,
        height: 10.,
        offset_x: 0.,
        offset_y: 5.,
        grid_size: 1e5,
    };
    let strokes = trace("y=0", Syntax::Latex, &vp).unwrap();
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].points.len(), 500_001);
    assert_eq!(strokes[0].points.last().map(|p| p.x), Some(1e6));
}

#[test]
fn trace_implicit_skips_undefined_blocks() {
    let vp = vp(80., 10.);
    let f = pixplot::eval::Expr::parse(&classify::parse(r"\frac{1}{x}+y=0").expression).unwrap();

    let strokes = trace(r"\frac{1}{x}+y=0", Syntax::Latex, &vp).unwrap();
    assert!(!strokes.is_empty());

    for s in &strokes {
        let a = s.points[0];
        let (p0, p1) = (
            vp.to_math(a),
            vp.to_math(Point {
                x: a.x + BLOCK_STEP,
                y: a.y + BLOCK_STEP,
            }),
        );
        let corners = [
            f.eval(p0.x, p0.y),
            f.eval(p1.x, p0.y),
            f.eval(p0.x, p1.y),
            f.eval(p1.x, p1.y),
        ];
        assert!(corners.iter().all(|v| v.is_finite()), "block at {a:?}");
    }

    // the blocks either side of x = 0 touch the pole
    assert!(strokes.iter().all(|s| s.points[0].x != 36. && s.points[0].x != 40.));
    // both branches are still traced
    assert!(strokes.iter().any(|s| s.points[0].x < 36.));
    assert!(strokes.iter().any(|s| s.points[0].x > 40.));
}

#[test]
fn merge_overwrites() {
    let mut base = PixelMap::new();
    base.insert(GridCell::new(0, 0), "red");
    base.insert(GridCell::new(1, 0), "red");

    let mut top = PixelMap::new();
    top.insert(GridCell::new(1, 0), "blue");
    top.insert(GridCell::new(2, 0), "blue");

    base.merge(top);
    let got: Vec<_> = base.iter().map(|(c, col)| (c.x, col)).collect();
    assert_eq!(got, vec![(0, "red"), (1, "blue"), (2, "blue")]);
}
