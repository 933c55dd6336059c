use pixplot::{
    data::{CsvReader, FunctionItem, FunctionList, PALETTE},
    raster::{GridCell, GridRange},
};
use std::io::Cursor;

fn read(csv: &'static str) -> miette::Result<FunctionList> {
    CsvReader::new(Cursor::new(csv)).into_functions()
}

fn chain_contains(e: &miette::Report, needle: &str) -> bool {
    e.chain().any(|c| c.to_string().contains(needle))
}

const LIST: &str = "\
Expression,Color,LaTeX,Visible
x^2+y^2=1,red,true,
x,blue,false,yes
x^2,green,,false
";

#[test]
fn reads_items() {
    let list = read(LIST).unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(
        list.items()[1],
        FunctionItem {
            expression: "x".to_string(),
            color: "blue".to_string(),
            latex: false,
            visible: true,
        }
    );
    assert!(list.items()[0].latex && list.items()[0].visible);
    assert!(list.items()[2].latex && !list.items()[2].visible);
}

#[test]
fn marks_in_order_skipping_hidden() {
    let pixels = read(LIST).unwrap().mark(GridRange::new(-2, 1, -2, 1));

    let got: Vec<_> = pixels.iter().map(|(c, col)| (c.x, c.y, col)).collect();
    assert_eq!(
        got,
        vec![
            (-2, -2, "blue"),
            (-1, -1, "blue"),
            (-1, 0, "red"),
            (0, -1, "red"),
            (0, 0, "blue"),
            (1, 1, "blue"),
        ]
    );
}

#[test]
fn bad_rows_are_skipped() {
    let list = read(
        "expression,color
\\foo{x},red
,red
x^2+y^2=1,blue
",
    )
    .unwrap();

    let pixels = list.mark(GridRange::new(-2, 1, -2, 1));
    assert_eq!(pixels.len(), 4);
    assert!(pixels.iter().all(|(_, c)| c == "blue"));
}

#[test]
fn headers_are_loose() {
    let list = read(" EXPRESSION , c o l o r \nx,red\n").unwrap();
    assert_eq!(list.items()[0].color, "red");
    assert!(list.items()[0].latex);
}

#[test]
fn palette_fallback() {
    let list = read("expression,color\nx,\nx+1,  \nx+2,#000\n").unwrap();
    let colors: Vec<_> = list.items().iter().map(|f| f.color.as_str()).collect();
    assert_eq!(colors, vec![PALETTE[0], PALETTE[1], "#000"]);
    assert_eq!(PALETTE[0], "#ffffff");

    let mut csv = String::from("expression,color\n");
    for _ in 0..14 {
        csv.push_str("x,\n");
    }
    let list = CsvReader::new(Cursor::new(csv)).into_functions().unwrap();
    assert_eq!(list.items()[12].color, PALETTE[0]);
    assert_eq!(list.items()[13].color, PALETTE[1]);
}

#[test]
fn missing_column() {
    let e = read("expr,color\nx,red\n").unwrap_err();
    assert!(chain_contains(&e, "could not find column 'expression'"), "{e:?}");

    let e = read("expression\nx\n").unwrap_err();
    assert!(chain_contains(&e, "could not find column 'color'"), "{e:?}");
}

#[test]
fn bad_flag() {
    let e = read("expression,color,visible\nx,red,maybe\n").unwrap_err();
    assert!(chain_contains(&e, "expected a true/false flag, found 'maybe'"), "{e:?}");
    assert!(chain_contains(&e, "in row index 1"), "{e:?}");

    let list = read("expression,color,latex,visible\nx,red,N,0\nx,red,Yes,1\n").unwrap();
    assert!(!list.items()[0].latex && !list.items()[0].visible);
    assert!(list.items()[1].latex && list.items()[1].visible);
}

#[test]
fn empty_list() {
    let list = read("expression,color\n").unwrap();
    assert_eq!(list.len(), 0);
    assert!(list.mark(GridRange::new(0, 1, 0, 1)).is_empty());

    assert!(read("").is_err());
}

#[test]
fn constant_function() {
    let list = read("expression,color\ny=1,red\n").unwrap();
    let pixels = list.mark(GridRange::new(0, 0, 0, 1));
    assert_eq!(pixels.get(GridCell::new(0, 1)), Some("red"));
    assert_eq!(pixels.get(GridCell::new(0, 0)), None);
}
