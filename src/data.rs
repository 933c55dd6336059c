use super::*;
use raster::{GridRange, PixelMap};

pub struct Headers(Vec<String>);

/// Colours handed out, in order, to functions which do not name one.
pub const PALETTE: [&str; 12] = [
    "#ffffff", "#1a1a2e", "#e74c3c", "#e67e22", "#f1c40f", "#2ecc71", "#3498db", "#9b59b6",
    "#1abc9c", "#e91e63", "#795548", "#607d8b",
];

/// One entry of a function list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionItem {
    pub expression: String,
    pub color: String,
    /// Written in the LaTeX subset rather than plain calculator syntax.
    pub latex: bool,
    pub visible: bool,
}

/// An ordered list of functions, marked first to last.
#[derive(Debug)]
pub struct FunctionList(Vec<FunctionItem>);

impl Headers {
    pub fn find_ignore_case_and_ws(&self, s: &str) -> Option<usize> {
        let s = strip_ws(s);
        self.find_match(|x| strip_ws(x).eq_ignore_ascii_case(&s))
    }

    pub fn find_match<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(&str) -> bool,
    {
        self.0
            .iter()
            .enumerate()
            .find_map(|(i, x)| predicate(x).then_some(i))
    }
}

impl<T: AsRef<str>> FromIterator<T> for Headers {
    fn from_iter<I: IntoIterator<Item = T>>(i: I) -> Self {
        Headers(
            i.into_iter()
                .map(|t| t.as_ref().trim().to_string())
                .collect(),
        )
    }
}

fn strip_ws(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Help text pointing at the closest header, if any is close.
pub fn match_hdr_help(hdrs: &Headers, name: &str) -> String {
    match did_you_mean(name, hdrs.0.iter().map(String::as_str)) {
        Some(h) => format!("did you mean '{h}'?"),
        None => format!("available headers: {}", hdrs.0.join(", ")),
    }
}

impl FunctionList {
    pub fn new(items: Vec<FunctionItem>) -> Self {
        Self(items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn items(&self) -> &[FunctionItem] {
        &self.0
    }

    /// Mark every visible function into one map, later functions overwriting earlier ones.
    ///
    /// A function which fails to parse is skipped with a warning, the rest are still marked.
    pub fn mark(&self, range: GridRange) -> PixelMap {
        let mut pixels = PixelMap::new();

        for (i, f) in self
            .0
            .iter()
            .enumerate()
            .filter(|(_, f)| f.visible && !f.expression.is_empty())
        {
            let syntax = if f.latex { Syntax::Latex } else { Syntax::Plain };
            let mut layer = PixelMap::new();
            match mark(&f.expression, syntax, range, &f.color, &mut layer) {
                Ok(_) => pixels.merge(layer),
                Err(e) => log::warn!("skipping function {}: {e:?}", i + 1),
            }
        }

        pixels
    }
}

pub struct CsvReader {
    rdr: csv::Reader<Box<dyn std::io::Read>>,
    cols: Option<Headers>,
}

impl CsvReader {
    pub fn new<R: std::io::Read + 'static>(rdr: R) -> Self {
        Self {
            rdr: csv::Reader::from_reader(Box::new(rdr)),
            cols: None,
        }
    }

    fn read_headers(&mut self) -> Result<()> {
        let hdrs = self
            .rdr
            .headers()
            .into_diagnostic()
            .wrap_err("failed to read CSV header row")?;

        ensure!(!hdrs.is_empty(), "headers row is empty");

        self.cols = Some(hdrs.iter().collect());
        Ok(())
    }

    pub fn headers(&mut self) -> Result<&Headers> {
        if self.cols.is_none() {
            self.read_headers()?;
        }

        self.cols
            .as_ref()
            .map(Ok)
            .expect("should be some if read_headers succeeds")
    }

    pub fn into_functions(self) -> Result<FunctionList> {
        FunctionList::try_from(self)
    }
}

impl TryFrom<CsvReader> for FunctionList {
    type Error = miette::Report;

    fn try_from(mut rdr: CsvReader) -> Result<FunctionList> {
        let hdrs = rdr.headers()?;

        let required = |name: &str| {
            hdrs.find_ignore_case_and_ws(name)
                .ok_or_else(|| miette!("could not find column '{}' in headers", name))
                .wrap_err_with(|| match_hdr_help(hdrs, name))
        };
        let expression = required("expression")?;
        let color = required("color")?;
        let latex = hdrs.find_ignore_case_and_ws("latex");
        let visible = hdrs.find_ignore_case_and_ws("visible");

        let mut items = Vec::new();

        for (i, row) in rdr.rdr.records().enumerate() {
            let row = row
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to read row {} in CSV", i + 1))?;

            let flag = |col: Option<usize>| -> Result<bool> {
                match col.and_then(|j| row.get(j)).map(str::trim) {
                    None | Some("") => Ok(true),
                    Some(v) => parse_flag(v)
                        .wrap_err_with(|| format!("in column index {}", col.unwrap_or_default()))
                        .wrap_err_with(|| format!("in row index {}", i + 1)),
                }
            };

            items.push(FunctionItem {
                expression: row.get(expression).unwrap_or_default().trim().to_string(),
                color: match row.get(color).map(str::trim) {
                    Some(c) if !c.is_empty() => c.to_string(),
                    _ => PALETTE[i % PALETTE.len()].to_string(),
                },
                latex: flag(latex)?,
                visible: flag(visible)?,
            });
        }

        Ok(FunctionList(items))
    }
}

fn parse_flag(v: &str) -> Result<bool> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(miette!("expected a true/false flag, found '{v}'")),
    }
}
