use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
pub mod chart;
pub mod plot;

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

pub const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default directory for the rendered charts.
pub const OUTPUT_DIR: &str = "images";

pub const PERF_TEST_TAG: &str = "perf_test";

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing environment info: {0}")]
    MissingEnvironment(String),
    #[error("malformed group at row {row}, expected a type and a name")]
    MalformedGroup { row: usize },
    #[error("group {name:?} at row {row} has no header row")]
    MissingHeaders { name: String, row: usize },
    #[error("row {label:?} has no column {column}")]
    MissingColumn { label: String, column: usize },
    #[error("invalid number {value:?} in row {label:?}")]
    InvalidNumber { label: String, value: String },
    #[error("total is zero in row {label:?}")]
    ZeroTotal { label: String },
    #[error("expected at least {expected} graphs, found {found}")]
    NotEnoughGraphs { expected: usize, found: usize },
    #[error("render failed: {0}")]
    Render(String),
}

/// Machine the benchmark ran on, from the first two csv rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvInfo {
    pub arch: Option<String>,
    pub cpu_name: Option<String>,
    pub extensions: Option<String>,
    pub os_name: String,
    pub compiler: String,
}

impl EnvInfo {
    /// Row 0 is positional and may be short (`arch[,cpu[,extensions]]`),
    /// row 1 must carry both the os name and the compiler.
    fn from_rows(rows: &[Vec<String>]) -> Result<EnvInfo, GraphError> {
        let cpu = rows
            .first()
            .ok_or_else(|| GraphError::MissingEnvironment("empty input".to_owned()))?;
        let platform = rows
            .get(1)
            .ok_or_else(|| GraphError::MissingEnvironment("no os/compiler row".to_owned()))?;
        if platform.len() < 2 {
            return Err(GraphError::MissingEnvironment(format!(
                "expected os name and compiler, found {} field(s)",
                platform.len()
            )));
        }
        Ok(EnvInfo {
            arch: cpu.get(0).cloned(),
            cpu_name: cpu.get(1).cloned(),
            extensions: cpu.get(2).cloned(),
            os_name: platform[0].clone(),
            compiler: platform[1].clone(),
        })
    }

    pub fn cpu_name_or_unknown(&self) -> &str {
        self.cpu_name.as_deref().unwrap_or("unknown")
    }

    /// `<cpu name>\n<os name> <compiler>`, as shown under the chart titles
    pub fn describe(&self) -> String {
        format!(
            "{}\n{} {}",
            self.cpu_name_or_unknown(),
            self.os_name,
            self.compiler
        )
        .trim()
        .to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphKind {
    PerfTest,
    Other(String),
}

impl GraphKind {
    pub fn from_tag(tag: &str) -> GraphKind {
        if tag == PERF_TEST_TAG {
            GraphKind::PerfTest
        } else {
            GraphKind::Other(tag.to_owned())
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            GraphKind::PerfTest => PERF_TEST_TAG,
            GraphKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One group of the results csv: a type/name row, a header row and the data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    pub kind: GraphKind,
    pub name: String,
    pub env: EnvInfo,
    pub headers: Vec<String>,
    pub data: Vec<Vec<String>>,
}

/// Read the results csv at the given path and split it into graphs.
pub fn extract_graph_data<P: AsRef<Path>>(fin: P) -> Result<Vec<Graph>, GraphError> {
    let file = File::open(fin)?;
    extract_graph_data_from_reader(BufReader::new(file))
}

/// Split the results csv into graphs.
/// Rows 0 and 1 hold the environment info; from row 2 on a blank row closes
/// the open group, a non-blank row opens a group when none is open (the row
/// after it is the header row), any other row is data.
/// A group still open at the end of the input is kept.
pub fn extract_graph_data_from_reader<R: Read>(reader: R) -> Result<Vec<Graph>, GraphError> {
    let rows = read_rows(reader)?;
    let env = EnvInfo::from_rows(&rows)?;
    debug!("environment: {:?}", env);

    let mut graphs = Vec::new();
    let mut current: Option<Graph> = None;
    let mut index = 2;
    while index < rows.len() {
        let row = &rows[index];
        if row.is_empty() {
            if let Some(graph) = current.take() {
                debug!("{} {:?}: {} rows", graph.kind, graph.name, graph.data.len());
                graphs.push(graph);
            }
        } else if let Some(graph) = current.as_mut() {
            graph.data.push(row.clone());
        } else {
            if row.len() < 2 {
                return Err(GraphError::MalformedGroup { row: index + 1 });
            }
            let name = row[1].trim().to_owned();
            let headers = match rows.get(index + 1) {
                Some(h) if !h.is_empty() => h.clone(),
                _ => {
                    return Err(GraphError::MissingHeaders {
                        name,
                        row: index + 1,
                    })
                }
            };
            current = Some(Graph {
                kind: GraphKind::from_tag(row[0].trim()),
                name,
                env: env.clone(),
                headers,
                data: Vec::new(),
            });
            index += 1;
        }
        index += 1;
    }
    if let Some(graph) = current {
        debug!("{} {:?}: {} rows", graph.kind, graph.name, graph.data.len());
        graphs.push(graph);
    }
    Ok(graphs)
}

/// All csv rows, with an empty row standing for each blank line.
/// The csv reader drops blank lines, so the input is cut into blank-separated
/// blocks first and each block is parsed on its own.
/// A blank line inside a quoted field belongs to the field.
fn read_rows<R: Read>(mut reader: R) -> Result<Vec<Vec<String>>, GraphError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let mut rows = Vec::new();
    let mut block = String::new();
    let mut in_quotes = false;
    for line in text.lines() {
        if line.trim().is_empty() && !in_quotes {
            parse_block(&block, &mut rows)?;
            block.clear();
            rows.push(Vec::new());
        } else {
            // escaped quotes come in pairs, so an odd count toggles the state
            if line.matches('"').count() % 2 == 1 {
                in_quotes = !in_quotes;
            }
            block.push_str(line);
            block.push('\n');
        }
    }
    parse_block(&block, &mut rows)?;
    Ok(rows)
}

fn parse_block(block: &str, rows: &mut Vec<Vec<String>>) -> Result<(), GraphError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(block.as_bytes());
    for record in rdr.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok(())
}

pub fn row_label(row: &[String]) -> &str {
    row.first().map(String::as_str).unwrap_or("")
}

/// parse the numeric cell at `column`, ignoring surrounding whitespace
pub fn parse_cell(row: &[String], column: usize) -> Result<f64, GraphError> {
    let cell = row.get(column).ok_or_else(|| GraphError::MissingColumn {
        label: row_label(row).to_owned(),
        column,
    })?;
    cell.trim().parse().map_err(|_| GraphError::InvalidNumber {
        label: row_label(row).to_owned(),
        value: cell.clone(),
    })
}

/// Timing of a `perf_test` row, `[name, min, avg, max]`.
/// The errors are the distances of min and max from the average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub value: f64,
    pub err_low: f64,
    pub err_high: f64,
}

impl Timing {
    pub fn from_row(row: &[String]) -> Result<Timing, GraphError> {
        let value = parse_cell(row, 2)?;
        let err_low = (parse_cell(row, 1)? - value).abs();
        let err_high = (parse_cell(row, 3)? - value).abs();
        Ok(Timing {
            value,
            err_low,
            err_high,
        })
    }

    pub fn low(&self) -> f64 {
        self.value - self.err_low
    }

    pub fn high(&self) -> f64 {
        self.value + self.err_high
    }
}

/// Percentage of the `total` values that matched, given the `mismatched` count.
pub fn match_percentage(mismatched: f64, total: f64) -> f64 {
    (total - mismatched) / total * 100.0
}

/// Turn a chart title into a file name: only alphanumerics and spaces are
/// kept (newlines are dropped), trailing spaces are dropped and the remaining
/// spaces become underscores.
pub fn sanitize_filename(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect();
    kept.trim_end().replace(' ', "_")
}

/// min and max of a slice, None when it is empty
pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Option<(T, T)> {
    let mut s_iter = s.iter();
    let (mut min, mut max) = match s_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in s_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}
