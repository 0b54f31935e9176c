use super::{match_percentage, min_and_max, parse_cell, row_label, sanitize_filename};
use super::{Graph, GraphError, GraphKind, Timing};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Canvas size in pixels, 10 x 4.8 inches at 100 dpi.
pub const FIGURE_SIZE: (u32, u32) = (1000, 480);

pub const PERF_TITLE: &str = "1920x1080 RGBA frame convert speed";

const BAR_HEIGHT: f64 = 0.4;
const SINGLE_BAR_HEIGHT: f64 = 0.8;
const PAIR_OFFSETS: [f64; 2] = [-0.2, 0.2];
const FONT: &str = "sans-serif";

macro_rules! hexcolour {
    ($colour:literal) => {
        RGBColor(
            (($colour & 0xFF0000) >> 16) as u8,
            (($colour & 0x00FF00) >> 8) as u8,
            ($colour & 0x0000FF) as u8,
        )
    };
}

/// category palette, cycled over the bars
pub const PALETTE: [RGBColor; 10] = [
    hexcolour!(0x1f77b4),
    hexcolour!(0xff7f0e),
    hexcolour!(0x2ca02c),
    hexcolour!(0xd62728),
    hexcolour!(0x9467bd),
    hexcolour!(0x8c564b),
    hexcolour!(0xe377c2),
    hexcolour!(0x7f7f7f),
    hexcolour!(0xbcbd22),
    hexcolour!(0x17becf),
];

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for GraphError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        GraphError::Render(e.to_string())
    }
}

/// The two graphs compared by the speed chart: the first two groups of the csv.
pub fn perf_pair(graphs: &[Graph]) -> Result<(&Graph, &Graph), GraphError> {
    match graphs {
        [a, b, ..] => Ok((a, b)),
        _ => Err(GraphError::NotEnoughGraphs {
            expected: 2,
            found: graphs.len(),
        }),
    }
}

/// Creates `outdir` if needed and returns `outdir/<sanitized title>.png`.
pub fn output_path(outdir: &Path, title: &str) -> Result<PathBuf, GraphError> {
    if !outdir.exists() {
        debug!("creating output directory {}", outdir.display());
        std::fs::create_dir_all(outdir)?;
    }
    Ok(outdir.join(format!("{}.png", sanitize_filename(title))))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingSeries {
    pub name: String,
    pub timings: Vec<Timing>,
}

/// Side by side timings of two perf graphs, paired row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct PerfComparison {
    pub title: String,
    /// environment part of the title on one line, used for the file name
    pub file_title: String,
    pub labels: Vec<String>,
    pub series: [TimingSeries; 2],
}

impl PerfComparison {
    pub fn new(a: &Graph, b: &Graph, title: &str) -> Result<PerfComparison, GraphError> {
        if a.data.len() != b.data.len() {
            warn!(
                "{:?} has {} rows and {:?} has {} rows, extra rows are not plotted",
                a.name,
                a.data.len(),
                b.name,
                b.data.len()
            );
        }
        let mut labels = Vec::with_capacity(a.data.len());
        let mut timings_a = Vec::with_capacity(a.data.len());
        let mut timings_b = Vec::with_capacity(a.data.len());
        for (row_a, row_b) in a.data.iter().zip(b.data.iter()) {
            labels.push(row_label(row_a).to_owned());
            timings_a.push(Timing::from_row(row_a)?);
            timings_b.push(Timing::from_row(row_b)?);
        }
        let env = a.env.describe();
        Ok(PerfComparison {
            title: format!("{}\n{}", title, env),
            file_title: env.replace('\n', " "),
            labels,
            series: [
                TimingSeries {
                    name: a.name.clone(),
                    timings: timings_a,
                },
                TimingSeries {
                    name: b.name.clone(),
                    timings: timings_b,
                },
            ],
        })
    }

    fn x_range(&self) -> Range<f64> {
        let extents: Vec<f64> = self
            .series
            .iter()
            .flat_map(|s| s.timings.iter())
            .flat_map(|t| vec![t.low(), t.high()])
            .collect();
        axis_range(&extents)
    }

    pub fn draw(&self, outimage: &Path) -> Result<(), GraphError> {
        let root = BitMapBackend::new(outimage, FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let area = titled(&root, &self.title)?;
        let labels = &self.labels;
        let mut chart = ChartBuilder::on(&area)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(200)
            .build_cartesian_2d(self.x_range(), row_range(labels.len()))?;
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(labels.len().max(1))
            .y_label_formatter(&|y: &f64| row_tick(labels, *y))
            .label_style((FONT, 14))
            .x_desc("Seconds (less is better)")
            .draw()?;

        for (i, (series, offset)) in self.series.iter().zip(PAIR_OFFSETS.iter()).enumerate() {
            let colour = PALETTE[i % PALETTE.len()];
            chart
                .draw_series(series.timings.iter().enumerate().map(|(row, t)| {
                    let y = row as f64 + offset;
                    Rectangle::new(
                        [(0.0, y - BAR_HEIGHT / 2.0), (t.value, y + BAR_HEIGHT / 2.0)],
                        colour.filled(),
                    )
                }))?
                .label(series.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], colour.filled()));
            chart.draw_series(series.timings.iter().enumerate().map(|(row, t)| {
                ErrorBar::new_horizontal(
                    row as f64 + offset,
                    t.low(),
                    t.value,
                    t.high(),
                    BLACK.stroke_width(1),
                    6,
                )
            }))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font((FONT, 14))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
        root.present()?;
        Ok(())
    }
}

/// Render the speed comparison of two perf graphs into `outdir`.
pub fn draw_perf_graph(
    a: &Graph,
    b: &Graph,
    outdir: &Path,
    title: &str,
) -> Result<PathBuf, GraphError> {
    let comparison = PerfComparison::new(a, b, title)?;
    let outimage = output_path(outdir, &comparison.file_title)?;
    info!(
        "plot {:?} vs {:?} to {}",
        a.name,
        b.name,
        outimage.display()
    );
    comparison.draw(&outimage)?;
    Ok(outimage)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccuracyBars {
    /// perf_test rows, plotted with min/max error bars
    Timings(Vec<Timing>),
    /// percentage of matching values; `total` comes from the last row
    Percentages { values: Vec<f64>, total: i64 },
}

/// Single-graph chart, one bar per data row.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyChart {
    pub title: String,
    pub labels: Vec<String>,
    pub bars: AccuracyBars,
}

impl AccuracyChart {
    pub fn new(graph: &Graph) -> Result<AccuracyChart, GraphError> {
        let labels = graph
            .data
            .iter()
            .map(|row| row_label(row).to_owned())
            .collect();
        let (title, bars) = match graph.kind {
            GraphKind::PerfTest => {
                let timings = graph
                    .data
                    .iter()
                    .map(|row| Timing::from_row(row))
                    .collect::<Result<Vec<_>, _>>()?;
                (
                    format!("{}\n{}", graph.name, graph.env.describe()),
                    AccuracyBars::Timings(timings),
                )
            }
            GraphKind::Other(_) => {
                let mut values = Vec::with_capacity(graph.data.len());
                let mut total = 0;
                for row in graph.data.iter() {
                    let mismatched = parse_cell(row, 1)?;
                    let row_total = parse_cell(row, 2)?;
                    if row_total == 0.0 {
                        return Err(GraphError::ZeroTotal {
                            label: row_label(row).to_owned(),
                        });
                    }
                    values.push(match_percentage(mismatched, row_total));
                    total = row_total as i64;
                }
                (
                    graph.name.clone(),
                    AccuracyBars::Percentages { values, total },
                )
            }
        };
        Ok(AccuracyChart {
            title,
            labels,
            bars,
        })
    }

    pub fn x_desc(&self) -> String {
        match &self.bars {
            AccuracyBars::Timings(_) => "Seconds".to_owned(),
            AccuracyBars::Percentages { total, .. } => format!(
                "Percentage Of Values That Match ( Out Of {} Values)",
                total
            ),
        }
    }

    fn x_range(&self) -> Range<f64> {
        match &self.bars {
            AccuracyBars::Timings(timings) => {
                let extents: Vec<f64> = timings
                    .iter()
                    .flat_map(|t| vec![t.low(), t.high()])
                    .collect();
                axis_range(&extents)
            }
            AccuracyBars::Percentages { values, .. } => axis_range(values),
        }
    }

    pub fn draw(&self, outimage: &Path) -> Result<(), GraphError> {
        let root = BitMapBackend::new(outimage, FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let area = titled(&root, &self.title)?;
        let labels = &self.labels;
        let percent = matches!(self.bars, AccuracyBars::Percentages { .. });
        let mut chart = ChartBuilder::on(&area)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(200)
            .build_cartesian_2d(self.x_range(), row_range(labels.len()))?;
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(labels.len().max(1))
            .y_label_formatter(&|y: &f64| row_tick(labels, *y))
            .x_label_formatter(&|x: &f64| {
                if percent {
                    format!("{} %", tick(*x))
                } else {
                    tick(*x)
                }
            })
            .label_style((FONT, 14))
            .x_desc(self.x_desc())
            .draw()?;

        let bar = |row: usize, value: f64| {
            let y = row as f64;
            Rectangle::new(
                [
                    (0.0, y - SINGLE_BAR_HEIGHT / 2.0),
                    (value, y + SINGLE_BAR_HEIGHT / 2.0),
                ],
                PALETTE[row % PALETTE.len()].filled(),
            )
        };
        match &self.bars {
            AccuracyBars::Timings(timings) => {
                chart.draw_series(timings.iter().enumerate().map(|(row, t)| bar(row, t.value)))?;
                chart.draw_series(timings.iter().enumerate().map(|(row, t)| {
                    ErrorBar::new_horizontal(
                        row as f64,
                        t.low(),
                        t.value,
                        t.high(),
                        BLACK.stroke_width(1),
                        8,
                    )
                }))?;
            }
            AccuracyBars::Percentages { values, .. } => {
                chart.draw_series(values.iter().enumerate().map(|(row, v)| bar(row, *v)))?;
                let style = TextStyle::from((FONT, 14).into_font())
                    .pos(Pos::new(HPos::Center, VPos::Center));
                chart.draw_series(values.iter().enumerate().map(|(row, v)| {
                    Text::new(format!("{:.2}%", v), (v / 2.0, row as f64), style.clone())
                }))?;
            }
        }
        root.present()?;
        Ok(())
    }
}

/// Render a single graph into `outdir`: timings for perf graphs, match
/// percentages for everything else.
pub fn draw_accuracy_graph(graph: &Graph, outdir: &Path) -> Result<PathBuf, GraphError> {
    let chart = AccuracyChart::new(graph)?;
    let outimage = output_path(outdir, &chart.title)?;
    info!("plot {} {:?} to {}", graph.kind, graph.name, outimage.display());
    chart.draw(&outimage)?;
    Ok(outimage)
}

/// Draw each title line on its own row above the chart.
fn titled<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
) -> Result<DrawingArea<DB, Shift>, DrawingAreaErrorKind<DB::ErrorType>> {
    let mut lines = title.lines();
    let mut area = root.titled(lines.next().unwrap_or(""), (FONT, 20))?;
    for line in lines {
        area = area.titled(line, (FONT, 20))?;
    }
    Ok(area)
}

/// Value axis from zero (or the lowest value, if negative) to the highest
/// value, with a 5% margin.
fn axis_range(values: &[f64]) -> Range<f64> {
    let mut values = values.to_vec();
    values.push(0.0);
    let (min, max) = min_and_max(&values).unwrap_or((0.0, 0.0));
    let span = max - min;
    if span <= 0.0 {
        return min..min + 1.0;
    }
    let margin = span * 0.05;
    let low = if min < 0.0 { min - margin } else { min };
    low..max + margin
}

/// Rows sit at 0, 1, .., n - 1.
fn row_range(rows: usize) -> Range<f64> {
    -0.5..rows.max(1) as f64 - 0.5
}

/// label of the row at tick `y`, empty between rows
fn row_tick(labels: &[String], y: f64) -> String {
    let row = y.round();
    if (y - row).abs() > 1e-6 || row < 0.0 {
        return String::new();
    }
    labels.get(row as usize).cloned().unwrap_or_default()
}

/// tick value without float noise
fn tick(x: f64) -> String {
    format!("{}", (x * 1e6).round() / 1e6)
}
