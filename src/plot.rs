use super::chart::PERF_TITLE;
use super::{DT_FORMAT, OUTPUT_DIR, VERSION};
use clap::{App, Arg, ArgMatches};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Options for plotting the benchmark results.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArgs {
    pub csvin: PathBuf,
    pub accuracy_graph: bool,
    pub outdir: PathBuf,
    pub title: String,
    pub verbose: bool,
}

fn cli_app() -> App<'static, 'static> {
    let arg_csvin = Arg::with_name("csv_file")
        .help("csv file with the benchmark results")
        .required(true)
        .index(1);
    let arg_accuracy = Arg::with_name("accuracy_graph")
        .help("also plot one chart per group after the first two")
        .short("a")
        .long("accuracy-graph")
        .takes_value(false);
    let arg_outdir = Arg::with_name("outdir")
        .help("directory for the png files, created if missing")
        .short("o")
        .long("outdir")
        .takes_value(true)
        .default_value(OUTPUT_DIR);
    let arg_title = Arg::with_name("title")
        .help("first title line of the speed comparison chart")
        .short("t")
        .long("title")
        .takes_value(true)
        .default_value(PERF_TITLE);
    let arg_verbose = Arg::with_name("verbose")
        .help("print debug information")
        .short("v")
        .long("verbose")
        .takes_value(false);
    App::new("bench_graph")
        .version(VERSION.unwrap_or("unknown"))
        .about("create bar charts from benchmark results")
        .arg(arg_csvin)
        .arg(arg_accuracy)
        .arg(arg_outdir)
        .arg(arg_title)
        .arg(arg_verbose)
}

fn from_matches(cli_args: &ArgMatches) -> PlotArgs {
    PlotArgs {
        csvin: PathBuf::from(cli_args.value_of("csv_file").unwrap_or_default()),
        accuracy_graph: cli_args.is_present("accuracy_graph"),
        outdir: PathBuf::from(cli_args.value_of("outdir").unwrap_or(OUTPUT_DIR)),
        title: String::from(cli_args.value_of("title").unwrap_or(PERF_TITLE)),
        verbose: cli_args.is_present("verbose"),
    }
}

/// Takes the CLI arguments that control the plotting, exits on bad usage.
pub fn parse_cli() -> PlotArgs {
    from_matches(&cli_app().get_matches())
}

/// Same as `parse_cli`, from an explicit argument list (program name first).
pub fn parse_cli_from<I, T>(args: I) -> Result<PlotArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Ok(from_matches(&cli_app().get_matches_from_safe(args)?))
}

/// Log to stderr with local timestamps.
/// `RUST_LOG` wins over the verbose flag when set.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bench_graph={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new(DT_FORMAT.to_owned()))
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = parse_cli_from(vec!["bench_graph", "results.csv"]).unwrap();
        assert_eq!(
            args,
            PlotArgs {
                csvin: PathBuf::from("results.csv"),
                accuracy_graph: false,
                outdir: PathBuf::from("images"),
                title: PERF_TITLE.to_owned(),
                verbose: false,
            }
        );
    }

    #[test]
    fn all_flags() {
        let args = parse_cli_from(vec![
            "bench_graph",
            "-a",
            "--outdir",
            "out/charts",
            "-t",
            "convert speed",
            "-v",
            "results.csv",
        ])
        .unwrap();
        assert!(args.accuracy_graph);
        assert!(args.verbose);
        assert_eq!(args.outdir, PathBuf::from("out/charts"));
        assert_eq!(args.title, "convert speed");
        assert_eq!(args.csvin, PathBuf::from("results.csv"));

        let args = parse_cli_from(vec!["bench_graph", "results.csv", "--accuracy-graph"]).unwrap();
        assert!(args.accuracy_graph);
    }

    #[test]
    fn csv_file_is_required() {
        assert!(parse_cli_from(vec!["bench_graph"]).is_err());
        assert!(parse_cli_from(vec!["bench_graph", "--accuracy-graph"]).is_err());
    }
}
