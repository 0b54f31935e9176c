use bench_graph::chart::{draw_accuracy_graph, draw_perf_graph, perf_pair};
use bench_graph::extract_graph_data;
use bench_graph::plot::{init_logging, parse_cli, PlotArgs};
use bench_graph::GraphError;
use eyre::Result;
use tracing::info;

fn main() -> Result<()> {
    let args = parse_cli();
    init_logging(args.verbose);
    run(&args)?;
    Ok(())
}

fn run(args: &PlotArgs) -> Result<(), GraphError> {
    info!(
        "read data from {} and plot to {}",
        args.csvin.display(),
        args.outdir.display()
    );
    let graphs = extract_graph_data(&args.csvin)?;
    let (a, b) = perf_pair(&graphs)?;
    draw_perf_graph(a, b, &args.outdir, &args.title)?;

    if args.accuracy_graph {
        for graph in &graphs[2..] {
            draw_accuracy_graph(graph, &args.outdir)?;
        }
    }
    Ok(())
}
