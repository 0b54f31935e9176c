use bench_graph::chart::{
    draw_accuracy_graph, draw_perf_graph, output_path, perf_pair, AccuracyBars, AccuracyChart,
    PerfComparison, PERF_TITLE,
};
use bench_graph::{extract_graph_data, GraphError, GraphKind};
use std::fs;

const RESULTS: &str = "x86_64,Some CPU @ 3.00GHz,sse2 avx f16c
Linux,gcc 12.2

perf_test,runs: 10 buffer size: 100 random f32 <= HALF_MAX,
name,min,avg,max
table,0.010,0.012,0.020
ryg,0.008,0.009,0.011

perf_test,runs: 10 buffer size: 100 random f32 full +inf+nan,
name,min,avg,max
table,0.011,0.013,0.021
ryg,0.009,0.010,0.012

error_test,normal and denormal value matches hardware
name,error,total
table,0,1000
ryg,250,1000

";

#[test]
fn results_file_to_charts() {
    let tmp = tempfile::tempdir().unwrap();
    let csvin = tmp.path().join("float2half_result.csv");
    fs::write(&csvin, RESULTS).unwrap();

    let graphs = extract_graph_data(&csvin).unwrap();
    assert_eq!(graphs.len(), 3);
    assert_eq!(graphs[2].kind, GraphKind::Other("error_test".to_owned()));

    let (a, b) = perf_pair(&graphs).unwrap();
    let comparison = PerfComparison::new(a, b, PERF_TITLE).unwrap();
    assert_eq!(comparison.labels, vec!["table".to_owned(), "ryg".to_owned()]);
    assert_eq!(
        comparison.series[1].name,
        "runs: 10 buffer size: 100 random f32 full +inf+nan"
    );

    let outimage = output_path(&tmp.path().join("images"), &comparison.file_title).unwrap();
    assert_eq!(
        outimage.file_name().unwrap().to_str().unwrap(),
        "Some_CPU__300GHz_Linux_gcc_122.png"
    );

    let accuracy = AccuracyChart::new(&graphs[2]).unwrap();
    match accuracy.bars {
        AccuracyBars::Percentages { values, total } => {
            assert_eq!(values, vec![100.0, 75.0]);
            assert_eq!(total, 1000);
        }
        other => panic!("unexpected bars {:?}", other),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = extract_graph_data(tmp.path().join("missing.csv")).unwrap_err();
    assert!(matches!(err, GraphError::Io(_)));
}

#[test]
fn charts_are_written_as_png() {
    let tmp = tempfile::tempdir().unwrap();
    let csvin = tmp.path().join("float2half_result.csv");
    fs::write(&csvin, RESULTS).unwrap();
    let graphs = extract_graph_data(&csvin).unwrap();
    let outdir = tmp.path().join("images");

    let (a, b) = perf_pair(&graphs).unwrap();
    let perf = draw_perf_graph(a, b, &outdir, PERF_TITLE).unwrap();
    assert_eq!(perf, outdir.join("Some_CPU__300GHz_Linux_gcc_122.png"));

    // timings of a single perf group
    let timings = draw_accuracy_graph(&graphs[0], &outdir).unwrap();
    assert_eq!(
        timings,
        outdir.join("runs_10_buffer_size_100_random_f32__HALFMAXSome_CPU__300GHzLinux_gcc_122.png")
    );

    // match percentages
    let percentages = draw_accuracy_graph(&graphs[2], &outdir).unwrap();
    assert_eq!(
        percentages,
        outdir.join("normal_and_denormal_value_matches_hardware.png")
    );

    for image in &[perf, timings, percentages] {
        let meta = fs::metadata(image).unwrap();
        assert!(meta.is_file());
        assert!(meta.len() > 0, "{} is empty", image.display());
        let bytes = fs::read(image).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}

#[test]
fn failure_is_reported_once() {
    let tmp = tempfile::tempdir().unwrap();
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_bench_graph"))
        .arg("missing.csv")
        .current_dir(tmp.path())
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("IO error").count(), 1, "stderr: {}", stderr);
}
