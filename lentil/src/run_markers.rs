use crate::common::*;
use crate::input::*;

use lentil::marker_selection::{select_markers_by_name, NamedReference};

#[derive(Args, Debug)]
pub struct MarkersArgs {
    #[arg(
        short = 'r',
        long = "reference",
        required = true,
        value_delimiter = ',',
        help = "Reference matrices (feature x sample, .tsv/.csv, optionally .gz)",
        long_help = "Reference matrices, comma separated.\n\
		     First column: feature names; first line: sample names.\n\
		     With several references, markers are chosen on the features\n\
		     shared by all of them, summing label differences across references."
    )]
    references: Vec<Box<str>>,

    #[arg(
        short = 'l',
        long = "labels",
        required = true,
        value_delimiter = ',',
        help = "Label files, one per reference (label per line, or sample<TAB>label)"
    )]
    labels: Vec<Box<str>>,

    #[arg(
        short = 'o',
        long,
        required = true,
        help = "Output marker file (label_a<TAB>label_b<TAB>feature)"
    )]
    out: Box<str>,

    #[arg(long, help = "Markers per label pair (default: shrinks with the number of labels)")]
    num_markers: Option<usize>,

    #[arg(long, help = "Number of threads (default: all cores)")]
    threads: Option<usize>,

    #[arg(short = 'v', long, help = "Verbose output")]
    verbose: bool,
}

pub fn run_markers(args: &MarkersArgs) -> anyhow::Result<()> {
    init_logger(args.verbose);

    if args.references.len() != args.labels.len() {
        return Err(anyhow::anyhow!(
            "{} reference files but {} label files",
            args.references.len(),
            args.labels.len()
        ));
    }

    let mut data = Vec::with_capacity(args.references.len());
    for (mat_file, lab_file) in args.references.iter().zip(args.labels.iter()) {
        let x = read_named_matrix(mat_file)?;
        let labels = read_column_labels(lab_file, &x.cols)?;
        data.push((x, labels));
    }

    let references: Vec<NamedReference<Mat>> = data
        .iter()
        .map(|(x, labels)| NamedReference {
            mat: &x.mat,
            features: &x.rows,
            labels,
        })
        .collect();

    let selected = select_markers_by_name(
        &references,
        args.num_markers,
        num_threads(args.threads),
    )?;

    // label order of the input, not hash order
    let mut lines = vec![];
    for a in selected.labels.iter() {
        for b in selected.labels.iter() {
            let Some(features) = selected.markers.get(a).and_then(|m| m.get(b)) else {
                continue;
            };
            for f in features {
                lines.push(tsv_line([&**a, &**b, &**f]));
            }
        }
    }

    mkdir_parent(&args.out)?;
    write_lines(&lines, &args.out)?;
    info!(
        "wrote {} markers over {} labels to {}",
        lines.len(),
        selected.labels.len(),
        args.out
    );
    Ok(())
}
