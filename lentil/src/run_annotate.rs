use crate::common::*;
use crate::input::*;

use lentil::annotate::{annotate_integrated, annotate_single, SingleAnnotation};
use lentil::classify::{ClassifyArgs, DEFAULT_FINE_TUNE_THRESHOLD, DEFAULT_QUANTILE};
use lentil::marker_selection::NamedReference;
use lentil::AnnotateArgs;

#[derive(Args, Debug)]
pub struct RunAnnotateArgs {
    #[arg(
        short = 'q',
        long = "query",
        required = true,
        help = "Query matrix (feature x sample, .tsv/.csv, optionally .gz)"
    )]
    query: Box<str>,

    #[arg(
        short = 'r',
        long = "reference",
        required = true,
        value_delimiter = ',',
        help = "Reference matrices, comma separated"
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
        help = "Output prefix ({out}.{reference}.tsv.gz, {out}.integrated.tsv.gz)"
    )]
    out: Box<str>,

    #[arg(long, default_value_t = DEFAULT_QUANTILE, help = "Quantile of profile correlations used as a label score")]
    quantile: f32,

    #[arg(long, default_value_t = DEFAULT_FINE_TUNE_THRESHOLD, help = "Fine-tune labels scoring within this of the best")]
    fine_tune_threshold: f32,

    #[arg(long, help = "Skip fine-tuning")]
    no_fine_tune: bool,

    #[arg(long, help = "Fine-tuning round limit (default: number of labels)")]
    max_fine_tune_rounds: Option<usize>,

    #[arg(long, help = "Approximate nearest neighbour search over reference profiles")]
    approximate: bool,

    #[arg(long, help = "Markers per label pair (default: shrinks with the number of labels)")]
    num_markers: Option<usize>,

    #[arg(long, help = "Keep features with missing or infinite values")]
    keep_non_finite: bool,

    #[arg(long, help = "Number of threads (default: all cores)")]
    threads: Option<usize>,

    #[arg(short = 'v', long, help = "Verbose output")]
    verbose: bool,
}

impl RunAnnotateArgs {
    fn annotate_args(&self) -> AnnotateArgs {
        AnnotateArgs {
            num_markers: self.num_markers,
            approximate: self.approximate,
            drop_non_finite: !self.keep_non_finite,
            classify: ClassifyArgs {
                quantile: self.quantile,
                fine_tune: !self.no_fine_tune,
                fine_tune_threshold: self.fine_tune_threshold,
                max_fine_tune_rounds: self.max_fine_tune_rounds,
                num_threads: num_threads(self.threads),
            },
        }
    }
}

/// sample, label, delta, fine-tuning, then one score per label
fn write_single(
    annot: &SingleAnnotation,
    samples: &[Box<str>],
    file: &str,
) -> anyhow::Result<()> {
    let res = &annot.result;
    let mut lines = Vec::with_capacity(samples.len() + 1);
    lines.push(tsv_line(
        ["sample", "label", "delta", "fine_tune"]
            .into_iter()
            .chain(annot.labels.iter().map(|x| &**x)),
    ));

    for (j, sample) in samples.iter().enumerate() {
        let mut fields: Vec<String> = vec![
            sample.to_string(),
            annot.labels[res.best[j]].to_string(),
            format!("{}", res.delta[j]),
            format!("{:?}", res.fine_tune[j]),
        ];
        fields.extend(res.scores.row(j).iter().map(|s| format!("{}", s)));
        lines.push(tsv_line(fields));
    }

    mkdir_parent(file)?;
    write_lines(&lines, file)?;
    info!("wrote {}", file);
    Ok(())
}

pub fn run_annotate(args: &RunAnnotateArgs) -> anyhow::Result<()> {
    init_logger(args.verbose);

    if args.references.len() != args.labels.len() {
        return Err(anyhow::anyhow!(
            "{} reference files but {} label files",
            args.references.len(),
            args.labels.len()
        ));
    }

    let query = read_named_matrix(&args.query)?;

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

    let tags = unique_file_tags(&args.references);
    let opts = args.annotate_args();

    if let [reference] = &references[..] {
        let annot = annotate_single(&query.mat, &query.rows, reference, &opts)?;
        for e in annot.result.diagnostics() {
            warn!("{}", e);
        }
        let file = format!("{}.{}.tsv.gz", args.out, tags[0]);
        return write_single(&annot, &query.cols, &file);
    }

    let annot = annotate_integrated(&query.mat, &query.rows, &references, &opts)?;
    for e in annot.model.diagnostics() {
        warn!("{}", e);
    }

    for (single, tag) in annot.per_reference.iter().zip(tags.iter()) {
        let Some(single) = single else {
            continue;
        };
        for e in single.result.diagnostics() {
            warn!("{}: {}", tag, e);
        }
        let file = format!("{}.{}.tsv.gz", args.out, tag);
        write_single(single, &query.cols, &file)?;
    }

    // sample, label, reference, delta, then one score per kept reference
    let kept: Vec<&str> = annot
        .model
        .references()
        .iter()
        .map(|x| &*tags[x.source()])
        .collect();
    let names = annot.best_names();
    let sources = annot.best_sources();

    let mut lines = Vec::with_capacity(query.cols.len() + 1);
    lines.push(tsv_line(
        ["sample", "label", "reference", "delta"]
            .into_iter()
            .chain(kept.iter().copied()),
    ));
    for (j, sample) in query.cols.iter().enumerate() {
        let mut fields: Vec<String> = vec![
            sample.to_string(),
            names[j].to_string(),
            tags[sources[j]].to_string(),
            format!("{}", annot.result.delta[j]),
        ];
        fields.extend(annot.result.scores.row(j).iter().map(|s| format!("{}", s)));
        lines.push(tsv_line(fields));
    }

    let file = format!("{}.integrated.tsv.gz", args.out);
    mkdir_parent(&file)?;
    write_lines(&lines, &file)?;
    info!("wrote {}", file);
    Ok(())
}
