mod common;
mod input;
mod run_annotate;
mod run_markers;

use common::*;
use run_annotate::*;
use run_markers::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LENTIL",
    long_about = "Label transfer from labelled references by rank correlation\n\
		  Matrices are feature x sample `.tsv` or `.csv` files, optionally gzipped,\n\
		  with feature names in the first column and sample names in the first line."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Select marker features for every pair of labels",
        long_about = "Select marker features for every ordered pair of labels:\n\
		      (1) Take per-label medians of each feature\n\
		      (2) For labels (a, b), rank features by median_b - median_a\n\
		      (3) Keep the top positive ones as markers of b over a.\n"
    )]
    Markers(MarkersArgs),

    #[command(
        about = "Annotate query samples with reference labels",
        long_about = "Annotate query samples in three stages:\n\
		      (1) Select markers and rank reference profiles on them\n\
		      (2) Score each label by a quantile of Spearman correlations\n\
		      (3) Fine-tune close calls on the markers separating them.\n\
		      With several references, each column then takes the label\n\
		      of the reference it correlates with best.\n",
        visible_alias = "annotate-integrated"
    )]
    Annotate(RunAnnotateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Markers(args) => {
            run_markers(args)?;
        }
        Commands::Annotate(args) => {
            run_annotate(args)?;
        }
    }

    info!("Done");
    Ok(())
}
