pub use clap::{Args, Parser, Subcommand};
pub use log::{info, warn};

use fnv::FnvHashMap as HashMap;

pub type Mat = nalgebra::DMatrix<f32>;

pub use matrix_util::common_io::*;
pub use matrix_util::traits::{IoOps, MatWithNames};

/// Start logging; `verbose` raises the level to `info`
pub fn init_logger(verbose: bool) {
    if verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
}

/// Number of threads: explicit, or all available cores
pub fn num_threads(threads: Option<usize>) -> usize {
    threads.unwrap_or_else(num_cpus::get).max(1)
}

/// File name without directories and data extensions, e.g.
/// `data/pbmc.tsv.gz` -> `pbmc`
pub fn file_tag(file: &str) -> Box<str> {
    let base = std::path::Path::new(file)
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or(file);
    let mut tag = base.strip_suffix(".gz").unwrap_or(base);
    for ext in [".tsv", ".csv", ".txt"] {
        if let Some(t) = tag.strip_suffix(ext) {
            tag = t;
            break;
        }
    }
    tag.into()
}

/// [`file_tag`] of each file; tags shared by several files get the
/// file's position appended, e.g. `a/ref.tsv`, `b/ref.tsv` -> `ref_0`,
/// `ref_1`
pub fn unique_file_tags(files: &[Box<str>]) -> Vec<Box<str>> {
    let tags: Vec<Box<str>> = files.iter().map(|f| file_tag(f)).collect();
    let mut count: HashMap<&str, usize> = HashMap::default();
    for t in tags.iter() {
        *count.entry(&**t).or_default() += 1;
    }
    tags.iter()
        .enumerate()
        .map(|(r, t)| {
            if count[&**t] > 1 {
                format!("{}_{}", t, r).into_boxed_str()
            } else {
                t.clone()
            }
        })
        .collect()
}

/// Join fields into a tab-separated line
pub fn tsv_line<I, S>(fields: I) -> Box<str>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|x| x.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\t")
        .into_boxed_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_drop_extensions() {
        assert_eq!(&*file_tag("data/pbmc.tsv.gz"), "pbmc");
        assert_eq!(&*file_tag("ref.csv"), "ref");
        assert_eq!(&*file_tag("blood"), "blood");
        assert_eq!(&*tsv_line(["a", "b"]), "a\tb");
    }

    #[test]
    fn repeated_tags_get_positions() {
        let files: Vec<Box<str>> = ["a/ref.tsv", "b/ref.tsv.gz", "c/blood.csv"]
            .into_iter()
            .map(Box::from)
            .collect();
        let tags = unique_file_tags(&files);
        let tags: Vec<&str> = tags.iter().map(|t| &**t).collect();
        assert_eq!(tags, vec!["ref_0", "ref_1", "blood"]);
    }
}
