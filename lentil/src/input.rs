use crate::common::*;
use fnv::FnvHashMap as HashMap;

/// Read a named `feature x sample` matrix; `.csv` files are comma
/// separated, anything else tab separated
pub fn read_named_matrix(file: &str) -> anyhow::Result<MatWithNames<Mat>> {
    let out = Mat::read_named_delim(file, detect_delimiter(file))?;
    info!(
        "read {} features x {} samples from {}",
        out.mat.nrows(),
        out.mat.ncols(),
        file
    );
    Ok(out)
}

/// Read one label per column of a matrix
///
/// The file either lists one label per line in column order
/// (optionally after a header line), or `column<TAB>label` pairs in
/// any order.
///
/// * `file` - label file
/// * `columns` - column names of the matrix
pub fn read_column_labels(file: &str, columns: &[Box<str>]) -> anyhow::Result<Vec<Box<str>>> {
    let ReadLinesOut { lines, .. } = read_lines_of_words_delim(file, detect_delimiter(file), false)?;

    let ncols = columns.len();
    let width = lines.first().map(|w| w.len()).unwrap_or(0);

    match width {
        1 => {
            let labels: Vec<Box<str>> = lines.into_iter().map(|mut w| w.swap_remove(0)).collect();
            match labels.len() {
                n if n == ncols => Ok(labels),
                n if n == ncols + 1 => Ok(labels[1..].to_vec()),
                n => Err(anyhow::anyhow!(
                    "{}: {} labels for {} columns",
                    file,
                    n,
                    ncols
                )),
            }
        }
        2 => {
            let mut column_label: HashMap<Box<str>, Box<str>> = HashMap::default();
            for words in lines {
                let [column, label]: [Box<str>; 2] = words
                    .try_into()
                    .map_err(|w: Vec<Box<str>>| {
                        anyhow::anyhow!("{}: expected 2 fields, found {}", file, w.len())
                    })?;
                column_label.entry(column).or_insert(label);
            }
            columns
                .iter()
                .map(|c| {
                    column_label
                        .get(c)
                        .cloned()
                        .ok_or_else(|| anyhow::anyhow!("{}: no label for column '{}'", file, c))
                })
                .collect()
        }
        _ => Err(anyhow::anyhow!(
            "{}: expected 1 or 2 fields per line, found {}",
            file,
            width
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(xs: &[&str]) -> Vec<Box<str>> {
        xs.iter().map(|&x| Box::from(x)).collect()
    }

    #[test]
    fn one_and_two_column_labels() -> anyhow::Result<()> {
        let columns = names(&["c1", "c2", "c3"]);

        let one = create_temp_dir_file(".txt")?;
        let one = one.to_str().unwrap();
        write_lines(&names(&["T", "B", "T"]), one)?;
        assert_eq!(read_column_labels(one, &columns)?, names(&["T", "B", "T"]));

        let with_header = create_temp_dir_file(".txt")?;
        let with_header = with_header.to_str().unwrap();
        write_lines(&names(&["label", "T", "B", "NK"]), with_header)?;
        assert_eq!(
            read_column_labels(with_header, &columns)?,
            names(&["T", "B", "NK"])
        );

        let two = create_temp_dir_file(".tsv.gz")?;
        let two = two.to_str().unwrap();
        write_lines(&names(&["c3\tNK", "c1\tT", "c2\tB"]), two)?;
        assert_eq!(read_column_labels(two, &columns)?, names(&["T", "B", "NK"]));

        write_lines(&names(&["c3\tNK", "c1\tT"]), two)?;
        assert!(read_column_labels(two, &columns).is_err());
        Ok(())
    }

    #[test]
    fn named_matrix_from_csv() -> anyhow::Result<()> {
        let file = create_temp_dir_file(".csv")?;
        let file = file.to_str().unwrap();
        write_lines(&names(&["gene,s1,s2", "g1,1,2", "g2,3,NA"]), file)?;

        let x = read_named_matrix(file)?;
        assert_eq!(x.rows, names(&["g1", "g2"]));
        assert_eq!(x.cols, names(&["s1", "s2"]));
        assert_eq!(x.mat[(1, 0)], 3.0);
        assert!(x.mat[(1, 1)].is_nan());
        Ok(())
    }
}
