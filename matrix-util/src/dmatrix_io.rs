use crate::common_io::{read_lines_of_words_delim, write_lines, Delimiter, ReadLinesOut};
use crate::traits::*;
pub use nalgebra::DMatrix;

impl IoOps for DMatrix<f32> {
    type Scalar = f32;
    type Mat = Self;

    fn read_named_delim(
        file: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<MatWithNames<Self::Mat>> {
        let ReadLinesOut { lines, header } = read_lines_of_words_delim(file, delim, true)?;

        if lines.is_empty() {
            return Err(anyhow::anyhow!("No data in file {}", file));
        }

        let ncols = lines[0].len().saturating_sub(1);

        // the header may or may not carry a name for the row-name column
        let cols: Vec<Box<str>> = if header.len() == ncols + 1 {
            header[1..].to_vec()
        } else if header.len() == ncols {
            header
        } else {
            return Err(anyhow::anyhow!(
                "{}: header has {} fields but rows have {} values",
                file,
                header.len(),
                ncols
            ));
        };

        let mut rows = Vec::with_capacity(lines.len());
        let mut data = Vec::with_capacity(lines.len() * ncols);
        let mut nmissing = 0_usize;

        for (i, words) in lines.iter().enumerate() {
            if words.len() != ncols + 1 {
                return Err(anyhow::anyhow!(
                    "{}: line {} has {} fields, expected {}",
                    file,
                    i + 1,
                    words.len(),
                    ncols + 1
                ));
            }
            rows.push(words[0].clone());
            for w in &words[1..] {
                let x = match w.trim() {
                    "NA" | "na" | "" => {
                        nmissing += 1;
                        f32::NAN
                    }
                    t => t
                        .parse::<f32>()
                        .map_err(|e| anyhow::anyhow!("{}: failed to parse '{}': {}", file, w, e))?,
                };
                data.push(x);
            }
        }

        if nmissing > 0 {
            log::info!("{}: {} missing values", file, nmissing);
        }

        let nrows = rows.len();
        Ok(MatWithNames {
            rows,
            cols,
            mat: DMatrix::<f32>::from_row_iterator(nrows, ncols, data),
        })
    }

    fn write_named_delim(
        &self,
        file: &str,
        delim: &str,
        row_names: &[Box<str>],
        column_names: &[Box<str>],
    ) -> anyhow::Result<()> {
        if row_names.len() != self.nrows() || column_names.len() != self.ncols() {
            return Err(anyhow::anyhow!(
                "names ({} x {}) don't match the matrix ({} x {})",
                row_names.len(),
                column_names.len(),
                self.nrows(),
                self.ncols()
            ));
        }

        let mut lines = Vec::with_capacity(self.nrows() + 1);
        let header = std::iter::once("name")
            .chain(column_names.iter().map(|x| x.as_ref()))
            .collect::<Vec<_>>()
            .join(delim);
        lines.push(header.into_boxed_str());

        // sequential on purpose; the row order must be kept
        for (name, row) in row_names.iter().zip(self.row_iter()) {
            let line = std::iter::once(name.to_string())
                .chain(row.iter().map(|x| format!("{}", x)))
                .collect::<Vec<_>>()
                .join(delim);
            lines.push(line.into_boxed_str());
        }

        write_lines(&lines, file)
    }
}
