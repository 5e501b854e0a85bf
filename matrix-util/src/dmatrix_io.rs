use crate::common_io::{open_buf_writer, read_lines_of_words_delim, Delimiter};
pub use nalgebra::{DMatrix, DVector};

use std::fmt::{Debug, Display};
use std::io::Write;
use std::str::FromStr;

/// A dense matrix together with its row and column names
#[derive(Debug, Clone, PartialEq)]
pub struct MatWithNames<M> {
    pub rows: Vec<Box<str>>,
    pub cols: Vec<Box<str>>,
    pub mat: M,
}

/// Read and write a dense matrix with a row-name column and a header
/// of column names
///
/// ```text
/// corner  col_1  col_2  ...
/// row_1   x_11   x_12   ...
/// ```
pub trait NamedMatIo {
    type Mat;

    fn write_named_delim(
        &self,
        rows: &[Box<str>],
        cols: &[Box<str>],
        corner: &str,
        file_path: &str,
        delim: &str,
    ) -> anyhow::Result<()>;

    fn to_named_tsv(
        &self,
        rows: &[Box<str>],
        cols: &[Box<str>],
        corner: &str,
        file_path: &str,
    ) -> anyhow::Result<()> {
        self.write_named_delim(rows, cols, corner, file_path, "\t")
    }

    fn read_named_delim(
        file_path: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<MatWithNames<Self::Mat>>;

    fn from_named_tsv(file_path: &str) -> anyhow::Result<MatWithNames<Self::Mat>> {
        Self::read_named_delim(file_path, "\t")
    }
}

impl<T> NamedMatIo for DMatrix<T>
where
    T: nalgebra::Scalar + Copy + Display + FromStr,
    <T as FromStr>::Err: Debug,
{
    type Mat = Self;

    fn write_named_delim(
        &self,
        rows: &[Box<str>],
        cols: &[Box<str>],
        corner: &str,
        file_path: &str,
        delim: &str,
    ) -> anyhow::Result<()> {
        if rows.len() != self.nrows() || cols.len() != self.ncols() {
            anyhow::bail!(
                "names ({} x {}) don't match the matrix ({} x {})",
                rows.len(),
                cols.len(),
                self.nrows(),
                self.ncols()
            );
        }

        let mut buf = open_buf_writer(file_path)?;

        // keep the row order; each line is assembled in one string
        let mut line = String::from(corner);
        for c in cols {
            line.push_str(delim);
            line.push_str(c);
        }
        writeln!(buf, "{}", line)?;

        for (i, r) in rows.iter().enumerate() {
            line.clear();
            line.push_str(r);
            for x in self.row(i).iter() {
                line.push_str(delim);
                line.push_str(&x.to_string());
            }
            writeln!(buf, "{}", line)?;
        }

        buf.flush()?;
        Ok(())
    }

    fn read_named_delim(
        file_path: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<MatWithNames<Self>> {
        let out = read_lines_of_words_delim(file_path, delim, 0)?;

        if out.header.is_empty() {
            anyhow::bail!("no header in {}", file_path);
        }

        let cols: Vec<Box<str>> = out.header[1..].to_vec();
        let ncols = cols.len();

        let mut rows = Vec::with_capacity(out.lines.len());
        let mut data = Vec::with_capacity(out.lines.len() * ncols);

        for (i, words) in out.lines.into_iter().enumerate() {
            if words.len() != ncols + 1 {
                anyhow::bail!(
                    "line {} of {} has {} fields, expected {}",
                    i + 2,
                    file_path,
                    words.len(),
                    ncols + 1
                );
            }
            let mut words = words.into_iter();
            if let Some(name) = words.next() {
                rows.push(name);
            }
            for w in words {
                let x = w
                    .parse::<T>()
                    .map_err(|e| anyhow::anyhow!("failed to parse {}: {:?}", w, e))?;
                data.push(x);
            }
        }

        let nrows = rows.len();
        Ok(MatWithNames {
            rows,
            cols,
            mat: DMatrix::<T>::from_row_iterator(nrows, ncols, data),
        })
    }
}
