use std::io::{self, Write};

use crossterm::style::Stylize;
use jirac_config::OutputFormat;

const COLUMN_GAP: &str = "  ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Renderer {
    format: OutputFormat,
    styled: bool,
}

impl Renderer {
    /// `styled` only applies to tables; TSV is always plain.
    pub fn new(format: OutputFormat, styled: bool) -> Self {
        Self {
            format,
            styled: styled && format == OutputFormat::Table,
        }
    }

    pub fn table<W, S>(&self, out: &mut W, header: &[S], rows: &[Vec<String>]) -> io::Result<()>
    where
        W: Write,
        S: AsRef<str>,
    {
        let header = header
            .iter()
            .map(|name| name.as_ref().to_string())
            .collect::<Vec<_>>();

        match self.format {
            OutputFormat::Tsv => {
                write_tsv_line(out, &header)?;
                for row in rows {
                    write_tsv_line(out, row)?;
                }
                Ok(())
            }
            OutputFormat::Table => {
                let widths = column_widths(std::iter::once(&header).chain(rows));
                self.write_aligned(out, &header, &widths, true)?;
                for row in rows {
                    self.write_aligned(out, row, &widths, false)?;
                }
                Ok(())
            }
        }
    }

    /// Vertical `name  value` listing for a single issue.
    pub fn detail<W: Write>(&self, out: &mut W, pairs: &[(String, String)]) -> io::Result<()> {
        let rows = pairs
            .iter()
            .map(|(name, value)| vec![name.clone(), value.clone()])
            .collect::<Vec<_>>();

        match self.format {
            OutputFormat::Tsv => {
                for row in &rows {
                    write_tsv_line(out, row)?;
                }
                Ok(())
            }
            OutputFormat::Table => {
                let widths = column_widths(rows.iter());
                for row in &rows {
                    self.write_labeled(out, row, &widths)?;
                }
                Ok(())
            }
        }
    }

    fn write_aligned<W: Write>(
        &self,
        out: &mut W,
        cells: &[String],
        widths: &[usize],
        is_header: bool,
    ) -> io::Result<()> {
        let lines = cells.iter().map(|cell| cell_lines(cell)).collect::<Vec<_>>();
        let height = lines.iter().map(Vec::len).max().unwrap_or(1);

        for line_index in 0..height {
            let mut text = String::new();
            for (column, cell_lines) in lines.iter().enumerate() {
                let part = cell_lines.get(line_index).copied().unwrap_or("");
                let is_last = column + 1 == lines.len();
                let padded = if is_last {
                    part.to_string()
                } else {
                    pad(part, widths[column])
                };
                if is_header && self.styled {
                    text.push_str(&padded.bold().to_string());
                } else {
                    text.push_str(&padded);
                }
                if !is_last {
                    text.push_str(COLUMN_GAP);
                }
            }
            writeln!(out, "{}", text.trim_end())?;
        }
        Ok(())
    }

    fn write_labeled<W: Write>(
        &self,
        out: &mut W,
        row: &[String],
        widths: &[usize],
    ) -> io::Result<()> {
        let label = pad(&row[0], widths[0]);
        let label = if self.styled {
            label.bold().to_string()
        } else {
            label
        };
        let indent = " ".repeat(widths[0] + COLUMN_GAP.len());

        let mut lines = cell_lines(&row[1]).into_iter();
        let first = lines.next().unwrap_or("");
        writeln!(out, "{label}{COLUMN_GAP}{first}")?;
        for line in lines {
            writeln!(out, "{indent}{line}")?;
        }
        Ok(())
    }
}

fn column_widths<'a, I>(rows: I) -> Vec<usize>
where
    I: Iterator<Item = &'a Vec<String>>,
{
    let mut widths: Vec<usize> = Vec::new();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            let width = cell_lines(cell)
                .iter()
                .map(|line| line.chars().count())
                .max()
                .unwrap_or(0);
            match widths.get_mut(index) {
                Some(current) => *current = (*current).max(width),
                None => widths.push(width),
            }
        }
    }
    widths
}

fn cell_lines(cell: &str) -> Vec<&str> {
    if cell.is_empty() {
        return vec![""];
    }
    cell.lines().collect()
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.chars().count());
    format!("{text}{}", " ".repeat(fill))
}

fn write_tsv_line<W: Write>(out: &mut W, cells: &[String]) -> io::Result<()> {
    let line = cells
        .iter()
        .map(|cell| escape_tsv(cell))
        .collect::<Vec<_>>()
        .join("\t");
    writeln!(out, "{line}")
}

fn escape_tsv(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
