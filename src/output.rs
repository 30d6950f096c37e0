use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            other => Err(format!("unknown output format {other:?}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
        })
    }
}

/// Command output sink. Everything a command prints to stdout goes through here.
pub struct Output {
    format: OutputFormat,
    color: bool,
    writer: Box<dyn Write + Send>,
}

impl Output {
    pub fn new(format: OutputFormat, color: bool, writer: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            color,
            writer,
        }
    }

    pub fn stdout(format: OutputFormat, color: bool) -> Self {
        Self::new(format, color, Box::new(io::stdout()))
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn line(&mut self, text: impl fmt::Display) -> io::Result<()> {
        writeln!(self.writer, "{text}")
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.writer)
    }

    /// Writes `text` without a newline and flushes, for interactive questions.
    pub fn prompt(&mut self, text: impl fmt::Display) -> io::Result<()> {
        write!(self.writer, "{text}")?;
        self.writer.flush()
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
        writeln!(self.writer)
    }

    /// Aligned `Label: value` lines.
    pub fn fields(&mut self, pairs: &[(&str, String)]) -> io::Result<()> {
        let width = pairs
            .iter()
            .map(|(label, _)| label.chars().count() + 1)
            .max()
            .unwrap_or_default();
        for (label, value) in pairs {
            let label = format!("{label}:");
            writeln!(self.writer, "{label:<width$} {value}")?;
        }
        Ok(())
    }

    /// Column-aligned rows under a header. The table format adds a dashed rule.
    pub fn table(&mut self, headers: &[&str], rows: &[Vec<String>]) -> io::Result<()> {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let header = join_padded(headers.iter().copied(), &widths);
        if self.color {
            writeln!(self.writer, "\x1b[1m{header}\x1b[0m")?;
        } else {
            writeln!(self.writer, "{header}")?;
        }
        if self.format == OutputFormat::Table {
            let rule = join_padded(widths.iter().map(|w| "-".repeat(*w)), &widths);
            writeln!(self.writer, "{rule}")?;
        }
        for row in rows {
            let line = join_padded(row.iter().map(String::as_str), &widths);
            writeln!(self.writer, "{line}")?;
        }
        Ok(())
    }
}

fn join_padded<I, S>(cells: I, widths: &[usize]) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let cells: Vec<String> = cells
        .into_iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect();
    cells.join("  ").trim_end().to_string()
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::test_support::capture;
    use super::*;

    fn rows() -> Vec<Vec<String>> {
        vec![
            vec!["C1".into(), "general".into(), "42".into()],
            vec!["C22".into(), "random-chatter".into(), "7".into()],
        ]
    }

    #[test]
    fn table_format_draws_rule() {
        let (mut out, buffer) = capture(OutputFormat::Table);
        out.table(&["ID", "NAME", "MEMBERS"], &rows()).unwrap();
        assert_eq!(
            buffer.contents(),
            "ID   NAME            MEMBERS\n---  --------------  -------\nC1   general         42\nC22  random-chatter  7\n"
        );
    }

    #[test]
    fn text_format_has_header_without_rule() {
        let (mut out, buffer) = capture(OutputFormat::Text);
        out.table(&["ID", "NAME"], &[vec!["C1".into(), "general".into()]])
            .unwrap();
        assert_eq!(buffer.contents(), "ID  NAME\nC1  general\n");
    }

    #[test]
    fn json_is_pretty_printed() {
        let (mut out, buffer) = capture(OutputFormat::Json);
        out.json(&json!({"id": "C1"})).unwrap();
        assert_eq!(buffer.contents(), "{\n  \"id\": \"C1\"\n}\n");
    }

    #[test]
    fn fields_align_labels() {
        let (mut out, buffer) = capture(OutputFormat::Text);
        out.fields(&[("ID", "C1".into()), ("Members", "3".into())])
            .unwrap();
        assert_eq!(buffer.contents(), "ID:      C1\nMembers: 3\n");
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
