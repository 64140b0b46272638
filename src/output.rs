use std::io::{self, Write};

use serde::Serialize;

use crate::app::{CatalogResult, ExportResult, ProgressEvent, ProgressSink, ValuesResult};
use crate::submission::SubmissionReceipt;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_catalog(result: &CatalogResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_values(result: &ValuesResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_submission(result: &SubmissionReceipt) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human readable output; progress goes to stderr so stdout stays clean.
pub struct TextOutput;

impl TextOutput {
    pub fn print_catalog(result: &CatalogResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        if !result.filter.is_empty() {
            let filters = [
                ("Gene", &result.filter.gene),
                ("Platform", &result.filter.platform),
                ("Environment", &result.filter.environment),
            ]
            .into_iter()
            .filter_map(|(name, value)| value.as_ref().map(|value| format!("{name}={value}")))
            .collect::<Vec<_>>();
            writeln!(stdout, "Filters: {}", filters.join(", "))?;
        }
        let headers = ["Project ID", "Title", "Gene", "Platform", "Environment", "Samples"];
        let lines = result
            .rows
            .iter()
            .map(|row| {
                [
                    row.project_id.clone(),
                    row.title.clone(),
                    row.gene.clone(),
                    row.platform.clone(),
                    row.environment.clone(),
                    row.samples.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        let mut widths = headers.map(str::len);
        for line in &lines {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.chars().count());
            }
        }
        write_row(&mut stdout, &headers.map(str::to_string), &widths)?;
        for line in &lines {
            write_row(&mut stdout, line, &widths)?;
        }
        writeln!(
            stdout,
            "{} of {} projects shown",
            result.rows.len(),
            result.total
        )?;
        for skipped in &result.skipped {
            writeln!(stdout, "skipped {}: {}", skipped.project, skipped.reason)?;
        }
        Ok(())
    }

    pub fn print_values(result: &ValuesResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}:", result.column)?;
        for value in &result.values {
            writeln!(stdout, "  {value}")?;
        }
        Ok(())
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(
            stdout,
            "Bundled {} projects ({} files, {} bytes)",
            result.projects.len(),
            result.entries,
            result.size_bytes
        )?;
        if let Some(path) = &result.output {
            writeln!(stdout, "Saved to {path}")?;
        }
        Ok(())
    }

    pub fn print_submission(result: &SubmissionReceipt) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(
            stdout,
            "Upload complete! Your project ID is {}",
            result.project_id
        )?;
        let json = serde_json::to_string_pretty(&result.descriptor).map_err(io::Error::other)?;
        writeln!(stdout, "{json}")?;
        Ok(())
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => eprintln!("{}", event.message),
        }
    }
}

fn write_row(out: &mut impl Write, cells: &[String; 6], widths: &[usize; 6]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}", width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{}", line.trim_end())
}
