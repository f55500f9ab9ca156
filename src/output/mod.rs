//! Output formatters for analysis results.

use std::io::Write;

use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyzers::prediction::Prediction;
use crate::analyzers::{PatternCategory, Severity, Smell};
use crate::config::OutputFormat;
use crate::core::Result;
use crate::pipeline::{AnalysisResult, Warning};
use crate::score::DebtLevel;

/// Output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    Json,
    Markdown,
    #[default]
    Text,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
            OutputFormat::Text => Format::Text,
        }
    }
}

/// One row of a directory summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub file: String,
    pub language: String,
    pub overall_score: f64,
    pub smells: usize,
    pub debt_score: f64,
    pub debt_level: DebtLevel,
    pub estimated_hours: f64,
}

impl FileSummary {
    pub fn new(file: String, result: &AnalysisResult) -> Self {
        Self {
            file,
            language: result.language.to_string(),
            overall_score: result.quality_score.overall_score,
            smells: result.code_smells.total_smells,
            debt_score: result.technical_debt.total_debt_score,
            debt_level: result.technical_debt.debt_level,
            estimated_hours: result.technical_debt.estimated_hours,
        }
    }
}

/// A file that could not be analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Summary of a directory analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryReport {
    pub root: String,
    pub files_analyzed: usize,
    pub average_score: f64,
    pub total_smells: usize,
    pub total_hours: f64,
    pub files: Vec<FileSummary>,
    pub failures: Vec<FileFailure>,
}

impl DirectoryReport {
    /// Aggregate per-file rows. Rows are sorted by debt score, worst first.
    pub fn new(root: String, mut files: Vec<FileSummary>, failures: Vec<FileFailure>) -> Self {
        files.sort_by(|a, b| {
            b.debt_score
                .total_cmp(&a.debt_score)
                .then_with(|| a.file.cmp(&b.file))
        });
        let average_score = if files.is_empty() {
            0.0
        } else {
            files.iter().map(|f| f.overall_score).sum::<f64>() / files.len() as f64
        };
        Self {
            root,
            files_analyzed: files.len(),
            average_score: crate::score::round1(average_score),
            total_smells: files.iter().map(|f| f.smells).sum(),
            total_hours: crate::score::round1(files.iter().map(|f| f.estimated_hours).sum()),
            files,
            failures,
        }
    }
}

impl Format {
    /// Write the report for one analyzed file.
    pub fn write_analysis<W: Write>(
        &self,
        file: &str,
        result: &AnalysisResult,
        writer: &mut W,
    ) -> Result<()> {
        match self {
            Format::Json => format_json(&serde_json::to_value(result)?, writer),
            Format::Markdown => analysis_markdown(file, result, writer),
            Format::Text => analysis_text(file, result, writer),
        }
    }

    /// Write a directory summary.
    pub fn write_directory<W: Write>(&self, report: &DirectoryReport, writer: &mut W) -> Result<()> {
        match self {
            Format::Json => format_json(&serde_json::to_value(report)?, writer),
            Format::Markdown => directory_markdown(report, writer),
            Format::Text => directory_text(report, writer),
        }
    }

    /// Write any serializable value.
    pub fn format<T: Serialize, W: Write>(&self, data: &T, writer: &mut W) -> Result<()> {
        let value = serde_json::to_value(data)?;
        match self {
            Format::Json => format_json(&value, writer),
            Format::Markdown => {
                match value.as_array() {
                    Some(rows) if is_table_compatible(rows) => format_as_table(rows, writer)?,
                    _ => format_json(&value, writer)?,
                }
                Ok(())
            }
            Format::Text => format_value_as_text(&value, writer, 0),
        }
    }
}

fn format_json<W: Write>(value: &Value, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

fn severity_label(severity: Severity) -> String {
    let label = severity.as_str().to_uppercase();
    match severity {
        Severity::Critical => label.red().bold().to_string(),
        Severity::High => label.red().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.dimmed().to_string(),
    }
}

fn score_label(score: f64) -> String {
    let text = format!("{score:.1}");
    if score >= 80.0 {
        text.green().to_string()
    } else if score >= 60.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

fn level_label(level: DebtLevel) -> String {
    let text = level.as_str().to_uppercase();
    match level {
        DebtLevel::Critical | DebtLevel::High => text.red().bold().to_string(),
        DebtLevel::Medium => text.yellow().to_string(),
        DebtLevel::Low => text.green().to_string(),
    }
}

fn prediction_line(prediction: &Prediction) -> String {
    match prediction {
        Prediction::Estimate {
            complexity_description,
            confidence,
            ..
        } => format!("{complexity_description} (confidence {:.0}%)", confidence * 100.0),
        Prediction::Abstained { error } => format!("n/a ({error})"),
    }
}

fn pattern_line(result: &AnalysisResult) -> String {
    let patterns = &result.design_patterns;
    let names: Vec<&str> = patterns
        .detected_patterns
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    match (patterns.predicted_category, names.is_empty()) {
        (PatternCategory::Unknown, true) => "none detected".to_string(),
        (category, true) => format!("{category} ({:.0}%)", patterns.confidence * 100.0),
        (category, false) => format!("{category}: {}", names.join(", ")),
    }
}

fn warning_line(warning: &Warning) -> String {
    match warning {
        Warning::PartialParse { lines, message } => {
            let shown: Vec<String> = lines.iter().take(10).map(u32::to_string).collect();
            format!("{message} (lines {})", shown.join(", "))
        }
    }
}

fn analysis_text<W: Write>(file: &str, result: &AnalysisResult, writer: &mut W) -> Result<()> {
    let score = &result.quality_score;
    let debt = &result.technical_debt;

    writeln!(writer, "{} ({})", file.bold(), result.language)?;
    for warning in &result.warnings {
        writeln!(writer, "  {} {}", "warning:".yellow(), warning_line(warning))?;
    }
    writeln!(
        writer,
        "  {} functions, {} classes, {} methods, {} imports, {} lines ({} code)",
        result.functions.len(),
        result.classes.len(),
        result.methods.len(),
        result.imports.len(),
        result.metrics.total_lines,
        result.metrics.loc
    )?;
    writeln!(writer)?;

    writeln!(writer, "{} {}", "Quality score:".bold(), score_label(score.overall_score))?;
    for (name, value) in [
        ("maintainability", score.maintainability),
        ("readability", score.readability),
        ("complexity", score.complexity),
        ("documentation", score.documentation),
    ] {
        writeln!(writer, "  {name:<16} {}", score_label(value))?;
    }
    writeln!(writer)?;

    writeln!(
        writer,
        "{} {} ({:.1}, ~{:.1}h, {})",
        "Technical debt:".bold(),
        level_label(debt.debt_level),
        debt.total_debt_score,
        debt.estimated_hours,
        debt.debt_trend
    )?;
    writeln!(
        writer,
        "{} {}",
        "Complexity:".bold(),
        prediction_line(&result.ml_complexity.prediction)
    )?;
    writeln!(writer, "{} {}", "Patterns:".bold(), pattern_line(result))?;
    writeln!(writer)?;

    if result.code_smells.is_empty() {
        writeln!(writer, "{}", "No code smells found.".green())?;
    } else {
        writeln!(
            writer,
            "{} ({})",
            "Code smells".bold(),
            result.code_smells.total_smells
        )?;
        for smell in &result.code_smells.smells {
            write_smell_text(smell, writer)?;
        }
    }

    if !debt.recommendations.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{}", "Recommendations".bold())?;
        for rec in &debt.recommendations {
            writeln!(writer, "  - {rec}")?;
        }
    }
    Ok(())
}

fn write_smell_text<W: Write>(smell: &Smell, writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "  {:>4}  {:<8} {:<22} {}",
        smell.line,
        severity_label(smell.severity),
        smell.smell_type.as_str(),
        smell.description
    )?;
    Ok(())
}

fn analysis_markdown<W: Write>(file: &str, result: &AnalysisResult, writer: &mut W) -> Result<()> {
    let score = &result.quality_score;
    let debt = &result.technical_debt;

    writeln!(writer, "# {file}\n")?;
    writeln!(writer, "**Language**: {}\n", result.language)?;
    for warning in &result.warnings {
        writeln!(writer, "> **Warning**: {}\n", warning_line(warning))?;
    }

    writeln!(writer, "## Quality Score\n")?;
    writeln!(writer, "| Overall | Maintainability | Readability | Complexity | Documentation |")?;
    writeln!(writer, "| --- | --- | --- | --- | --- |")?;
    writeln!(
        writer,
        "| {:.1} | {:.1} | {:.1} | {:.1} | {:.1} |\n",
        score.overall_score,
        score.maintainability,
        score.readability,
        score.complexity,
        score.documentation
    )?;

    writeln!(writer, "## Technical Debt\n")?;
    writeln!(
        writer,
        "**Score**: {:.1} ({}, {})\n",
        debt.total_debt_score, debt.debt_level, debt.debt_trend
    )?;
    writeln!(writer, "**Estimated hours**: {:.1}\n", debt.estimated_hours)?;
    for rec in &debt.recommendations {
        writeln!(writer, "- {rec}")?;
    }
    writeln!(writer)?;

    writeln!(writer, "## Analysis\n")?;
    writeln!(
        writer,
        "**Complexity**: {}\n",
        prediction_line(&result.ml_complexity.prediction)
    )?;
    writeln!(writer, "**Design patterns**: {}\n", pattern_line(result))?;

    writeln!(writer, "## Code Smells\n")?;
    let rows = serde_json::to_value(&result.code_smells.smells)?;
    match rows.as_array() {
        Some(rows) if !rows.is_empty() => format_as_table(rows, writer)?,
        _ => writeln!(writer, "_No items_\n")?,
    }
    Ok(())
}

fn directory_text<W: Write>(report: &DirectoryReport, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", report.root.bold())?;
    writeln!(
        writer,
        "  {:<48} {:>7} {:>7} {:<9} {:>7}",
        "file", "score", "smells", "debt", "hours"
    )?;
    for row in &report.files {
        writeln!(
            writer,
            "  {:<48} {:>7} {:>7} {:<9} {:>7.1}",
            truncate(&row.file, 48),
            score_label(row.overall_score),
            row.smells,
            level_label(row.debt_level),
            row.estimated_hours
        )?;
    }
    for failure in &report.failures {
        writeln!(
            writer,
            "  {:<48} {}",
            truncate(&failure.file, 48),
            failure.error.red()
        )?;
    }
    writeln!(writer)?;
    writeln!(
        writer,
        "{} files, average score {}, {} smells, ~{:.1}h of debt",
        report.files_analyzed,
        score_label(report.average_score),
        report.total_smells,
        report.total_hours
    )?;
    Ok(())
}

fn directory_markdown<W: Write>(report: &DirectoryReport, writer: &mut W) -> Result<()> {
    writeln!(writer, "# {}\n", report.root)?;
    writeln!(writer, "**Files analyzed**: {}\n", report.files_analyzed)?;
    writeln!(writer, "**Average score**: {:.1}\n", report.average_score)?;
    writeln!(writer, "**Total smells**: {}\n", report.total_smells)?;
    writeln!(writer, "**Estimated hours**: {:.1}\n", report.total_hours)?;

    let rows = serde_json::to_value(&report.files)?;
    if let Some(rows) = rows.as_array().filter(|r| !r.is_empty()) {
        format_as_table(rows, writer)?;
    }
    if !report.failures.is_empty() {
        writeln!(writer, "## Failures\n")?;
        if let Some(rows) = serde_json::to_value(&report.failures)?.as_array() {
            format_as_table(rows, writer)?;
        }
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - (width - 3)).collect();
    format!("...{tail}")
}

fn format_key(key: &str) -> String {
    key.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.replace('|', "\\|"),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
            Some(f) => format!("{f:.1}"),
            None => n.to_string(),
        },
        Value::Bool(b) => if *b { "Yes" } else { "No" }.to_string(),
        Value::Null => "-".to_string(),
        _ => value.to_string(),
    }
}

fn is_table_compatible(arr: &[Value]) -> bool {
    !arr.is_empty()
        && arr.iter().all(|v| match v {
            Value::Object(map) => map
                .values()
                .all(|v| !matches!(v, Value::Object(_) | Value::Array(_))),
            _ => false,
        })
}

fn format_as_table<W: Write>(arr: &[Value], writer: &mut W) -> Result<()> {
    let Some(Value::Object(first)) = arr.first() else {
        return Ok(());
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    write!(writer, "|")?;
    for header in &headers {
        write!(writer, " {} |", format_key(header))?;
    }
    writeln!(writer)?;
    write!(writer, "|")?;
    for _ in &headers {
        write!(writer, " --- |")?;
    }
    writeln!(writer)?;

    for item in arr {
        if let Value::Object(map) = item {
            write!(writer, "|")?;
            for header in &headers {
                let value = map.get(*header).unwrap_or(&Value::Null);
                write!(writer, " {} |", format_scalar(value))?;
            }
            writeln!(writer)?;
        }
    }
    writeln!(writer)?;
    Ok(())
}

fn format_value_as_text<W: Write>(value: &Value, writer: &mut W, indent: usize) -> Result<()> {
    let prefix = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        writeln!(writer, "{prefix}{}:", format_key(key))?;
                        format_value_as_text(val, writer, indent + 1)?;
                    }
                    _ => writeln!(writer, "{prefix}{}: {}", format_key(key), format_scalar(val))?,
                }
            }
        }
        Value::Array(arr) => {
            for item in arr {
                match item {
                    Value::Object(_) | Value::Array(_) => {
                        writeln!(writer, "{prefix}-")?;
                        format_value_as_text(item, writer, indent + 1)?;
                    }
                    _ => writeln!(writer, "{prefix}- {}", format_scalar(item))?,
                }
            }
        }
        _ => writeln!(writer, "{prefix}{}", format_scalar(value))?,
    }
    Ok(())
}
