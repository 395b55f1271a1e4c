use std::io::Write;

use meditalks_core::summary::Line;
use meditalks_core::{AdaptationResult, BackendStatus, DocumentAnalysis, FailureKind, Language};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn heading(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", title.bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "{}", title)?;
        writeln!(w, "{}", sep)?;
    }
    Ok(())
}

fn source_line(
    w: &mut dyn Write,
    source: &str,
    fallback: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    let suffix = if fallback { " (fallback)" } else { "" };
    if color.enabled() {
        if fallback {
            writeln!(w, "{} {}{}", "Source:".dimmed(), source, suffix.yellow())
        } else {
            writeln!(w, "{} {}", "Source:".dimmed(), source)
        }
    } else {
        writeln!(w, "Source: {}{}", source, suffix)
    }
}

/// Print an adapted message.
pub fn print_adaptation(
    w: &mut dyn Write,
    result: &AdaptationResult,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "{}", result.adapted_text)?;
    writeln!(w)?;
    source_line(w, &result.source_service_used, result.fallback_occurred, color)?;
    writeln!(
        w,
        "Context: {}  Language: {}",
        result.context_id, result.target_language
    )?;
    Ok(())
}

/// Print offline template text after every backend failed.
pub fn print_degraded(
    w: &mut dyn Write,
    text: &str,
    language: Language,
    failures: &[(&str, FailureKind)],
    color: ColorMode,
) -> std::io::Result<()> {
    let warning = "AI services unavailable; showing offline template text.";
    if color.enabled() {
        writeln!(w, "{} {}", "WARNING:".yellow(), warning)?;
    } else {
        writeln!(w, "WARNING: {}", warning)?;
    }
    for (backend, kind) in failures {
        if color.enabled() {
            writeln!(w, "  {} {}", format!("{backend}:").dimmed(), kind.red())?;
        } else {
            writeln!(w, "  {}: {}", backend, kind)?;
        }
    }
    writeln!(w)?;
    writeln!(w, "{}", text)?;
    writeln!(w)?;
    writeln!(w, "Language: {}", language)?;
    Ok(())
}

fn write_line(w: &mut dyn Write, prefix: &str, line: &Line, color: ColorMode) -> std::io::Result<()> {
    write!(w, "{}", prefix)?;
    for run in line.runs() {
        if run.emphasized && color.enabled() {
            write!(w, "{}", run.text.bold())?;
        } else {
            write!(w, "{}", run.text)?;
        }
    }
    writeln!(w)
}

/// Print a sectioned document summary.
pub fn print_analysis(
    w: &mut dyn Write,
    analysis: &DocumentAnalysis,
    color: ColorMode,
) -> std::io::Result<()> {
    let detected = analysis
        .detected_language
        .map(|l| l.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    writeln!(
        w,
        "{}: {} words, detected {}, summarized in {}",
        analysis.file_name, analysis.word_count, detected, analysis.output_language
    )?;
    writeln!(w)?;

    for section in &analysis.summary.sections {
        heading(w, &section.title, color)?;
        for line in &section.prose_lines {
            write_line(w, "", line, color)?;
        }
        for line in &section.bullet_lines {
            write_line(w, "  • ", line, color)?;
        }
        writeln!(w)?;
    }

    source_line(w, &analysis.analysis_source, analysis.fallback_occurred, color)
}

/// Print the cultural contexts and supported languages.
pub fn print_contexts(w: &mut dyn Write, color: ColorMode) -> std::io::Result<()> {
    for ctx in meditalks_core::context::all() {
        if color.enabled() {
            writeln!(w, "{}  {}", ctx.id.bold(), ctx.display_name)?;
        } else {
            writeln!(w, "{}  {}", ctx.id, ctx.display_name)?;
        }
        writeln!(
            w,
            "    {} (default language: {})",
            ctx.region,
            ctx.target_language_default.code()
        )?;
    }
    writeln!(w)?;
    let codes: Vec<String> = Language::ALL
        .iter()
        .map(|l| format!("{} ({})", l.code(), l.name()))
        .collect();
    writeln!(w, "Languages: {}", codes.join(", "))?;
    Ok(())
}

/// Print one line per backend health check.
pub fn print_health(
    w: &mut dyn Write,
    statuses: &[BackendStatus],
    color: ColorMode,
) -> std::io::Result<()> {
    if statuses.is_empty() {
        writeln!(w, "No AI backends configured")?;
        return Ok(());
    }
    for status in statuses {
        let label = if status.available { "available" } else { "unavailable" };
        if !color.enabled() {
            writeln!(w, "{}: {}", status.name, label)?;
        } else if status.available {
            writeln!(w, "{}: {}", status.name, label.green())?;
        } else {
            writeln!(w, "{}: {}", status.name, label.red())?;
        }
    }
    Ok(())
}
