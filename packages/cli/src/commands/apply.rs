use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use redline_editor::{parse_proposals, redline, Attribution, EditOutcome, EditProposal, EditSequencer, EditStatus};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Input .docx file
    pub input: PathBuf,

    /// JSON file with the edit proposals
    #[arg(short, long)]
    pub edits: PathBuf,

    /// Output .docx file (defaults to <input>.redlined.docx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Author recorded on the tracked changes (overrides config)
    #[arg(long)]
    pub author: Option<String>,

    /// Write the per-edit report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Minimum similarity for fuzzy matches (overrides config)
    #[arg(long)]
    pub fuzzy_threshold: Option<f64>,

    /// Replace whole spans instead of only the words that differ
    #[arg(long)]
    pub no_narrowing: bool,
}

pub fn apply(args: ApplyArgs, cwd: &Path) -> Result<()> {
    let mut config = Config::load(cwd)?;
    if let Some(author) = &args.author {
        config.author = author.clone();
    }
    if let Some(threshold) = args.fuzzy_threshold {
        config.editor.locator.fuzzy_threshold = threshold;
    }
    if args.no_narrowing {
        config.editor.recorder.word_level_narrowing = false;
    }

    let input = cwd.join(&args.input);
    let edits = cwd.join(&args.edits);
    let output = cwd.join(args.output.clone().unwrap_or_else(|| default_output(&args.input)));

    let bytes = fs::read(&input).with_context(|| format!("cannot read {}", input.display()))?;
    let proposals = parse_proposals(
        &fs::read_to_string(&edits).with_context(|| format!("cannot read {}", edits.display()))?,
    )?;

    println!("{}", "✏️  Applying edits...".bright_blue().bold());
    println!("   Document: {}", input.display());
    println!("   Proposals: {}", proposals.len());
    println!();

    let sequencer = EditSequencer::new(Attribution::now(&config.author), config.editor.clone())?;
    let result = redline(bytes, &proposals, &sequencer)?;

    for outcome in &result.report.outcomes {
        let proposal = &proposals[outcome.edit_index];
        if outcome.status.is_applied() {
            println!("  {} {}", "✓".green(), describe(outcome, proposal));
        } else {
            eprintln!("  {} {}", "✗".red(), describe(outcome, proposal).red());
        }
    }

    fs::write(&output, &result.document).with_context(|| format!("cannot write {}", output.display()))?;
    info!(output = %output.display(), "Wrote redlined document");

    if let Some(report_path) = &args.report {
        let report_path = cwd.join(report_path);
        fs::write(&report_path, serde_json::to_string_pretty(&result.report)?)
            .with_context(|| format!("cannot write {}", report_path.display()))?;
        println!("   Report: {}", report_path.display());
    }

    let applied = result.report.count(EditStatus::Applied);
    println!();
    if applied == result.report.len() {
        println!("{} Applied {} edits → {}", "✅".green(), applied, output.display());
    } else {
        println!(
            "{} Applied {} of {} edits → {}",
            "⚠️".yellow(),
            applied,
            result.report.len(),
            output.display()
        );
    }

    Ok(())
}

/// `<stem>.redlined.docx` next to the input
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{}.redlined.docx", stem))
}

/// One report line for an outcome
fn describe(outcome: &EditOutcome, proposal: &EditProposal) -> String {
    let mut line = format!(
        "#{} \"{}\" → \"{}\"",
        outcome.edit_index + 1,
        proposal.specific_old_text.trim(),
        proposal.new_text.trim()
    );

    if let Some(paragraph) = outcome.located_paragraph {
        line.push_str(&format!(" (paragraph {})", paragraph + 1));
    }

    if !outcome.status.is_applied() {
        line.push_str(&format!(" - {}", outcome.status));
        if let Some(detail) = &outcome.detail {
            line.push_str(&format!(": {}", detail));
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output(Path::new("contracts/msa.docx")),
            PathBuf::from("contracts/msa.redlined.docx")
        );
    }

    #[test]
    fn test_describe_failed_outcome() {
        let proposal = EditProposal::new("thirty days", "ten days");
        let outcome = EditOutcome::failed(2, EditStatus::AmbiguousMatch, "2 occurrences").at_paragraph(4);

        assert_eq!(
            describe(&outcome, &proposal),
            "#3 \"thirty days\" → \"ten days\" (paragraph 5) - ambiguous_match: 2 occurrences"
        );
    }
}
