use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use redline_docx::{Document, RevisionKind, TrackedChangeMarker};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input .docx file
    pub input: PathBuf,

    /// Print the accepted text of every paragraph
    #[arg(long)]
    pub text: bool,
}

pub fn inspect(args: InspectArgs, cwd: &Path) -> Result<()> {
    let input = cwd.join(&args.input);
    let bytes = fs::read(&input).with_context(|| format!("cannot read {}", input.display()))?;
    let doc = Document::load(bytes)?;

    println!("🔍 {} {}", "Inspecting".green().bold(), input.display());
    println!("   Main part: {}", doc.main_part());
    println!("   Paragraphs: {}", doc.len());

    let summary = doc.tracked_change_summary();
    println!(
        "   Tracked changes: {} ({} insertions, {} deletions)",
        summary.total(),
        summary.insertions,
        summary.deletions
    );
    for (author, count) in &summary.by_author {
        println!("     {} {}", format!("{}:", author).dimmed(), count);
    }

    if !doc.preexisting_tracked_changes().is_empty() {
        println!();
        for marker in doc.preexisting_tracked_changes() {
            println!("   {}", describe_marker(marker));
        }
    }

    if args.text {
        println!();
        for (index, paragraph) in doc.paragraphs().iter().enumerate() {
            let text = paragraph.accepted_text();
            if text.trim().is_empty() {
                continue;
            }
            println!("{} {}", format!("{:>4}", index + 1).dimmed(), text);
        }
    }

    Ok(())
}

fn describe_marker(marker: &TrackedChangeMarker) -> String {
    let kind = match marker.kind {
        RevisionKind::Insertion => "insertion".green(),
        RevisionKind::Deletion => "deletion".red(),
    };
    format!(
        "{} #{} by {} in paragraph {}{}",
        kind,
        marker.id,
        marker.author,
        marker.paragraph_index + 1,
        marker
            .timestamp
            .as_deref()
            .map(|t| format!(" at {}", t))
            .unwrap_or_default()
    )
}
