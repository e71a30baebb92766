// Colored terminal output for moderation verdicts.
//
// main.rs delegates here unless `--json` was requested.

use colored::Colorize;

use crate::aggregate::AggregatedResult;
use crate::pipeline::{BatchResult, OverallDecision};
use crate::policy::ModerationAction;

/// Display the verdict for a single item.
pub fn display_result(label: &str, result: &AggregatedResult) {
    println!("\n{}", format!("=== {label} ===").bold());

    println!(
        "  Action: {}   Confidence: {:.2}   Appropriate: {}",
        colorize_action(result.moderation_action),
        result.confidence,
        if result.is_appropriate {
            "yes".green()
        } else {
            "no".red()
        }
    );

    if !result.categories.is_empty() {
        // Highest scores first
        let mut categories: Vec<(&String, &f64)> = result.categories.iter().collect();
        categories.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));

        println!("\n  {:<28} {:>6}", "Category".dimmed(), "Score".dimmed());
        println!("  {}", "-".repeat(36).dimmed());
        for (name, score) in categories {
            let marker = if result.flagged_reasons.contains(name) {
                "!".red().bold()
            } else {
                " ".normal()
            };
            println!("{marker} {name:<28} {score:>6.2}");
        }
    }

    // Reasons without a score (detector counts) would otherwise be invisible.
    let unscored: Vec<&str> = result
        .flagged_reasons
        .iter()
        .filter(|r| !result.categories.contains_key(*r))
        .map(String::as_str)
        .collect();
    if !unscored.is_empty() {
        println!("\n  Also flagged: {}", unscored.join(", ").yellow());
    }

    if let Some(errors) = &result.errors {
        println!("\n  {} provider error(s):", errors.len());
        for error in errors {
            println!("    {}", super::truncate_chars(error, 140).dimmed());
        }
    }
}

/// Display every item of a batch and the overall decision.
pub fn display_batch(batch: &BatchResult) {
    for (kind, result) in &batch.results {
        display_result(&format!("{kind} item"), result);
    }

    let overall = match batch.overall_decision {
        OverallDecision::Allow => "ALLOW".green().bold(),
        OverallDecision::Block => "BLOCK".red().bold(),
    };
    println!("\n  Overall decision: {overall}");
}

fn colorize_action(action: ModerationAction) -> colored::ColoredString {
    let label = action.as_str().to_uppercase();
    match action {
        ModerationAction::Allow => label.green().bold(),
        ModerationAction::Flag => label.yellow().bold(),
        ModerationAction::Block => label.red().bold(),
    }
}
