//! Terminal output

use colored::Colorize;
use serde::Serialize;

use crate::errors::ManifestError;
use crate::manager::{CreatedManifest, ManifestSummary, PromotionOutcome, PromotionPlan};
use crate::manifest::validate::ValidationReport;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), ManifestError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_created(created: &CreatedManifest, json: bool) -> Result<(), ManifestError> {
    if json {
        return print_json(created);
    }

    println!(
        "{} {} ({})",
        "Created".green().bold(),
        created.manifest.version,
        created.path.display()
    );
    for (name, component) in &created.manifest.components {
        println!(
            "  {:<24} {}",
            name,
            component.identity().unwrap_or("-")
        );
    }
    if !created.drafts.is_empty() {
        println!(
            "{} draft: complete {} before promotion",
            "!".yellow().bold(),
            created.drafts.join(", ")
        );
    }
    Ok(())
}

pub fn print_report(report: &ValidationReport, json: bool) -> Result<(), ManifestError> {
    if json {
        return print_json(report);
    }

    if report.passed {
        println!("{} {}", "✓ valid".green().bold(), report.version);
    } else {
        println!("{} {}", "✗ invalid".red().bold(), report.version);
        for issue in &report.issues {
            println!("  {} {}", "-".red(), issue);
        }
    }
    for warning in &report.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
    Ok(())
}

pub fn print_plan(plan: &PromotionPlan, json: bool) -> Result<(), ManifestError> {
    if json {
        return print_json(plan);
    }

    println!(
        "{} {} may be promoted to {}{}",
        "✓".green().bold(),
        plan.version,
        plan.environment,
        if plan.redeploy { " (re-promotion)" } else { "" }
    );
    for warning in &plan.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
    Ok(())
}

pub fn print_outcome(outcome: &PromotionOutcome, json: bool) -> Result<(), ManifestError> {
    if json {
        return print_json(outcome);
    }

    println!(
        "{} promotion of {} to {} ({} {})",
        "Triggered".green().bold(),
        outcome.version,
        outcome.environment,
        outcome.handle.backend,
        outcome.handle.id
    );
    Ok(())
}

pub fn print_summary(summary: &ManifestSummary, json: bool) -> Result<(), ManifestError> {
    if json {
        return print_json(summary);
    }

    println!("{} {}", "Release".bold(), summary.version);
    println!("  created     {} by {}", summary.created, summary.created_by);
    if !summary.description.is_empty() {
        println!("  description {}", summary.description);
    }

    println!("{}", "Components".bold());
    for component in &summary.components {
        let identity = component.identity.as_deref().unwrap_or("-");
        let identity = if component.draft {
            identity.yellow()
        } else {
            identity.normal()
        };
        println!("  {:<24} {}", component.name, identity);
    }

    println!("{}", "Environments".bold());
    for env in &summary.environments {
        let deployed = env
            .deployed
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "not deployed".to_string());
        let validated = match (&env.validated, &env.validated_by) {
            (true, Some(by)) => format!("validated by {}", by).green(),
            (true, None) => "validated".green(),
            (false, _) => "not validated".normal(),
        };
        println!("  {:<8} {:<28} {}", env.name, deployed, validated);
    }

    let approval = match (&summary.approval_required, &summary.approved_by) {
        (_, Some(by)) => format!("approved by {}", by).green(),
        (true, None) => "approval pending".yellow(),
        (false, None) => "approval not required".normal(),
    };
    println!("{} {}", "Approval".bold(), approval);
    if !summary.pending_tests.is_empty() {
        println!("{} {}", "Pending tests".bold(), summary.pending_tests.join(", "));
    }

    print_report(&summary.validation, false)
}

pub fn print_list(versions: &[String], json: bool) -> Result<(), ManifestError> {
    if json {
        return print_json(&versions);
    }

    for version in versions {
        println!("{}", version);
    }
    Ok(())
}

/// Print an error, including every failing field for validation errors
pub fn print_error(err: &ManifestError) {
    match err {
        ManifestError::ValidationFailed(issues) => {
            eprintln!("{} manifest validation failed", "error:".red().bold());
            for issue in issues {
                eprintln!("  {} {}", "-".red(), issue);
            }
        }
        other => eprintln!("{} {}", "error:".red().bold(), other),
    }
}
