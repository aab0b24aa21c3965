//! Command dispatch

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::app::options::{Cli, Command, RecordCommand};
use crate::app::render;
use crate::collab::Collaborators;
use crate::errors::ManifestError;
use crate::filesys::dir::Dir;
use crate::logs::{init_logging, LogOptions};
use crate::manager::{CreateOptions, ManagerOptions, ManifestManager, RedeployDecision};
use crate::manifest::store::ManifestStore;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::utils::version_info;

/// Exit code of a successful command
pub const EXIT_OK: i32 = 0;
/// Exit code of a failed command or check
pub const EXIT_FAILURE: i32 = 1;

/// Run one relman command and return its exit code
pub async fn run(cli: Cli) -> Result<i32, ManifestError> {
    if let Command::Version = cli.command {
        render::print_json(&version_info())?;
        return Ok(EXIT_OK);
    }

    let layout = match &cli.config {
        Some(path) => StorageLayout::from_settings_path(path),
        None => StorageLayout::default(),
    };
    let settings = Settings::load(&layout.settings_file()).await?;

    let log_options = LogOptions {
        log_level: cli.log_level.unwrap_or(settings.log_level),
        format: cli.log_format.unwrap_or(settings.log_format),
        log_file: settings.log_file.as_deref().map(|p| layout.resolve(p)),
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let manifests_dir = match &cli.manifests_dir {
        Some(dir) => Dir::new(dir),
        None => layout.manifests_dir(&settings.manifests_dir),
    };
    debug!("Using manifest store {}", manifests_dir.path().display());

    let manager = ManifestManager::new(
        ManifestStore::new(manifests_dir),
        Collaborators::from_settings(&settings)?,
        ManagerOptions::from(&settings),
    );

    execute(&manager, cli.command, cli.json).await
}

async fn execute(manager: &ManifestManager, command: Command, json: bool) -> Result<i32, ManifestError> {
    match command {
        Command::Create {
            version,
            created_by,
            description,
        } => {
            let created = manager
                .create(
                    &version,
                    CreateOptions {
                        created_by,
                        description,
                    },
                )
                .await?;
            render::print_created(&created, json)?;
            Ok(EXIT_OK)
        }

        Command::Validate { target } => {
            let report = if looks_like_path(&target) {
                manager.validate_path(Path::new(&target)).await?
            } else {
                manager.validate_version(&target).await?
            };
            render::print_report(&report, json)?;
            Ok(if report.passed { EXIT_OK } else { EXIT_FAILURE })
        }

        Command::Promote {
            version,
            environment,
            yes,
            no_input,
            dry_run,
        } => {
            let decision = if yes {
                RedeployDecision::Confirm
            } else if manager.is_redeploy(&version, &environment).await? {
                if no_input {
                    RedeployDecision::Decline
                } else {
                    confirm_redeploy(&version, &environment).await?
                }
            } else {
                RedeployDecision::Decline
            };

            if dry_run {
                let plan = manager.check_promotion(&version, &environment, decision).await?;
                render::print_plan(&plan, json)?;
            } else {
                let outcome = manager.promote(&version, &environment, decision).await?;
                render::print_outcome(&outcome, json)?;
            }
            Ok(EXIT_OK)
        }

        Command::Record { fact } => {
            let manifest = match fact {
                RecordCommand::Deployed {
                    version,
                    environment,
                    at,
                    notes,
                } => {
                    manager
                        .record_deployment(&version, &environment, at.unwrap_or_else(Utc::now), notes)
                        .await?
                }
                RecordCommand::Validated {
                    version,
                    environment,
                    by,
                    notes,
                } => {
                    manager
                        .record_validation(&version, &environment, &by, Utc::now(), notes)
                        .await?
                }
                RecordCommand::Approved { version, by, notes } => {
                    manager.record_approval(&version, &by, Utc::now(), notes).await?
                }
                RecordCommand::Test { version, suite } => {
                    manager.record_test_passed(&version, &suite).await?
                }
            };
            let summary = manager.summary(&manifest.version).await?;
            render::print_summary(&summary, json)?;
            Ok(EXIT_OK)
        }

        Command::List => {
            let versions = manager.list().await?;
            render::print_list(&versions, json)?;
            Ok(EXIT_OK)
        }

        Command::Show { version } => {
            let summary = manager.summary(&version).await?;
            render::print_summary(&summary, json)?;
            Ok(EXIT_OK)
        }

        Command::Version => {
            render::print_json(&version_info())?;
            Ok(EXIT_OK)
        }
    }
}

/// A manifest file rather than a stored version
fn looks_like_path(target: &str) -> bool {
    target.ends_with(".yaml")
        || target.ends_with(".yml")
        || Path::new(target).components().count() > 1
}

/// Ask the operator whether to redeploy; anything but yes declines
async fn confirm_redeploy(version: &str, environment: &str) -> Result<RedeployDecision, ManifestError> {
    let mut stderr = tokio::io::stderr();
    stderr
        .write_all(
            format!(
                "{} is already deployed to {}. Promote again? [y/N] ",
                version, environment
            )
            .as_bytes(),
        )
        .await?;
    stderr.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("failed to read confirmation from stdin")?;

    let decision = match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => RedeployDecision::Confirm,
        _ => RedeployDecision::Decline,
    };
    info!("Re-promotion of {} to {}: {:?}", version, environment, decision);
    Ok(decision)
}
