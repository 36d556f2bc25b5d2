//! `package`: run the full pipeline.

use crate::bundler::{Bundler, PackageOutcome, PipelineOutcome, PipelineReport};
use crate::cli::{Args, RuntimeConfig};
use crate::error::{ReleaseError, Result};

/// Build the packages. Exit code 0 even when a packaging tool failed.
pub(super) async fn execute_package(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let settings = args.project.settings().await?;
    config.section(&format!(
        "Packaging {}",
        settings.project_root().display()
    ));

    match Bundler::new(settings).run().await {
        PipelineOutcome::Completed(report) => {
            print_report(&report, config);
            Ok(0)
        }
        PipelineOutcome::Failed {
            stage,
            error,
            report,
        } => {
            if !report.completed.is_empty() {
                let done: Vec<_> = report.completed.iter().map(|s| s.name()).collect();
                config.verbose_println(&format!("Completed before failure: {}", done.join(", ")));
            }
            Err(ReleaseError::StageFailed {
                stage,
                source: error,
            })
        }
    }
}

fn print_report(report: &PipelineReport, config: &RuntimeConfig) {
    for package in report.packages() {
        print_package(package, config);
    }

    let built = report.packages().filter(|p| p.succeeded()).count();
    if built == 2 {
        config.success_println(&format!("{} packaged", report.pack_name));
    } else {
        config.warning_println(&format!(
            "{} packaged with {} of 2 packages",
            report.pack_name, built
        ));
    }
    if !report.cleaned {
        config.verbose_println("Staging directory kept");
    }
}

fn print_package(package: &PackageOutcome, config: &RuntimeConfig) {
    if let Some(reason) = package.tool.failure_reason() {
        config.warning_println(&format!("{}: {}", package.package_type, reason));
        config.verbose_println(&package.tool.command_line);
        for line in package.tool.stderr.lines().take(20) {
            config.indent(line);
        }
        return;
    }
    if package.artifacts.is_empty() {
        config.warning_println(&format!("{}: no package produced", package.package_type));
        return;
    }
    for artifact in &package.artifacts {
        let path = artifact
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        config.success_println(&format!("{}: {}", artifact.package_type, path));
        config.indent(&format!("{} bytes, sha256 {}", artifact.size, artifact.checksum));
    }
}
