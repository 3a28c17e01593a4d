use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// 32-bit Raspberry Pi OS userland (Pi 1 through Pi 4).
pub const DEFAULT_CROSS_TARGET: &str = "armv7-unknown-linux-gnueabihf";

/// What a failing step does to the overall result.
#[derive(Clone, Copy, PartialEq, Eq)]
enum OnFailure {
    Abort,
    Warn,
}

struct Step<'a> {
    label: &'a str,
    args: Vec<&'a str>,
    on_failure: OnFailure,
}

pub fn run(cross_target: Option<&str>) -> Result<()> {
    println!();
    println!("{}", "🔍 Checking bring-up workspace...".cyan().bold());
    println!();

    let total_start = Instant::now();

    let mut steps = vec![Step {
        label: "host build",
        args: vec!["check", "--workspace", "--all-targets"],
        on_failure: OnFailure::Abort,
    }];
    if let Some(target) = cross_target {
        steps.push(Step {
            label: "cross build",
            args: vec!["check", "-p", "platform", "-p", "bringup", "--target", target],
            on_failure: OnFailure::Abort,
        });
    }
    steps.push(Step {
        label: "clippy",
        args: vec!["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        on_failure: OnFailure::Warn,
    });
    steps.push(Step {
        label: "formatting",
        args: vec!["fmt", "--all", "--check"],
        on_failure: OnFailure::Warn,
    });

    for step in &steps {
        run_step(step)?;
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

fn run_step(step: &Step<'_>) -> Result<()> {
    println!("{}", format!("  Checking {}...", step.label).cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(&step.args)
        .output()
        .with_context(|| format!("Failed to run cargo {}", step.args.join(" ")))?;

    if output.status.success() {
        println!(
            "{}",
            format!(
                "  ✓ {} passed in {:.2}s",
                step.label,
                start.elapsed().as_secs_f64()
            )
            .green()
        );
        println!();
        return Ok(());
    }

    match step.on_failure {
        OnFailure::Abort => {
            eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} failed", step.label);
        }
        OnFailure::Warn => {
            eprintln!("{}", format!("  ⚠ {} reported issues", step.label).yellow().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            println!();
            Ok(())
        }
    }
}
