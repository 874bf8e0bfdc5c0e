use anyhow::Result;
use dreamassembler::{
    render_label, Config, GithubClient, Manifest, Pipeline, PipelineOutcome, ProgressCallback,
    StagingArea,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Bar resolution: hundredths of a percent
const BAR_LENGTH: u64 = 10_000;

/// Create an indicatif-based progress callback for CLI display
fn create_bar_callback(pb: &ProgressBar) -> ProgressCallback {
    let pb = pb.clone();
    Arc::new(move |delta: f64, label: &str| {
        pb.inc((delta * 100.0).round().max(0.0) as u64);
        let percent = pb.position() as f64 / 100.0;
        pb.set_message(render_label(label, percent));
    })
}

pub fn run(manifest_override: Option<String>, cache_override: Option<String>) -> Result<()> {
    let config = Config::load()?;

    let manifest_path = manifest_override
        .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()))
        .unwrap_or_else(|| config.manifest_path());
    let cache_dir = cache_override
        .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()))
        .unwrap_or_else(|| config.cache_dir());

    let manifest = Manifest::load(&manifest_path)?;
    let github = GithubClient::from_config(&config)?;

    println!();
    println!(
        "Building modpack {} ({} mods)",
        manifest.modpack_version,
        manifest.github_mods.len()
    );
    println!("  Manifest: {}", manifest_path.display());
    println!("  Staging:  {}", cache_dir.display());
    println!();

    let pb = ProgressBar::new(BAR_LENGTH);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message("Starting...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let start_time = Instant::now();
    let mut pipeline = Pipeline::new(StagingArea::new(&cache_dir), &manifest, &github, &github)
        .with_progress(create_bar_callback(&pb));

    let outcome = match pipeline.run() {
        Ok(outcome) => outcome,
        Err(e) => {
            pb.finish_and_clear();
            if e.is_configuration() {
                println!("Fix {} and run the build again.", manifest_path.display());
            }
            return Err(e.into());
        }
    };

    match outcome {
        PipelineOutcome::Completed(built) => {
            let elapsed = start_time.elapsed();
            pb.finish_with_message(format!("Done in {:.1}s", elapsed.as_secs_f32()));
            println!();
            for archive in [&built.client, &built.server] {
                println!(
                    "✓ {} archive: {} ({} files)",
                    archive.platform,
                    archive.path.display(),
                    archive.file_count
                );
            }
            println!();
            Ok(())
        }
        PipelineOutcome::Aborted(reason) => {
            pb.abandon_with_message("Aborted");
            println!();
            println!("The staging folders were left untouched.");
            anyhow::bail!("Build aborted: {}", reason)
        }
    }
}
