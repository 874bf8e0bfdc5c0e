use anyhow::Result;
use dreamassembler::{Config, Error, GithubClient, Manifest, ModEntry, Side};
use std::path::PathBuf;

pub fn run(repo: String, side: String, manifest_override: Option<String>) -> Result<()> {
    let side: Side = side.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let config = Config::load()?;
    let manifest_path = manifest_override
        .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()))
        .unwrap_or_else(|| config.manifest_path());
    let mut manifest = Manifest::load(&manifest_path)?;

    if manifest.get_github_mod(&repo).is_some() {
        println!("⚠️  Mod {} already exists in the manifest", repo);
        return Ok(());
    }

    let github = GithubClient::from_config(&config)?;

    println!();
    println!("🔍 Looking up {}/{}...", config.github.organization, repo);
    let repository = github.get_repo(&repo)?;
    let release = github.latest_release(&repository.name)?;

    let mut entry = ModEntry::new(repository.name.clone(), side);
    entry.version = Some(release.tag_name.clone());
    entry.license = repository
        .license
        .as_ref()
        .and_then(|l| l.spdx_id.clone().or_else(|| l.name.clone()));

    match manifest.add_github_mod(entry) {
        Ok(()) => {}
        Err(Error::AlreadyExists(name)) => {
            println!("⚠️  Mod {} already exists in the manifest", name);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    manifest.sort_mods();
    manifest.save(&manifest_path)?;

    println!("✓ Added {} {} ({})", repository.name, release.tag_name, side);
    println!("  Manifest: {}", manifest_path.display());
    println!();

    Ok(())
}
