use anyhow::Result;
use dreamassembler::Config;

const KEYS: &[&str] = &[
    "github.api_url",
    "github.organization",
    "github.modpack_repo",
    "github.token",
    "paths.cache_dir",
    "paths.manifest",
    "bulk.verify_checksum",
];

pub fn run(action: &crate::ConfigAction) -> Result<()> {
    use crate::ConfigAction;

    match action {
        ConfigAction::Show => show_config(),
        ConfigAction::Set { key, value } => set_config(key, value),
    }
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "✅ enabled"
    } else {
        "❌ disabled"
    }
}

fn show_config() -> Result<()> {
    let config = Config::load()?;
    let config_path = Config::default_path()?;

    println!();
    println!("DreamAssembler Configuration");
    println!("============================");
    println!();
    println!("  📁 Config file: {}", config_path.display());
    println!();

    println!("[github]");
    println!("  API URL:       {}", config.github.api_url);
    println!("  Organization:  {}", config.github.organization);
    println!("  Modpack repo:  {}", config.github.modpack_repo);
    println!(
        "  Token:         {}",
        if config.token().is_some() {
            "<set>"
        } else {
            "<not set>"
        }
    );
    println!();

    println!("[paths]");
    println!("  Cache dir:     {}", config.cache_dir().display());
    println!("  Manifest:      {}", config.manifest_path().display());
    println!();

    println!("[bulk]");
    println!(
        "  Verify checksum: {}",
        format_bool(config.bulk.verify_checksum)
    );
    println!();

    println!("💡 Modify settings:");
    println!("   dreamassembler config set <key> <value>");
    println!();
    println!("   Available keys:");
    for key in KEYS {
        println!("     • {}", key);
    }
    println!();

    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    if let Err(e) = config.set(key, value) {
        if !KEYS.contains(&key) {
            println!("  Available keys:");
            for key in KEYS {
                println!("    • {}", key);
            }
            println!();
        }
        return Err(e.into());
    }

    config.save()?;

    if key == "github.token" {
        let shown = if value.is_empty() { "<cleared>" } else { "<set>" };
        println!("  ✓ {} = {}", key, shown);
    } else {
        println!("  ✓ {} = \"{}\"", key, value);
    }
    println!();
    println!("✅ Configuration saved");

    Ok(())
}
