//! Prompt library commands
//!
//! There is one system instruction per search category. Overrides are plain
//! `<category>.md` files in the data directory and win over the built-in ones.

use anyhow::{anyhow, Result};
use construtec_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};
use construtec_core::Category;

fn overrides_dir_label() -> String {
    default_prompts_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no data directory on this system)".to_string())
}

pub fn cmd_prompts_list() -> Result<()> {
    let library = PromptLibrary::new();

    println!("{:<12} {:<30} {:>7}  SOURCE", "CATEGORY", "REPORT", "VERSION");
    println!("{}", "-".repeat(64));

    for info in library.list() {
        let report = info
            .category
            .parse::<Category>()
            .map(|c| c.data_type().title())
            .unwrap_or("?");
        let source = match &info.override_path {
            Some(path) => format!("override ({})", path.display()),
            None => "built-in".to_string(),
        };
        println!("{:<12} {:<30} {:>7}  {}", info.id, report, info.version, source);
    }

    println!();
    println!("Overrides: {}", overrides_dir_label());
    println!("Copy a built-in prompt there as <category>.md to customize it.");

    Ok(())
}

pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let id: PromptId = prompt_id.parse().map_err(|_| {
        let known: Vec<&str> = PromptId::all().iter().map(|id| id.as_str()).collect();
        anyhow!("Unknown prompt '{}'. Known: {}", prompt_id, known.join(", "))
    })?;

    let prompt = PromptLibrary::new().get(id)?;

    println!(
        "# {} v{} ({})",
        prompt.metadata.id,
        prompt.metadata.version,
        if prompt.is_override { "override" } else { "built-in" }
    );
    if let Some(path) = &prompt.override_path {
        println!("# {}", path.display());
    }
    println!();
    println!("{}", prompt.content);

    Ok(())
}

pub fn cmd_prompts_path() -> Result<()> {
    let Some(path) = default_prompts_dir() else {
        eprintln!("The data directory is not available on this system.");
        return Ok(());
    };

    println!("{}", path.display());
    if !path.exists() {
        eprintln!("(does not exist yet; create it to add overrides)");
    }
    Ok(())
}
