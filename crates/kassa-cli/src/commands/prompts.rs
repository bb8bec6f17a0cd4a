//! `kassa prompts` subcommands

use anyhow::{bail, Result};
use kassa_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

/// Look up a prompt id by name, listing the known ids on a miss
pub fn find_prompt_id(name: &str) -> Result<PromptId> {
    if let Some(id) = PromptId::all().iter().find(|id| id.as_str() == name) {
        return Ok(*id);
    }
    let known: Vec<&str> = PromptId::all().iter().map(|id| id.as_str()).collect();
    bail!("no prompt named '{}' (known: {})", name, known.join(", "))
}

fn overrides_dir_label() -> String {
    match default_prompts_dir() {
        Some(dir) if dir.exists() => dir.display().to_string(),
        Some(dir) => format!("{} (not created yet)", dir.display()),
        None => "unavailable on this platform".to_string(),
    }
}

pub fn cmd_prompts_list() -> Result<()> {
    let library = PromptLibrary::new();

    println!();
    println!("🧾 Extraction prompts");
    println!("   ─────────────────────────────────────────────────");
    for info in library.list() {
        let source = if info.is_override { "local file" } else { "built in" };
        println!("   {:<22} v{:<4} {}", info.id, info.version, source);
    }
    println!();
    println!("   Overrides: {}", overrides_dir_label());
    println!("   Drop <id>.md there to replace a built-in prompt.");

    Ok(())
}

pub fn cmd_prompts_show(name: &str) -> Result<()> {
    let id = find_prompt_id(name)?;
    let prompt = PromptLibrary::new().get(id)?;

    let origin = match prompt.override_path {
        Some(ref path) => path.display().to_string(),
        None => "built in".to_string(),
    };
    println!(
        "{} v{} [{}] from {}",
        prompt.metadata.id, prompt.metadata.version, prompt.metadata.task_type, origin
    );
    println!();
    println!("{}", prompt.content);

    Ok(())
}

pub fn cmd_prompts_path() -> Result<()> {
    println!("{}", overrides_dir_label());
    Ok(())
}
