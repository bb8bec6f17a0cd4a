//! Prompt library for oracle extraction
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/kassa/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! A prompt file is markdown with YAML frontmatter and `# System` / `# User`
//! sections. The user section is a template: `{{var}}` is substituted and
//! `{{#if var}}...{{/if}}` blocks are kept only when `var` is non-empty.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const EXTRACT_TRANSACTION: &str = include_str!("../../../prompts/extract_transaction.md");
    pub const EXTRACT_TRANSFER: &str = include_str!("../../../prompts/extract_transfer.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Single-sided expense/income extraction
    ExtractTransaction,
    /// Account-to-account transfer extraction
    ExtractTransfer,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractTransaction => "extract_transaction",
            Self::ExtractTransfer => "extract_transfer",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[Self::ExtractTransaction, Self::ExtractTransfer]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::ExtractTransaction => defaults::EXTRACT_TRANSACTION,
            Self::ExtractTransfer => defaults::EXTRACT_TRANSFER,
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    pub version: u32,
    pub task_type: String,
}

/// A loaded prompt with metadata and body
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

/// System instruction plus rendered task prompt, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render both sections with template variables replaced
    ///
    /// A prompt without a `# User` header is treated as all-user content
    /// with an empty system instruction.
    pub fn render(&self, vars: &HashMap<&str, &str>) -> RenderedPrompt {
        let system = self.system_section().unwrap_or_default();
        let user = self.user_section().unwrap_or(&self.content);
        RenderedPrompt {
            system: substitute(system, vars),
            user: substitute(user, vars),
        }
    }
}

/// Prompt library with a per-process cache
///
/// Interior mutability lets a shared library be used from `&self`.
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: RwLock<HashMap<PromptId, Prompt>>,
}

impl PromptLibrary {
    /// Create a prompt library with the default override directory
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&self, id: PromptId) -> Result<Prompt> {
        if let Ok(cache) = self.cache.read() {
            if let Some(prompt) = cache.get(&id) {
                return Ok(prompt.clone());
            }
        }

        let prompt = self.load(id)?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(id, prompt.clone());
        }
        Ok(prompt)
    }

    /// Render a prompt by ID
    pub fn render(&self, id: PromptId, vars: &HashMap<&str, &str>) -> Result<RenderedPrompt> {
        Ok(self.get(id)?.render(vars))
    }

    /// Load a prompt, preferring a valid override over the embedded default
    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(override_path) = self.override_path(id) {
            if override_path.exists() {
                match load_override(&override_path) {
                    Ok((metadata, body)) => {
                        return Ok(Prompt {
                            metadata,
                            content: body,
                            is_override: true,
                            override_path: Some(override_path),
                        })
                    }
                    Err(e) => warn!(
                        prompt = id.as_str(),
                        path = %override_path.display(),
                        error = %e,
                        "Ignoring broken prompt override"
                    ),
                }
            }
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    /// List all prompts with their override status
    pub fn list(&self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let prompt = self.get(id).ok();
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: prompt.as_ref().map(|p| p.metadata.version).unwrap_or(0),
                    is_override: prompt.as_ref().is_some_and(|p| p.is_override),
                    override_path: self.override_path(id),
                }
            })
            .collect()
    }

    fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|d| d.join(format!("{}.md", id.as_str())))
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Drop cached prompts so edited overrides are picked up
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    /// Whether the active prompt came from an override file
    pub is_override: bool,
    /// Where an override would be read from
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("kassa").join("prompts").join("overrides"))
}

fn load_override(path: &PathBuf) -> Result<(PromptMetadata, String)> {
    let content = fs::read_to_string(path)?;
    parse_prompt(&content)
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    let rest = content.strip_prefix("---").ok_or_else(|| {
        Error::InvalidData("Prompt must start with YAML frontmatter (---)".into())
    })?;

    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

/// Resolve conditionals, then replace `{{var}}` placeholders
///
/// Placeholders are replaced in one left-to-right pass; inserted values are
/// never scanned again. Unknown placeholders stay as written.
fn substitute(template: &str, vars: &HashMap<&str, &str>) -> String {
    let resolved = resolve_conditionals(template, vars);
    let mut result = String::with_capacity(resolved.len());
    let mut rest = resolved.as_str();

    while let Some(open) = rest.find("{{") {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            result.push_str(&rest[open..]);
            return result;
        };

        let token = &rest[open..open + 2 + close + 2];
        match vars.get(after_open[..close].trim()) {
            Some(value) => result.push_str(value),
            None => result.push_str(token),
        }
        rest = &after_open[close + 2..];
    }
    result.push_str(rest);
    result
}

fn resolve_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    while let Some(if_start) = result.find("{{#if ") {
        let var_start = if_start + "{{#if ".len();
        let Some(var_len) = result[var_start..].find("}}") else {
            break;
        };
        let var_name = result[var_start..var_start + var_len].trim().to_string();
        let block_start = var_start + var_len + 2;
        let Some(block_len) = result[block_start..].find("{{/if}}") else {
            break;
        };
        let block_end = block_start + block_len;
        let full_end = block_end + "{{/if}}".len();

        let keep = vars.get(var_name.as_str()).is_some_and(|v| !v.is_empty());
        let replacement = if keep {
            result[block_start..block_end].to_string()
        } else {
            String::new()
        };
        result = format!("{}{}{}", &result[..if_start], replacement, &result[full_end..]);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt_from(content: &str) -> Prompt {
        let (metadata, body) = parse_prompt(content).unwrap();
        Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        }
    }

    #[test]
    fn test_parse_prompt() {
        let content = r#"---
id: test_prompt
version: 2
task_type: structured_extraction
---

# System
Answer in JSON.

# User
Message: "{{text}}"
"#;

        let (metadata, body) = parse_prompt(content).unwrap();
        assert_eq!(metadata.id, "test_prompt");
        assert_eq!(metadata.version, 2);
        assert_eq!(metadata.task_type, "structured_extraction");
        assert!(body.starts_with("# System"));
    }

    #[test]
    fn test_parse_prompt_requires_frontmatter() {
        assert!(parse_prompt("# System\nhello").is_err());
        assert!(parse_prompt("---\nid: x\n# System").is_err());
    }

    #[test]
    fn test_render_splits_sections() {
        let prompt = prompt_from(
            "---\nid: t\nversion: 1\ntask_type: t\n---\n# System\nBe brief.\n\n# User\nMessage: \"{{text}}\"",
        );
        let mut vars = HashMap::new();
        vars.insert("text", "купил кофе 800");

        let rendered = prompt.render(&vars);
        assert_eq!(rendered.system, "Be brief.");
        assert_eq!(rendered.user, "Message: \"купил кофе 800\"");
    }

    #[test]
    fn test_conditional_blocks() {
        let content = "Start{{#if currency}}\nCurrency: {{currency}}{{/if}}\nEnd";

        let mut vars = HashMap::new();
        vars.insert("currency", "KZT");
        let result = substitute(content, &vars);
        assert!(result.contains("Currency: KZT"));

        let empty: HashMap<&str, &str> = HashMap::new();
        let result = substitute(content, &empty);
        assert!(!result.contains("Currency"));
        assert!(result.contains("Start"));
        assert!(result.contains("End"));
    }

    #[test]
    fn test_substituted_value_is_not_template() {
        let mut vars = HashMap::new();
        vars.insert("text", "{{#if x}}gone{{/if}}");
        let result = substitute("Message: {{text}}", &vars);
        assert_eq!(result, "Message: {{#if x}}gone{{/if}}");
    }

    #[test]
    fn test_placeholders_in_user_text_stay_literal() {
        let mut vars = HashMap::new();
        vars.insert("accounts", "kaspi, halyk");
        vars.insert("home_currency", "KZT");
        vars.insert("text", "купил {{accounts}} 800 {{home_currency}}");

        let template = "Accounts: {{accounts}}\nMessage: {{text}}\nUnknown: {{nope}}";
        for _ in 0..50 {
            assert_eq!(
                substitute(template, &vars),
                "Accounts: kaspi, halyk\nMessage: купил {{accounts}} 800 {{home_currency}}\nUnknown: {{nope}}"
            );
        }
    }

    #[test]
    fn test_default_prompts_parse() {
        for id in PromptId::all() {
            let (metadata, body) = parse_prompt(id.default_content())
                .unwrap_or_else(|e| panic!("Failed to parse {}: {}", id.as_str(), e));
            assert_eq!(metadata.id, id.as_str());
            assert!(body.contains("{{text}}"));
            assert!(body.contains("# System"));
        }
    }

    #[test]
    fn test_override_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extract_transfer.md"),
            "---\nid: extract_transfer\nversion: 9\ntask_type: structured_extraction\n---\n# System\nOverride\n# User\n{{text}}",
        )
        .unwrap();

        let lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        let prompt = lib.get(PromptId::ExtractTransfer).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 9);

        let prompt = lib.get(PromptId::ExtractTransaction).unwrap();
        assert!(!prompt.is_override);
    }

    #[test]
    fn test_broken_override_falls_back_to_embedded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("extract_transaction.md"), "no frontmatter").unwrap();

        let lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        let prompt = lib.get(PromptId::ExtractTransaction).unwrap();
        assert!(!prompt.is_override);
    }
}
