//! @ai:module:intent Format module descriptors for display and write the module-info artifact
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, ModuleInfo, format_descriptor, write_module_info
//! @ai:module:depends_on allocator, role, error
//! @ai:module:stateless true

use crate::allocator::ModuleDescriptor;
use crate::error::{Error, Result};
use crate::role::Role;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

pub const DEFAULT_INFO_FILE: &str = "__sm_info.json";

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

/// @ai:intent JSON artifact describing a generated module
#[derive(Debug, Serialize)]
pub struct ModuleInfo<'a> {
    pub name: &'a str,
    pub id: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(flatten)]
    pub descriptor: &'a ModuleDescriptor,
}

impl<'a> ModuleInfo<'a> {
    /// @ai:intent Build module info, base64-encoding the key when present
    pub fn new(name: &'a str, id: u16, key: Option<&[u8]>, descriptor: &'a ModuleDescriptor) -> Self {
        Self {
            name,
            id,
            key: key.map(|k| STANDARD.encode(k)),
            descriptor,
        }
    }
}

/// @ai:intent Write the module-info artifact as pretty JSON
/// @ai:effects fs:write
pub fn write_module_info(path: &Path, info: &ModuleInfo<'_>) -> Result<()> {
    let content = serde_json::to_string_pretty(info)?;
    std::fs::write(path, content).map_err(|e| Error::io(path, e))
}

/// @ai:intent Format a module descriptor as a string
/// @ai:effects pure
pub fn format_descriptor(descriptor: &ModuleDescriptor, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(descriptor).unwrap_or_default(),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(descriptor).unwrap_or_default(),
        OutputFormat::Text => format_descriptor_text(descriptor),
    }
}

/// @ai:intent Format a module descriptor as human-readable text
/// @ai:effects pure
fn format_descriptor_text(descriptor: &ModuleDescriptor) -> String {
    let mut output = String::new();

    for role in Role::ALL {
        let declarations = descriptor.declarations(role);
        if declarations.is_empty() {
            continue;
        }

        output.push_str(&format!(
            "{} ({})\n",
            role.key().bold(),
            declarations.len()
        ));

        for decl in declarations {
            output.push_str(&format!(
                "  {:>5}  {}\n",
                decl.id.to_string().dimmed(),
                decl.name.cyan()
            ));
        }
    }

    if descriptor.is_empty() {
        output.push_str(&format!("{} No annotations found\n", "WARN".yellow().bold()));
    } else {
        output.push_str(&format!(
            "\n{} {} declarations\n",
            "OK".green().bold(),
            descriptor.len()
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::allocate;
    use crate::scanner::scan;
    use tempfile::TempDir;

    const MODULE: &str = "//@ sm_output(send)\n//@ sm_input\npub fn recv(d: &[u8]) {\n}\n";

    #[test]
    fn test_module_info_json_shape() {
        let desc = allocate(&scan(MODULE)).unwrap();
        let info = ModuleInfo::new("button", 3, Some(&[0u8; 16][..]), &desc);
        let value = serde_json::to_value(&info).unwrap();

        assert_eq!(value["name"], "button");
        assert_eq!(value["id"], 3);
        assert_eq!(value["key"], "AAAAAAAAAAAAAAAAAAAAAA==");
        assert_eq!(value["outputs"]["send"], 16384);
        assert_eq!(value["inputs"]["recv"], 0);
        assert!(value["entrypoints"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_module_info_omits_missing_key() {
        let desc = ModuleDescriptor::default();
        let info = ModuleInfo::new("m", 1, None, &desc);
        let value = serde_json::to_value(&info).unwrap();
        assert!(value.get("key").is_none());
    }

    #[test]
    fn test_write_module_info() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_INFO_FILE);
        let desc = allocate(&scan(MODULE)).unwrap();

        write_module_info(&path, &ModuleInfo::new("m", 1, None, &desc)).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["outputs"]["send"], 16384);
    }

    #[test]
    fn test_text_format_lists_roles() {
        colored::control::set_override(false);
        let desc = allocate(&scan(MODULE)).unwrap();
        let text = format_descriptor(&desc, OutputFormat::Text);

        assert!(text.contains("outputs (1)"));
        assert!(text.contains("16384  send"));
        assert!(text.contains("2 declarations"));
        assert!(!text.contains("handlers"));
    }
}
