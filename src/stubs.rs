//! @ai:module:intent Load and render the text templates injected into generated modules
//! @ai:module:layer infrastructure
//! @ai:module:public_api StubLibrary, render
//! @ai:module:stateless true

use crate::error::{Error, Result};
use std::path::PathBuf;

pub const STUB_MODS_USES: &str = "mods_uses.rs";
pub const STUB_OUTPUT: &str = "output.rs";
pub const STUB_REQUEST: &str = "request.rs";
pub const STUB_CONSTANTS: &str = "constants.rs";
pub const STUB_MAIN: &str = "main.rs";
pub const STUB_AUTH_EXEC: &str = "__authentic_execution.rs";
pub const STUB_RUNNER_RUN: &str = "__run.rs";
pub const STUB_RUNNER_DEPS: &str = "dependencies.toml";
pub const CARGO_DEPENDENCIES: &str = "common_deps.toml";

/// @ai:intent Source of stub templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StubLibrary {
    /// Templates compiled into the binary
    #[default]
    Builtin,
    /// Templates read from a directory with the built-in layout
    Directory(PathBuf),
}

impl StubLibrary {
    /// @ai:intent Look up a stub by its path relative to the library root
    /// @ai:post Ok(None) when the stub does not exist
    /// @ai:effects fs:read
    pub fn load(&self, name: &str) -> Result<Option<String>> {
        match self {
            StubLibrary::Builtin => Ok(builtin(name).map(str::to_string)),
            StubLibrary::Directory(dir) => {
                let path = dir.join(name);
                if !path.is_file() {
                    return Ok(None);
                }
                std::fs::read_to_string(&path)
                    .map(Some)
                    .map_err(|e| Error::io(path, e))
            }
        }
    }

    /// @ai:intent Look up a stub that must exist
    /// @ai:effects fs:read
    pub fn require(&self, name: &str) -> Result<String> {
        self.load(name)?.ok_or_else(|| Error::Template {
            stub: name.to_string(),
            message: "stub not found".to_string(),
        })
    }
}

fn builtin(name: &str) -> Option<&'static str> {
    let content = match name {
        STUB_MODS_USES => include_str!("../stubs/mods_uses.rs"),
        STUB_OUTPUT => include_str!("../stubs/output.rs"),
        STUB_REQUEST => include_str!("../stubs/request.rs"),
        STUB_CONSTANTS => include_str!("../stubs/constants.rs"),
        STUB_MAIN => include_str!("../stubs/main.rs"),
        STUB_AUTH_EXEC => include_str!("../stubs/__authentic_execution.rs"),
        CARGO_DEPENDENCIES => include_str!("../stubs/common_deps.toml"),
        "runner_sgx/__run.rs" => include_str!("../stubs/runner_sgx/__run.rs"),
        "runner_sgx/dependencies.toml" => include_str!("../stubs/runner_sgx/dependencies.toml"),
        "runner_native/__run.rs" => include_str!("../stubs/runner_native/__run.rs"),
        "runner_native/dependencies.toml" => {
            include_str!("../stubs/runner_native/dependencies.toml")
        }
        _ => return None,
    };
    Some(content)
}

/// @ai:intent Substitute `{field}` placeholders in a template
/// @ai:pre every placeholder in the template names a field in `fields`
/// @ai:post `{{` and `}}` become literal braces
/// @ai:example ("s", "{a}-{{b}}", [("a", "1")]) -> "1-{b}"
/// @ai:effects pure
pub fn render(stub: &str, template: &str, fields: &[(&str, &str)]) -> Result<String> {
    let fail = |message: String| Error::Template {
        stub: stub.to_string(),
        message,
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let rest = &template[pos + 1..];
                let close = rest
                    .find('}')
                    .ok_or_else(|| fail(format!("unclosed '{{' at byte {pos}")))?;
                let field = &rest[..close];

                let value = fields
                    .iter()
                    .find(|(name, _)| *name == field)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| fail(format!("unknown field `{field}`")))?;
                out.push_str(value);

                // skip the field name and the closing brace
                for _ in 0..field.chars().count() + 1 {
                    chars.next();
                }
            }
            '}' => return Err(fail(format!("single '}}' at byte {pos}"))),
            _ => out.push(c),
        }
    }

    Ok(out)
}
