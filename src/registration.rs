//! @ai:module:intent Build dispatch tables and render the runtime support file
//! @ai:module:layer application
//! @ai:module:public_api ModuleParams, table_lines, render_constants, render_runtime
//! @ai:module:depends_on allocator, role, stubs, error

use crate::allocator::ModuleDescriptor;
use crate::error::{Error, Result};
use crate::role::Role;
use crate::stubs::{render, StubLibrary, STUB_AUTH_EXEC, STUB_CONSTANTS};

const CONSTANTS_PLACEHOLDER: &str = "{CONSTANTS}";
const TABLE_INDENT: &str = "            ";

/// @ai:intent Module-wide values substituted into the constants stub
#[derive(Debug, Clone)]
pub struct ModuleParams {
    pub name: String,
    pub id: u16,
    pub em_port: u16,
    pub num_threads: usize,
}

/// @ai:intent Emit one `m.insert(..)` line per declaration of a table-backed role
/// @ai:post lines follow allocation order; roles without a table produce ""
/// @ai:effects pure
pub fn table_lines(descriptor: &ModuleDescriptor, role: Role) -> String {
    let Some(callable) = role.callable_type() else {
        return String::new();
    };

    descriptor
        .declarations(role)
        .iter()
        .map(|d| format!("{TABLE_INDENT}m.insert({}, crate::{} as {callable});", d.id, d.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// @ai:intent Render the constants block with every dispatch table filled in
/// @ai:effects fs:read (directory stub libraries only)
pub fn render_constants(
    stubs: &StubLibrary,
    descriptor: &ModuleDescriptor,
    params: &ModuleParams,
) -> Result<String> {
    let template = stubs.require(STUB_CONSTANTS)?;

    let id = params.id.to_string();
    let em_port = params.em_port.to_string();
    let num_threads = params.num_threads.to_string();

    let tables: Vec<(&str, String)> = Role::ALL
        .iter()
        .filter_map(|role| {
            role.table_placeholder()
                .map(|field| (field, table_lines(descriptor, *role)))
        })
        .collect();

    let mut fields: Vec<(&str, &str)> = vec![
        ("id", id.as_str()),
        ("name", params.name.as_str()),
        ("em_port", em_port.as_str()),
        ("num_threads", num_threads.as_str()),
    ];
    fields.extend(tables.iter().map(|(field, text)| (*field, text.as_str())));

    render(STUB_CONSTANTS, &template, &fields)
}

/// @ai:intent Place the rendered constants into the runtime support file
/// @ai:pre the runtime stub contains the constants placeholder exactly once
/// @ai:effects fs:read (directory stub libraries only)
pub fn render_runtime(stubs: &StubLibrary, constants: &str) -> Result<String> {
    let template = stubs.require(STUB_AUTH_EXEC)?;

    match template.matches(CONSTANTS_PLACEHOLDER).count() {
        1 => Ok(template.replacen(CONSTANTS_PLACEHOLDER, constants, 1)),
        n => Err(Error::Template {
            stub: STUB_AUTH_EXEC.to_string(),
            message: format!("expected one {CONSTANTS_PLACEHOLDER} placeholder, found {n}"),
        }),
    }
}
