//! @ai:module:intent Insert generated stubs after inline annotations and assemble the library file
//! @ai:module:layer application
//! @ai:module:public_api inject, assemble_library, needs_lazy_import, RUST_LAZY
//! @ai:module:depends_on scanner, allocator, stubs, error
//! @ai:module:stateless true

use crate::allocator::ModuleDescriptor;
use crate::error::{Error, Result};
use crate::scanner::ScanResult;
use crate::stubs::{render, StubLibrary};
use regex::Regex;

pub const RUST_LAZY: &str = "#[macro_use] extern crate lazy_static;\n";

const REGEX_LAZY: &str =
    r"(?m)^\s*#\s*\[\s*macro_use\s*\]\s*extern\s+crate\s+lazy_static\s*;";

/// @ai:intent Insert each inline role's rendered stub right after its annotation
/// @ai:pre `scan` was produced from exactly this `content`
/// @ai:post text outside the insertion points is unchanged
/// @ai:invariant insertion points come from the original text; the output is rebuilt once
/// @ai:effects fs:read (directory stub libraries only)
pub fn inject(
    content: &str,
    scan: &ScanResult,
    descriptor: &ModuleDescriptor,
    stubs: &StubLibrary,
) -> Result<String> {
    let mut insertions = Vec::new();

    for site in scan.inline_sites() {
        let Some(stub_name) = site.role.inline_stub() else {
            continue;
        };
        let id = descriptor
            .id_of(site.role, &site.name)
            .ok_or_else(|| Error::Template {
                stub: stub_name.to_string(),
                message: format!("no identifier allocated for {} `{}`", site.role, site.name),
            })?;

        let template = stubs.require(stub_name)?;
        let snippet = render(
            stub_name,
            &template,
            &[("name", site.name.as_str()), ("id", id.to_string().as_str())],
        )?;

        tracing::debug!(role = %site.role, name = %site.name, id, "injecting stub");
        insertions.push((site.end, snippet));
    }

    Ok(splice(content, &insertions))
}

/// @ai:intent Copy `content` into a fresh buffer, emitting each snippet at its offset
/// @ai:pre offsets are ascending and fall on char boundaries
/// @ai:effects pure
fn splice(content: &str, insertions: &[(usize, String)]) -> String {
    let extra: usize = insertions.iter().map(|(_, s)| s.len()).sum();
    let mut out = String::with_capacity(content.len() + extra);
    let mut cursor = 0;

    for (offset, snippet) in insertions {
        out.push_str(&content[cursor..*offset]);
        out.push_str(snippet);
        cursor = *offset;
    }
    out.push_str(&content[cursor..]);

    out
}

/// @ai:intent Check whether the module lacks its own lazy_static import
/// @ai:effects pure
pub fn needs_lazy_import(original: &str) -> bool {
    let re = Regex::new(REGEX_LAZY).expect("Invalid regex pattern");
    !re.is_match(original)
}

/// @ai:intent Build the final library entry file from the injected text and the prelude
/// @ai:effects pure
pub fn assemble_library(original: &str, injected: &str, prelude: &str) -> String {
    let lazy = if needs_lazy_import(original) { RUST_LAZY } else { "" };
    format!("{lazy}\n{prelude}\n{injected}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::allocate;
    use crate::scanner::scan;
    use pretty_assertions::assert_eq;

    fn run(content: &str) -> (String, ModuleDescriptor) {
        let result = scan(content);
        let desc = allocate(&result).unwrap();
        let out = inject(content, &result, &desc, &StubLibrary::Builtin).unwrap();
        (out, desc)
    }

    fn rendered(stub: &str, name: &str, id: u16) -> String {
        let template = StubLibrary::Builtin.require(stub).unwrap();
        render(stub, &template, &[("name", name), ("id", &id.to_string())]).unwrap()
    }

    #[test]
    fn test_each_stub_follows_its_own_marker() {
        let content = "// head\n//@ sm_output(first)\nfn a() {}\n//@ sm_request(second)\n//@ sm_output(third)\n// tail\n";
        let (out, desc) = run(content);

        let first = rendered(crate::stubs::STUB_OUTPUT, "first", desc.id_of(crate::Role::Output, "first").unwrap());
        let second = rendered(crate::stubs::STUB_REQUEST, "second", desc.id_of(crate::Role::Request, "second").unwrap());
        let third = rendered(crate::stubs::STUB_OUTPUT, "third", desc.id_of(crate::Role::Output, "third").unwrap());

        let expected = format!(
            "// head\n//@ sm_output(first){first}\nfn a() {{}}\n//@ sm_request(second){second}\n//@ sm_output(third){third}\n// tail\n"
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_stub_adjacency_with_known_positions() {
        let content = "//@ sm_output(a)\nX\n//@ sm_output(b)\nY\n";
        let (out, _) = run(content);

        let a = rendered(crate::stubs::STUB_OUTPUT, "a", 16384);
        let b = rendered(crate::stubs::STUB_OUTPUT, "b", 16385);

        let a_at = out.find(&a).unwrap();
        assert_eq!(&out[..a_at], "//@ sm_output(a)");
        let b_at = out.find(&b).unwrap();
        assert!(out[..b_at].ends_with("\nX\n//@ sm_output(b)"));
        assert_eq!(&out[b_at + b.len()..], "\nY\n");
    }

    #[test]
    fn test_indexed_only_roles_are_untouched() {
        let content = "//@ sm_input\npub fn i(d: &[u8]) {\n}\n//@ sm_entry\npub fn e(d: &[u8]) -> ResultMessage {\n}\n";
        let (out, desc) = run(content);
        assert_eq!(out, content);
        assert_eq!(desc.len(), 2);
    }

    #[test]
    fn test_splice_without_insertions_is_identity() {
        assert_eq!(splice("abc", &[]), "abc");
        assert_eq!(splice("abc", &[(0, "<".into()), (3, ">".into())]), "<abc>");
    }

    #[test]
    fn test_lazy_import_guard() {
        assert!(needs_lazy_import("fn main() {}"));
        assert!(!needs_lazy_import("// x\n  #[macro_use]\nextern crate lazy_static;\n"));
    }

    #[test]
    fn test_assemble_library_order() {
        let out = assemble_library("body", "BODY", "PRELUDE");
        assert_eq!(out, format!("{RUST_LAZY}\nPRELUDE\nBODY"));

        let original = "#[macro_use] extern crate lazy_static;\nbody";
        let out = assemble_library(original, original, "P");
        assert_eq!(out, format!("\nP\n{original}"));
    }
}
