//! @ai:module:intent Find annotated declarations in a module's source text
//! @ai:module:layer application
//! @ai:module:public_api scan, scan_file, ScanResult, AnnotationSite
//! @ai:module:depends_on role, error
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::role::Role;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

const REGEX_MARKER: &str = r"(?m)^[ \t]*//@[ \t]*sm_(?:input|output|request|handler|entry)\b";

/// @ai:intent One annotated declaration found in the original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSite {
    pub role: Role,
    pub name: String,
    /// 1-based line of the marker comment
    pub line: usize,
    /// Byte offset just past the matched declaration opening
    pub end: usize,
}

/// @ai:intent All annotation sites of one module, grouped by role in source order
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    sites: BTreeMap<Role, Vec<AnnotationSite>>,
}

impl ScanResult {
    /// @ai:intent Sites of one role, in order of first appearance
    /// @ai:effects pure
    pub fn sites(&self, role: Role) -> &[AnnotationSite] {
        self.sites.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// @ai:effects pure
    pub fn names(&self, role: Role) -> Vec<&str> {
        self.sites(role).iter().map(|s| s.name.as_str()).collect()
    }

    /// @ai:intent Sites of every inline role, ordered by insertion offset
    /// @ai:effects pure
    pub fn inline_sites(&self) -> Vec<&AnnotationSite> {
        let mut sites: Vec<&AnnotationSite> = Role::ALL
            .iter()
            .filter(|r| r.inline_stub().is_some())
            .flat_map(|r| self.sites(*r))
            .collect();
        sites.sort_by_key(|s| s.end);
        sites
    }

    /// @ai:effects pure
    pub fn total(&self) -> usize {
        self.sites.values().map(Vec::len).sum()
    }
}

/// @ai:intent Scan module text for every role's annotation pattern
/// @ai:post for each role, names appear in the order they occur in `content`
/// @ai:edge_cases markers without a well-formed declaration are skipped with a warning
/// @ai:effects log
/// @ai:idempotent true
pub fn scan(content: &str) -> ScanResult {
    let mut result = ScanResult::default();

    for role in Role::ALL {
        let re = Regex::new(role.pattern()).expect("Invalid regex pattern");
        let sites = re
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.name("name")?;
                Some(AnnotationSite {
                    role,
                    name: name.as_str().to_string(),
                    line: line_of(content, whole.start()),
                    end: whole.end(),
                })
            })
            .collect();

        result.sites.insert(role, sites);
    }

    let markers = Regex::new(REGEX_MARKER)
        .expect("Invalid regex pattern")
        .find_iter(content)
        .count();
    if markers > result.total() {
        tracing::warn!(
            "{} of {} annotation markers do not precede a matching declaration",
            markers - result.total(),
            markers
        );
    }

    result
}

/// @ai:intent Read a module file and scan it
/// @ai:effects fs:read
pub fn scan_file(path: &Path) -> Result<(String, ScanResult)> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let result = scan(&content);
    Ok((content, result))
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_capture::{capture, warnings};

    const MODULE: &str = r#"// Imports and other stuff

//@ sm_output(button_pressed)
  //@sm_output( output1 )

//@ sm_entry
pub fn press_button(_data : &[u8]) -> ResultMessage {
    button_pressed(&[]);
    success(None)
}

//@ sm_input
pub fn input1(data : &[u8]) {
    output1(data);
}

//@ sm_handler
pub fn _answer(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

//@ sm_request(ask)
"#;

    #[test]
    fn test_scan_finds_every_role() {
        let result = scan(MODULE);

        assert_eq!(result.names(Role::Output), vec!["button_pressed", "output1"]);
        assert_eq!(result.names(Role::Entrypoint), vec!["press_button"]);
        assert_eq!(result.names(Role::Input), vec!["input1"]);
        assert_eq!(result.names(Role::Handler), vec!["_answer"]);
        assert_eq!(result.names(Role::Request), vec!["ask"]);
        assert_eq!(result.total(), 6);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let a = scan(MODULE);
        let b = scan(MODULE);
        for role in Role::ALL {
            assert_eq!(a.sites(role), b.sites(role));
        }
    }

    #[test]
    fn test_scan_records_marker_lines() {
        let result = scan(MODULE);
        assert_eq!(result.sites(Role::Output)[0].line, 3);
        assert_eq!(result.sites(Role::Output)[1].line, 4);
        assert_eq!(result.sites(Role::Entrypoint)[0].line, 6);
    }

    #[test]
    fn test_inline_site_ends_at_marker_line_end() {
        let result = scan(MODULE);
        let site = &result.sites(Role::Output)[0];
        assert!(MODULE[..site.end].ends_with("//@ sm_output(button_pressed)"));
        assert_eq!(&MODULE[site.end..site.end + 1], "\n");
    }

    #[test]
    fn test_entry_requires_result_message_return() {
        let text = "//@ sm_entry\npub fn f(d: &[u8]) -> Vec<u8> {\n}\n";
        assert!(scan(text).names(Role::Entrypoint).is_empty());
        assert!(scan(text).names(Role::Handler).is_empty());
    }

    #[test]
    fn test_input_rejects_other_parameter_types() {
        let text = "//@ sm_input\npub fn f(d: &str) {\n}\n";
        assert!(scan(text).names(Role::Input).is_empty());
    }

    #[test]
    fn test_marker_must_start_the_line() {
        let text = "let x = 1; //@ sm_output(out)\n";
        assert!(scan(text).names(Role::Output).is_empty());
    }

    #[test]
    fn test_scan_accepts_crlf_line_endings() {
        let text = "//@ sm_output(send)\r\n//@ sm_input\r\npub fn recv(d: &[u8]) {\r\n}\r\n";
        let result = scan(text);

        assert_eq!(result.names(Role::Output), vec!["send"]);
        assert_eq!(result.names(Role::Input), vec!["recv"]);
    }

    #[test]
    fn test_unmatched_marker_warns() {
        let text = "//@ sm_input\npub fn recv(d: &str) {\n}\n//@ sm_output(send)\n";
        let (result, lines) = capture(|| scan(text));

        assert_eq!(result.total(), 1);
        let warned = warnings(&lines);
        assert_eq!(warned.len(), 1);
        assert!(warned[0].contains("1 of 2 annotation markers"));
    }

    #[test]
    fn test_well_formed_module_does_not_warn() {
        let (_, lines) = capture(|| scan(MODULE));
        assert!(warnings(&lines).is_empty());
    }

    #[test]
    fn test_inline_sites_sorted_across_roles() {
        let text = "//@ sm_request(b)\n//@ sm_output(a)\n//@ sm_request(c)\n";
        let result = scan(text);
        let names: Vec<&str> = result.inline_sites().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
