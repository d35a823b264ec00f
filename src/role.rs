//! @ai:module:intent Define declaration roles, their annotation patterns and reserved index windows
//! @ai:module:layer domain
//! @ai:module:public_api Role, InjectionMode, IndexSpace, IndexRange, RESERVED_ENTRYPOINTS
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of every role window. Four windows tile the 16-bit connection space.
pub const WINDOW_WIDTH: u32 = 16384;

pub const START_INPUT_INDEX: u16 = 0;
pub const START_OUTPUT_INDEX: u16 = 16384;
pub const START_REQUEST_INDEX: u16 = 32768;
pub const START_HANDLER_INDEX: u16 = 49152;
pub const START_ENTRY_INDEX: u16 = 0;

/// Built-in entrypoints registered by the runtime stub, in slot order.
pub const RESERVED_ENTRYPOINTS: [&str; 4] = ["set_key", "attest", "handle_input", "handle_handler"];

/// @ai:intent Semantic category of an annotated declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Input,
    Output,
    Request,
    Handler,
    Entrypoint,
}

/// @ai:intent Where the generated code for a role lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionMode {
    /// Stub inserted right after the annotation in the same file
    Inline,
    /// Identifier and registration-table entry only
    IndexedOnly,
}

/// @ai:intent Identifier namespace a role allocates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpace {
    /// Connection indices, shared by inputs, outputs, requests and handlers
    Connection,
    /// Entrypoint ids dispatched by `handle_entrypoint`
    Entrypoint,
}

/// @ai:intent A reserved window of identifiers owned by one role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub space: IndexSpace,
    pub start: u16,
    pub width: u32,
    /// Slots at the bottom of the window that user declarations never receive
    pub reserved: u16,
}

impl IndexRange {
    /// @ai:intent Exclusive upper bound of the window
    /// @ai:effects pure
    pub const fn end(&self) -> u32 {
        self.start as u32 + self.width
    }

    /// @ai:intent First identifier handed out to user declarations
    /// @ai:effects pure
    pub const fn first_free(&self) -> u16 {
        self.start + self.reserved
    }

    /// @ai:intent Number of user declarations the window can hold
    /// @ai:effects pure
    pub const fn capacity(&self) -> usize {
        (self.width - self.reserved as u32) as usize
    }

    /// @ai:effects pure
    pub const fn contains(&self, id: u16) -> bool {
        id >= self.start && (id as u32) < self.end()
    }

    const fn overlaps(&self, other: &IndexRange) -> bool {
        let same_space = matches!(
            (self.space, other.space),
            (IndexSpace::Connection, IndexSpace::Connection)
                | (IndexSpace::Entrypoint, IndexSpace::Entrypoint)
        );

        same_space && (self.start as u32) < other.end() && (other.start as u32) < self.end()
    }
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Input,
        Role::Output,
        Role::Request,
        Role::Handler,
        Role::Entrypoint,
    ];

    /// @ai:intent Reserved identifier window for this role
    /// @ai:effects pure
    pub const fn range(&self) -> IndexRange {
        let (space, start, reserved) = match self {
            Role::Input => (IndexSpace::Connection, START_INPUT_INDEX, 0),
            Role::Output => (IndexSpace::Connection, START_OUTPUT_INDEX, 0),
            Role::Request => (IndexSpace::Connection, START_REQUEST_INDEX, 0),
            Role::Handler => (IndexSpace::Connection, START_HANDLER_INDEX, 0),
            Role::Entrypoint => (
                IndexSpace::Entrypoint,
                START_ENTRY_INDEX,
                RESERVED_ENTRYPOINTS.len() as u16,
            ),
        };

        IndexRange {
            space,
            start,
            width: WINDOW_WIDTH,
            reserved,
        }
    }

    /// @ai:effects pure
    pub fn mode(&self) -> InjectionMode {
        match self {
            Role::Output | Role::Request => InjectionMode::Inline,
            Role::Input | Role::Handler | Role::Entrypoint => InjectionMode::IndexedOnly,
        }
    }

    /// @ai:intent Marker keyword following `//@`
    /// @ai:effects pure
    pub fn marker(&self) -> &'static str {
        match self {
            Role::Input => "sm_input",
            Role::Output => "sm_output",
            Role::Request => "sm_request",
            Role::Handler => "sm_handler",
            Role::Entrypoint => "sm_entry",
        }
    }

    /// @ai:intent Key used for this role in descriptor JSON
    /// @ai:effects pure
    pub fn key(&self) -> &'static str {
        match self {
            Role::Input => "inputs",
            Role::Output => "outputs",
            Role::Request => "requests",
            Role::Handler => "handlers",
            Role::Entrypoint => "entrypoints",
        }
    }

    /// @ai:intent Structural pattern recognising an annotated declaration of this role
    /// @ai:post the pattern has exactly one named group, `name`
    /// @ai:effects pure
    pub fn pattern(&self) -> &'static str {
        match self {
            Role::Input => {
                r"(?m)^[ \t]*//@[ \t]*sm_input[ \t]*\r?\n\s*pub\s+fn\s+(?P<name>_?[a-zA-Z]+[_a-zA-Z0-9]*)\s*\(\s*_?[a-zA-Z]+[_a-zA-Z0-9]*\s*:\s*&\[u8\]\s*\)\s*\{"
            }
            Role::Output => {
                r"(?m)^[ \t]*//@[ \t]*sm_output[ \t]*\([ \t]*(?P<name>_?[a-zA-Z]+[_a-zA-Z0-9]*)[ \t]*\)[ \t]*\r?$"
            }
            Role::Request => {
                r"(?m)^[ \t]*//@[ \t]*sm_request[ \t]*\([ \t]*(?P<name>_?[a-zA-Z]+[_a-zA-Z0-9]*)[ \t]*\)[ \t]*\r?$"
            }
            Role::Handler => {
                r"(?m)^[ \t]*//@[ \t]*sm_handler[ \t]*\r?\n\s*pub\s+fn\s+(?P<name>_?[a-zA-Z]+[_a-zA-Z0-9]*)\s*\(\s*_?[a-zA-Z]+[_a-zA-Z0-9]*\s*:\s*&\[u8\]\s*\)\s*->\s*Vec\s*<\s*u8\s*>\s*\{"
            }
            Role::Entrypoint => {
                r"(?m)^[ \t]*//@[ \t]*sm_entry[ \t]*\r?\n\s*pub\s+fn\s+(?P<name>_?[a-zA-Z]+[_a-zA-Z0-9]*)\s*\(\s*_?[a-zA-Z]+[_a-zA-Z0-9]*\s*:\s*&\[u8\]\s*\)\s*->\s*ResultMessage\s*\{"
            }
        }
    }

    /// @ai:intent Stub injected after each inline declaration
    /// @ai:effects pure
    pub fn inline_stub(&self) -> Option<&'static str> {
        match self {
            Role::Output => Some(crate::stubs::STUB_OUTPUT),
            Role::Request => Some(crate::stubs::STUB_REQUEST),
            Role::Input | Role::Handler | Role::Entrypoint => None,
        }
    }

    /// @ai:intent Placeholder in the constants stub that receives this role's dispatch table
    /// @ai:effects pure
    pub fn table_placeholder(&self) -> Option<&'static str> {
        match self {
            Role::Input => Some("inputs"),
            Role::Handler => Some("handlers"),
            Role::Entrypoint => Some("entrypoints"),
            Role::Output | Role::Request => None,
        }
    }

    /// @ai:intent Function-pointer type stored in this role's dispatch table
    /// @ai:effects pure
    pub fn callable_type(&self) -> Option<&'static str> {
        match self {
            Role::Input => Some("fn(&[u8])"),
            Role::Handler => Some("fn(&[u8]) -> Vec<u8>"),
            Role::Entrypoint => Some("fn(&[u8]) -> ResultMessage"),
            Role::Output | Role::Request => None,
        }
    }

    /// @ai:intent Map a raw connection index back to the role owning its window
    /// @ai:example (0) -> Input
    /// @ai:example (40000) -> Request
    /// @ai:effects pure
    pub fn from_connection_index(id: u16) -> Role {
        match id {
            v if v < START_OUTPUT_INDEX => Role::Input,
            v if v < START_REQUEST_INDEX => Role::Output,
            v if v < START_HANDLER_INDEX => Role::Request,
            _ => Role::Handler,
        }
    }

    /// @ai:intent Check that no two windows in the same space intersect
    /// @ai:effects pure
    pub const fn ranges_disjoint() -> bool {
        let mut i = 0;
        while i < Role::ALL.len() {
            let mut j = i + 1;
            while j < Role::ALL.len() {
                if Role::ALL[i].range().overlaps(&Role::ALL[j].range()) {
                    return false;
                }
                j += 1;
            }
            if Role::ALL[i].range().end() > 1 << 16 {
                return false;
            }
            i += 1;
        }
        true
    }
}

const _: () = assert!(Role::ranges_disjoint(), "role index windows overlap");

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Input => "input",
            Role::Output => "output",
            Role::Request => "request",
            Role::Handler => "handler",
            Role::Entrypoint => "entrypoint",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_windows_are_disjoint() {
        assert!(Role::ranges_disjoint());
    }

    #[test]
    fn test_connection_windows_tile_u16() {
        let mut ranges: Vec<IndexRange> = Role::ALL
            .iter()
            .map(|r| r.range())
            .filter(|r| r.space == IndexSpace::Connection)
            .collect();
        ranges.sort_by_key(|r| r.start);

        assert_eq!(ranges.first().map(|r| r.start), Some(0));
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start as u32);
        }
        assert_eq!(ranges.last().map(|r| r.end()), Some(1 << 16));
    }

    #[test]
    fn test_from_connection_index_round_trips_window_bounds() {
        for role in [Role::Input, Role::Output, Role::Request, Role::Handler] {
            let range = role.range();
            assert_eq!(Role::from_connection_index(range.start), role);
            assert_eq!(Role::from_connection_index((range.end() - 1) as u16), role);
        }
    }

    #[test]
    fn test_entrypoint_reserved_prefix() {
        let range = Role::Entrypoint.range();
        assert_eq!(range.first_free(), 4);
        assert_eq!(range.capacity(), WINDOW_WIDTH as usize - 4);
        assert!(range.contains(0));
    }

    #[test]
    fn test_all_patterns_compile_with_name_group() {
        for role in Role::ALL {
            let re = Regex::new(role.pattern()).unwrap();
            assert!(re.capture_names().any(|n| n == Some("name")), "{role}");
        }
    }

    #[test]
    fn test_only_inline_roles_have_stubs() {
        for role in Role::ALL {
            assert_eq!(
                role.inline_stub().is_some(),
                role.mode() == InjectionMode::Inline
            );
            assert_eq!(
                role.table_placeholder().is_some(),
                role.mode() == InjectionMode::IndexedOnly
            );
        }
    }
}
