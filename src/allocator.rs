//! @ai:module:intent Assign each discovered declaration an identifier from its role's window
//! @ai:module:layer domain
//! @ai:module:public_api allocate, Declaration, ModuleDescriptor
//! @ai:module:depends_on role, scanner, error
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::role::Role;
use crate::scanner::ScanResult;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, HashSet};

/// @ai:intent A declaration together with its allocated identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub role: Role,
    pub name: String,
    pub id: u16,
}

/// @ai:intent Every declaration of one generation run, keyed by role, in allocation order
/// @ai:invariant each identifier lies inside its role's window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDescriptor {
    tables: BTreeMap<Role, Vec<Declaration>>,
}

impl ModuleDescriptor {
    /// @ai:effects pure
    pub fn declarations(&self, role: Role) -> &[Declaration] {
        self.tables.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// @ai:intent Look up the identifier allocated to a declaration
    /// @ai:effects pure
    pub fn id_of(&self, role: Role, name: &str) -> Option<u16> {
        self.declarations(role)
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.id)
    }

    /// @ai:intent Iterate all declarations, role by role
    /// @ai:effects pure
    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.tables.values().flatten()
    }

    /// @ai:effects pure
    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// @ai:effects pure
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// @ai:intent Allocate identifiers for every scanned declaration
/// @ai:pre names are unique within a role
/// @ai:post id = window start + reserved prefix + position in source order
/// @ai:edge_cases an empty role produces an empty table
/// @ai:effects pure
pub fn allocate(scan: &ScanResult) -> Result<ModuleDescriptor> {
    let mut tables = BTreeMap::new();

    for role in Role::ALL {
        let names = scan.names(role);
        tables.insert(role, allocate_role(role, &names)?);
    }

    Ok(ModuleDescriptor { tables })
}

/// @ai:intent Allocate one role's identifiers in first-seen order
/// @ai:effects pure
pub fn allocate_role(role: Role, names: &[&str]) -> Result<Vec<Declaration>> {
    let range = role.range();

    if names.len() > range.capacity() {
        return Err(Error::IndexOverflow {
            role,
            count: names.len(),
            capacity: range.capacity(),
        });
    }

    let mut seen = HashSet::new();
    let mut declarations = Vec::with_capacity(names.len());

    for (position, name) in names.iter().enumerate() {
        if !seen.insert(*name) {
            return Err(Error::DuplicateDeclaration {
                role,
                name: name.to_string(),
            });
        }

        // capacity check above keeps this inside the window
        let id = range.first_free() as usize + position;
        declarations.push(Declaration {
            role,
            name: name.to_string(),
            id: id as u16,
        });
    }

    Ok(declarations)
}

struct RoleTable<'a>(&'a [Declaration]);

impl Serialize for RoleTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for decl in self.0 {
            map.serialize_entry(&decl.name, &decl.id)?;
        }
        map.end()
    }
}

impl Serialize for ModuleDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Role::ALL.len()))?;
        for role in Role::ALL {
            map.serialize_entry(role.key(), &RoleTable(self.declarations(role)))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{START_HANDLER_INDEX, START_INPUT_INDEX, START_OUTPUT_INDEX};
    use crate::scanner::scan;

    #[test]
    fn test_allocate_uses_role_windows() {
        let text = "//@ sm_output(a)\n//@ sm_output(b)\n//@ sm_request(c)\n//@ sm_request(d)\n//@ sm_request(e)\n";
        let desc = allocate(&scan(text)).unwrap();

        let outputs: Vec<u16> = desc.declarations(Role::Output).iter().map(|d| d.id).collect();
        let requests: Vec<u16> = desc.declarations(Role::Request).iter().map(|d| d.id).collect();

        assert_eq!(outputs, vec![START_OUTPUT_INDEX, START_OUTPUT_INDEX + 1]);
        assert!(outputs.iter().all(|id| Role::Output.range().contains(*id)));
        assert!(requests.iter().all(|id| Role::Request.range().contains(*id)));
        assert!(outputs.iter().all(|id| !requests.contains(id)));
        assert_eq!(requests.len(), 3);
    }

    #[test]
    fn test_entrypoints_skip_reserved_slots() {
        let decls = allocate_role(Role::Entrypoint, &["first", "second"]).unwrap();
        assert_eq!(decls[0].id, 4);
        assert_eq!(decls[1].id, 5);
    }

    #[test]
    fn test_indexed_roles_count_from_window_start() {
        let inputs = allocate_role(Role::Input, &["x"]).unwrap();
        let handlers = allocate_role(Role::Handler, &["y", "z"]).unwrap();
        assert_eq!(inputs[0].id, START_INPUT_INDEX);
        assert_eq!(handlers[1].id, START_HANDLER_INDEX + 1);
    }

    #[test]
    fn test_overflow_is_fatal() {
        let names: Vec<String> = (0..=Role::Handler.range().capacity())
            .map(|i| format!("h{i}"))
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let err = allocate_role(Role::Handler, &refs).unwrap_err();
        assert!(matches!(
            err,
            Error::IndexOverflow { role: Role::Handler, count, capacity }
                if count == capacity + 1
        ));
    }

    #[test]
    fn test_full_window_stays_inside_range() {
        let capacity = Role::Entrypoint.range().capacity();
        let names: Vec<String> = (0..capacity).map(|i| format!("e{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let decls = allocate_role(Role::Entrypoint, &refs).unwrap();
        let last = decls.last().unwrap().id;
        assert!(Role::Entrypoint.range().contains(last));
        assert_eq!(last as u32, Role::Entrypoint.range().end() - 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = allocate_role(Role::Input, &["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateDeclaration { role: Role::Input, ref name } if name == "a"));
    }

    #[test]
    fn test_serialize_keeps_allocation_order() {
        let text = "//@ sm_output(zeta)\n//@ sm_output(alpha)\n";
        let desc = allocate(&scan(text)).unwrap();
        let json = serde_json::to_string(&desc).unwrap();

        assert!(json.contains(r#""outputs":{"zeta":16384,"alpha":16385}"#));
        assert!(json.contains(r#""entrypoints":{}"#));
    }
}
