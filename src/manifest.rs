//! @ai:module:intent Read, merge and write Cargo manifests as section-to-key tables
//! @ai:module:layer domain
//! @ai:module:public_api Manifest, MergeReport, Collision, FragmentPolicy, merge_fragment
//! @ai:module:depends_on stubs, error

use crate::error::{Error, Result};
use crate::stubs::StubLibrary;
use std::path::Path;
use toml::{Table, Value};

/// @ai:intent A manifest: top-level sections mapping keys to TOML values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    table: Table,
}

/// @ai:intent A (section, key) pair present in both destination and fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub section: String,
    pub key: String,
}

/// @ai:intent Outcome of merging one fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub collisions: Vec<Collision>,
}

/// @ai:intent How a missing fragment file is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentPolicy {
    /// Absence aborts generation
    Mandatory,
    /// Absence is logged and the fragment skipped
    Optional,
}

impl Manifest {
    /// @ai:intent Parse manifest text; `origin` only labels errors
    /// @ai:effects pure
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let table = content
            .parse::<Table>()
            .map_err(|source| Error::ManifestParse {
                path: origin.to_path_buf(),
                source,
            })?;
        Ok(Self { table })
    }

    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content, path)
    }

    /// @ai:effects pure
    pub fn has_section(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// @ai:effects pure
    pub fn section(&self, name: &str) -> Option<&Table> {
        self.table.get(name).and_then(Value::as_table)
    }

    /// @ai:intent Value of `package.name`, if declared
    /// @ai:effects pure
    pub fn package_name(&self) -> Option<&str> {
        self.section("package")?.get("name")?.as_str()
    }

    /// @ai:intent Merge every section of `fragment` into this manifest
    /// @ai:post fragment values win; each overwritten key is reported and logged once
    /// @ai:edge_cases a section missing here is created empty before merging
    /// @ai:effects log
    pub fn merge(&mut self, fragment: &Manifest) -> MergeReport {
        let mut report = MergeReport::default();

        for (section, incoming) in &fragment.table {
            let Value::Table(entries) = incoming else {
                // a bare top-level value collides with the whole section
                if self.table.insert(section.clone(), incoming.clone()).is_some() {
                    record_collision(&mut report, section, section);
                } else {
                    report.inserted += 1;
                }
                continue;
            };

            let dest = self
                .table
                .entry(section.clone())
                .or_insert_with(|| Value::Table(Table::new()));

            if !dest.is_table() {
                record_collision(&mut report, section, section);
                *dest = Value::Table(Table::new());
            }
            if let Value::Table(dest) = dest {
                for (key, value) in entries {
                    if dest.insert(key.clone(), value.clone()).is_some() {
                        record_collision(&mut report, section, key);
                    } else {
                        report.inserted += 1;
                    }
                }
            }
        }

        report
    }

    /// @ai:effects pure
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(&self.table)?)
    }
}

fn record_collision(report: &mut MergeReport, section: &str, key: &str) {
    tracing::warn!("{} {} already in destination cargo file, overwriting", section, key);
    report.collisions.push(Collision {
        section: section.to_string(),
        key: key.to_string(),
    });
}

/// @ai:intent Load a fragment from the stub library and merge it into `dest`
/// @ai:post Ok(None) when an optional fragment is missing
/// @ai:effects fs:read, log
pub fn merge_fragment(
    dest: &mut Manifest,
    stubs: &StubLibrary,
    name: &str,
    policy: FragmentPolicy,
) -> Result<Option<MergeReport>> {
    let Some(content) = stubs.load(name)? else {
        return match policy {
            FragmentPolicy::Mandatory => {
                tracing::error!("Dependency fragment {} not found", name);
                Err(Error::MissingFragment(name.to_string()))
            }
            FragmentPolicy::Optional => {
                tracing::warn!("Dependency fragment {} not found, skipping", name);
                Ok(None)
            }
        };
    };

    let fragment = Manifest::parse(&content, Path::new(name))?;
    let report = dest.merge(&fragment);
    tracing::debug!(
        fragment = name,
        inserted = report.inserted,
        overwritten = report.collisions.len(),
        "merged dependency fragment"
    );

    Ok(Some(report))
}
