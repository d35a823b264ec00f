//! @ai:module:intent Validate the input Cargo project and prepare the output tree
//! @ai:module:layer infrastructure
//! @ai:module:public_api InputProject, check_input_project, copy_tree, ManifestValidator, CargoVerifier, SkipVerification
//! @ai:module:depends_on manifest, error

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use walkdir::WalkDir;

pub const LIB_FILE: &str = "lib.rs";
pub const MAIN_FILE: &str = "main.rs";
pub const MANIFEST_FILE: &str = "Cargo.toml";
pub const SRC_DIR: &str = "src";

/// Manifest sections the generator adds itself
pub const MANAGED_SECTIONS: [&str; 2] = ["lib", "bin"];

/// @ai:intent External check that a manifest describes a valid package
pub trait ManifestValidator {
    /// @ai:intent Accept or reject the manifest at `manifest_path`
    fn verify(&self, manifest_path: &Path) -> Result<()>;
}

/// @ai:intent Validates with `cargo verify-project`, looking only at the exit status
pub struct CargoVerifier;

impl ManifestValidator for CargoVerifier {
    /// @ai:effects io
    fn verify(&self, manifest_path: &Path) -> Result<()> {
        let status = Command::new("cargo")
            .arg("verify-project")
            .arg("--manifest-path")
            .arg(manifest_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::io(manifest_path, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::InvalidProject(format!(
                "cargo verify-project rejected {}",
                manifest_path.display()
            )))
        }
    }
}

/// @ai:intent Accepts every manifest
pub struct SkipVerification;

impl ManifestValidator for SkipVerification {
    fn verify(&self, _manifest_path: &Path) -> Result<()> {
        Ok(())
    }
}

/// @ai:intent A validated input project
#[derive(Debug, Clone)]
pub struct InputProject {
    pub root: PathBuf,
    pub name: String,
    pub manifest: Manifest,
}

/// @ai:intent Check that `path` is a library-only Cargo project the generator can augment
/// @ai:pre path is a directory
/// @ai:post manifest has a package name and no [lib] or [[bin]] section
/// @ai:effects fs:read, io
pub fn check_input_project(path: &Path, validator: &dyn ManifestValidator) -> Result<InputProject> {
    let manifest_path = path.join(MANIFEST_FILE);
    let src = path.join(SRC_DIR);

    if !manifest_path.is_file() {
        return Err(Error::InvalidProject(format!(
            "{} not found",
            manifest_path.display()
        )));
    }

    validator.verify(&manifest_path)?;

    let main = src.join(MAIN_FILE);
    if main.exists() {
        return Err(Error::ForbiddenFile(main));
    }

    let lib = src.join(LIB_FILE);
    if !lib.is_file() {
        return Err(Error::MissingLibrary(lib));
    }

    let manifest = Manifest::load(&manifest_path)?;
    for section in MANAGED_SECTIONS {
        if manifest.has_section(section) {
            return Err(Error::ForbiddenSection(format!("[{section}]")));
        }
    }

    let name = manifest
        .package_name()
        .ok_or_else(|| Error::InvalidProject("missing package.name".to_string()))?
        .to_string();

    Ok(InputProject {
        root: path.to_path_buf(),
        name,
        manifest,
    })
}

/// @ai:intent Recursively copy a directory tree
/// @ai:pre `to` does not exist
/// @ai:post `to` mirrors every directory and file under `from`
/// @ai:effects fs:read, fs:write
pub fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    // collect first so a destination nested in the source is never walked
    let entries: Vec<walkdir::DirEntry> = WalkDir::new(from)
        .into_iter()
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            Error::io(path, e.into())
        })?;

    for entry in entries {
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(dir: &Path, manifest: &str) {
        std::fs::create_dir_all(dir.join(SRC_DIR)).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        std::fs::write(dir.join(SRC_DIR).join(LIB_FILE), "// lib\n").unwrap();
    }

    const MANIFEST: &str = "[package]\nname = \"button\"\nversion = \"0.1.0\"\n";

    #[test]
    fn test_valid_project() {
        let temp = TempDir::new().unwrap();
        project(temp.path(), MANIFEST);

        let input = check_input_project(temp.path(), &SkipVerification).unwrap();
        assert_eq!(input.name, "button");
    }

    #[test]
    fn test_main_rs_forbidden() {
        let temp = TempDir::new().unwrap();
        project(temp.path(), MANIFEST);
        std::fs::write(temp.path().join("src/main.rs"), "fn main() {}").unwrap();

        let err = check_input_project(temp.path(), &SkipVerification).unwrap_err();
        assert!(matches!(err, Error::ForbiddenFile(_)));
    }

    #[test]
    fn test_lib_rs_required() {
        let temp = TempDir::new().unwrap();
        project(temp.path(), MANIFEST);
        std::fs::remove_file(temp.path().join("src/lib.rs")).unwrap();

        let err = check_input_project(temp.path(), &SkipVerification).unwrap_err();
        assert!(matches!(err, Error::MissingLibrary(_)));
    }

    #[test]
    fn test_managed_sections_forbidden() {
        for extra in ["[lib]\nname = \"x\"\n", "[[bin]]\nname = \"x\"\n"] {
            let temp = TempDir::new().unwrap();
            project(temp.path(), &format!("{MANIFEST}\n{extra}"));

            let err = check_input_project(temp.path(), &SkipVerification).unwrap_err();
            assert!(matches!(err, Error::ForbiddenSection(_)), "{extra}");
        }
    }

    #[test]
    fn test_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let err = check_input_project(temp.path(), &SkipVerification).unwrap_err();
        assert!(matches!(err, Error::InvalidProject(_)));
    }

    #[test]
    fn test_validator_rejection_propagates() {
        struct Reject;
        impl ManifestValidator for Reject {
            fn verify(&self, _: &Path) -> Result<()> {
                Err(Error::InvalidProject("rejected".into()))
            }
        }

        let temp = TempDir::new().unwrap();
        project(temp.path(), MANIFEST);
        assert!(check_input_project(temp.path(), &Reject).is_err());
    }

    #[test]
    fn test_copy_tree() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("in");
        project(&from, MANIFEST);
        std::fs::create_dir_all(from.join("src/nested")).unwrap();
        std::fs::write(from.join("src/nested/mod.rs"), "// nested").unwrap();

        let to = temp.path().join("out");
        copy_tree(&from, &to).unwrap();

        assert!(to.join(MANIFEST_FILE).is_file());
        assert_eq!(
            std::fs::read_to_string(to.join("src/nested/mod.rs")).unwrap(),
            "// nested"
        );
    }
}
