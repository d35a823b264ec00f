//! @ai:module:intent Drive one generation run from input validation to persisted outputs
//! @ai:module:layer application
//! @ai:module:public_api Generator, GenerateOptions, Generation, Stage
//! @ai:module:depends_on project, scanner, allocator, injector, registration, manifest, runner, output

use crate::allocator::{allocate, ModuleDescriptor};
use crate::error::{Error, Result};
use crate::injector::{assemble_library, inject};
use crate::manifest::{merge_fragment, FragmentPolicy, Manifest};
use crate::output::{write_module_info, ModuleInfo};
use crate::project::{check_input_project, copy_tree, InputProject, ManifestValidator, LIB_FILE, MAIN_FILE, MANIFEST_FILE, SRC_DIR};
use crate::registration::{render_constants, render_runtime, ModuleParams};
use crate::runner::RunnerVariant;
use crate::scanner::scan;
use crate::stubs::{render, StubLibrary, CARGO_DEPENDENCIES, STUB_AUTH_EXEC, STUB_MAIN, STUB_MODS_USES, STUB_RUNNER_RUN};
use std::fmt;
use std::path::{Path, PathBuf};

/// @ai:intent Everything a generation run needs from its caller
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub module_id: u16,
    pub em_port: u16,
    pub runner: RunnerVariant,
    /// PEM file with the remote-attestation service provider's public key
    pub sp_key: Option<PathBuf>,
    /// Where to write the module-info JSON, if anywhere
    pub info_file: Option<PathBuf>,
    pub num_threads: usize,
    pub stubs: StubLibrary,
}

/// @ai:intent Result of a successful run
#[derive(Debug, Clone)]
pub struct Generation {
    pub name: String,
    pub descriptor: ModuleDescriptor,
    /// Key embedded in the runner, for variants with a hardcoded key
    pub key: Option<Vec<u8>>,
}

/// @ai:intent Stages of a generation run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidateInput,
    PrepareOutput,
    ScanAndAllocate,
    Inject,
    BuildArtifacts,
    MergeManifests,
    PersistOutputs,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Generated file contents, held in memory until every stage has succeeded.
struct Artifacts {
    lib: String,
    runtime: String,
    main: String,
    runner: String,
    manifest: String,
}

/// @ai:intent Orchestrates one generation run
pub struct Generator<'a> {
    options: &'a GenerateOptions,
    validator: &'a dyn ManifestValidator,
}

impl<'a> Generator<'a> {
    pub fn new(options: &'a GenerateOptions, validator: &'a dyn ManifestValidator) -> Self {
        Self { options, validator }
    }

    /// @ai:intent Run every stage; on failure remove the output directory this run created
    /// @ai:post on Err, no output directory created by this run remains
    /// @ai:effects fs:read, fs:write, io, log
    pub fn run(&self) -> Result<Generation> {
        self.enter(Stage::ValidateInput);
        if self.options.output.exists() {
            return Err(Error::OutputExists(self.options.output.clone()));
        }
        let project = check_input_project(&self.options.input, self.validator)?;

        self.enter(Stage::PrepareOutput);
        let result = copy_tree(&self.options.input, &self.options.output)
            .and_then(|()| self.generate(project));

        match result {
            Ok(generation) => {
                self.enter(Stage::Done);
                Ok(generation)
            }
            Err(e) => {
                self.enter(Stage::Failed);
                self.cleanup();
                Err(e)
            }
        }
    }

    fn generate(&self, project: InputProject) -> Result<Generation> {
        let opts = self.options;
        let stubs = &opts.stubs;
        let src = opts.output.join(SRC_DIR);

        self.enter(Stage::ScanAndAllocate);
        let lib_path = src.join(LIB_FILE);
        let original = std::fs::read_to_string(&lib_path).map_err(|e| Error::io(&lib_path, e))?;
        let scanned = scan(&original);
        let descriptor = allocate(&scanned)?;
        for decl in descriptor.iter() {
            tracing::debug!(role = %decl.role, name = %decl.name, id = decl.id, "allocated");
        }
        tracing::info!(
            "Found {} annotated declarations in {}",
            descriptor.len(),
            project.name
        );

        self.enter(Stage::Inject);
        let injected = inject(&original, &scanned, &descriptor, stubs)?;
        let prelude = stubs.require(STUB_MODS_USES)?;
        let lib = assemble_library(&original, &injected, &prelude);

        self.enter(Stage::BuildArtifacts);
        let params = ModuleParams {
            name: project.name.clone(),
            id: opts.module_id,
            em_port: opts.em_port,
            num_threads: opts.num_threads,
        };
        let constants = render_constants(stubs, &descriptor, &params)?;
        let runtime = render_runtime(stubs, &constants)?;

        let crate_name = project.name.replace('-', "_");
        let main_template = stubs.require(STUB_MAIN)?;
        let main = render(STUB_MAIN, &main_template, &[("crate_name", crate_name.as_str())])?;

        let sp_key = match &opts.sp_key {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?),
            None => None,
        };
        let runner = opts.runner.render(stubs, sp_key.as_deref())?;

        self.enter(Stage::MergeManifests);
        let manifest = self.merge_manifests(project.manifest, stubs)?;

        self.enter(Stage::PersistOutputs);
        let artifacts = Artifacts {
            lib,
            runtime,
            main,
            runner: runner.source,
            manifest: manifest.to_toml_string()?,
        };
        self.persist(&artifacts)?;

        if let Some(info_path) = &opts.info_file {
            let info = ModuleInfo::new(&project.name, opts.module_id, runner.key.as_deref(), &descriptor);
            write_module_info(info_path, &info)?;
            tracing::info!("Module info written to {}", info_path.display());
        }

        Ok(Generation {
            name: project.name,
            descriptor,
            key: runner.key,
        })
    }

    fn merge_manifests(&self, mut manifest: Manifest, stubs: &StubLibrary) -> Result<Manifest> {
        merge_fragment(&mut manifest, stubs, CARGO_DEPENDENCIES, FragmentPolicy::Mandatory)?;
        merge_fragment(
            &mut manifest,
            stubs,
            &self.options.runner.deps_fragment(),
            FragmentPolicy::Optional,
        )?;
        Ok(manifest)
    }

    fn persist(&self, artifacts: &Artifacts) -> Result<()> {
        let out = &self.options.output;
        let src = out.join(SRC_DIR);

        write(&src.join(LIB_FILE), &artifacts.lib)?;
        write(&src.join(STUB_AUTH_EXEC), &artifacts.runtime)?;
        write(&src.join(MAIN_FILE), &artifacts.main)?;
        write(&src.join(STUB_RUNNER_RUN), &artifacts.runner)?;
        write(&out.join(MANIFEST_FILE), &artifacts.manifest)
    }

    fn cleanup(&self) {
        let out = &self.options.output;
        if !out.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(out) {
            tracing::warn!("Failed to remove partial output {}: {}", out.display(), e);
        }
    }

    fn enter(&self, stage: Stage) {
        tracing::debug!(%stage, "generation stage");
    }
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| Error::io(path, e))
}
