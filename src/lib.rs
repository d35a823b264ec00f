//! @ai:module:intent Code generator turning an annotated Rust library into an Authentic Execution module
//! @ai:module:layer application
//! @ai:module:public_api role, scanner, allocator, injector, registration, manifest, runner, project, generator, config, output, stubs, error
//! @ai:module:stateless true
//!
//! # rust-sgx-gen
//!
//! Scans a library crate for `//@ sm_*` annotations, gives every annotated
//! declaration an identifier from its role's window, injects the generated
//! stubs and writes a runnable module project next to the input.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rust_sgx_gen::{GenerateOptions, Generator, RunnerVariant, SkipVerification, StubLibrary};
//! use std::path::PathBuf;
//!
//! let options = GenerateOptions {
//!     input: PathBuf::from("button"),
//!     output: PathBuf::from("button-sm"),
//!     module_id: 1,
//!     em_port: 5000,
//!     runner: RunnerVariant::Native,
//!     sp_key: None,
//!     info_file: Some(PathBuf::from("button-sm.json")),
//!     num_threads: 1,
//!     stubs: StubLibrary::Builtin,
//! };
//!
//! let generation = Generator::new(&options, &SkipVerification).run().unwrap();
//! println!("{} declarations", generation.descriptor.len());
//! ```

pub mod allocator;
pub mod config;
pub mod error;
pub mod generator;
pub mod injector;
#[cfg(test)]
mod log_capture;
pub mod manifest;
pub mod output;
pub mod project;
pub mod registration;
pub mod role;
pub mod runner;
pub mod scanner;
pub mod stubs;

pub use allocator::{allocate, Declaration, ModuleDescriptor};
pub use config::{GeneratorConfig, DEFAULT_CONFIG_FILE};
pub use error::{Error, Result};
pub use generator::{GenerateOptions, Generation, Generator, Stage};
pub use manifest::{FragmentPolicy, Manifest, MergeReport};
pub use output::{format_descriptor, write_module_info, ModuleInfo, OutputFormat, DEFAULT_INFO_FILE};
pub use project::{CargoVerifier, ManifestValidator, SkipVerification};
pub use role::{IndexRange, IndexSpace, InjectionMode, Role};
pub use runner::RunnerVariant;
pub use scanner::{scan, scan_file, AnnotationSite, ScanResult};
pub use stubs::StubLibrary;
