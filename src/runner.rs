//! @ai:module:intent Runner variants and how each provisions the module key
//! @ai:module:layer domain
//! @ai:module:public_api RunnerVariant, RunnerFile, generate_key, KEY_LENGTH

use crate::error::{Error, Result};
use crate::stubs::{StubLibrary, STUB_RUNNER_DEPS, STUB_RUNNER_RUN};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;

pub const KEY_LENGTH: usize = 16;

const MODULE_KEY_PLACEHOLDER: &str = "___MODULE_KEY___";
const SP_VKEY_PLACEHOLDER: &str = "__SP_VKEY_PEM__";

/// @ai:intent Closed set of runtime profiles for the generated module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunnerVariant {
    /// Key derived at run time through remote attestation
    #[default]
    Sgx,
    /// Key generated now and embedded in the runner
    Native,
}

/// @ai:intent Rendered runner source plus the key embedded in it, if any
#[derive(Debug, Clone)]
pub struct RunnerFile {
    pub source: String,
    pub key: Option<Vec<u8>>,
}

impl RunnerVariant {
    pub const ALL: [RunnerVariant; 2] = [RunnerVariant::Sgx, RunnerVariant::Native];

    /// @ai:effects pure
    pub fn name(&self) -> &'static str {
        match self {
            RunnerVariant::Sgx => "sgx",
            RunnerVariant::Native => "native",
        }
    }

    /// @ai:intent Stub directory holding this variant's files
    /// @ai:effects pure
    pub fn stub_dir(&self) -> &'static str {
        match self {
            RunnerVariant::Sgx => "runner_sgx",
            RunnerVariant::Native => "runner_native",
        }
    }

    /// @ai:effects pure
    pub fn run_stub(&self) -> String {
        format!("{}/{}", self.stub_dir(), STUB_RUNNER_RUN)
    }

    /// @ai:effects pure
    pub fn deps_fragment(&self) -> String {
        format!("{}/{}", self.stub_dir(), STUB_RUNNER_DEPS)
    }

    /// @ai:intent Whether the module key is generated and embedded at generation time
    /// @ai:effects pure
    pub fn has_hardcoded_key(&self) -> bool {
        matches!(self, RunnerVariant::Native)
    }

    /// @ai:intent Load and provision this variant's runner source
    /// @ai:post Native embeds a fresh key; Sgx embeds the provider key when given
    /// @ai:edge_cases Sgx without a provider key keeps the placeholder and warns
    /// @ai:effects fs:read, random, log
    pub fn render(&self, stubs: &StubLibrary, sp_key: Option<&str>) -> Result<RunnerFile> {
        let template = stubs.require(&self.run_stub())?;
        Ok(self.provision(&template, sp_key))
    }

    fn provision(&self, template: &str, sp_key: Option<&str>) -> RunnerFile {
        if self.has_hardcoded_key() {
            if sp_key.is_some() {
                tracing::debug!("{} runner ignores the ra_sp public key", self);
            }
            let key = generate_key();
            let source = template.replace(MODULE_KEY_PLACEHOLDER, &STANDARD.encode(&key));
            return RunnerFile {
                source,
                key: Some(key),
            };
        }

        let source = match sp_key {
            Some(pem) => template.replace(SP_VKEY_PLACEHOLDER, pem),
            None => {
                tracing::warn!(
                    "No ra_sp public key given: the module cannot be attested until {} is replaced",
                    SP_VKEY_PLACEHOLDER
                );
                template.to_string()
            }
        };
        RunnerFile { source, key: None }
    }
}

impl FromStr for RunnerVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("No matching runner for {s}")))
    }
}

impl fmt::Display for RunnerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// @ai:intent Generate a random symmetric module key
/// @ai:effects random
pub fn generate_key() -> Vec<u8> {
    let mut key = vec![0u8; KEY_LENGTH];
    rand::thread_rng().fill_bytes(&mut key);
    key
}
