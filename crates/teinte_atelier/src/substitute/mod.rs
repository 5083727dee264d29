//! Preprocessor substitution.
//!
//! Installing a substitute is a build-time code generation step:
//!
//! 1. The pristine package is saved under `<cache>/original/<name>`.
//! 2. A substitute is generated under `<cache>/substitute/<name>-<fingerprint>`,
//!    where the fingerprint covers the package identity, its version and the
//!    theme parameters. Its entry file wraps the pristine entry.
//! 3. The substitute is copied over the installed package, its marker last.
//!
//! Copies never move files. An interrupted run may leave a wrapped entry
//! without a marker; such a package is never saved as pristine, the saved
//! original is restored before installing again.
//! [`PreprocessorSubstitution::reset`] copies the saved original back.

mod fs;
mod locate;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use teinte_carton::hash::{hash_parts, hash_to_hex};
use teinte_carton::path::path_to_posix;
use teinte_pigment::ForcedColor;

use crate::codegen::{is_generated, SubstituteEntry};
use crate::error::{ThemeError, ThemeResult};
use crate::options::{StyleLang, ThemeOptions};
use crate::session::{BuildCommand, ThemeSession, CACHE_DIR};

pub use fs::{copy_tree, copy_tree_excluding, remove_tree, replace_tree, write_file};
pub use locate::{locate_package, resolve_name, PackageLocation};

/// Package providing `getLess` / `getSass`.
pub const DEFAULT_RUNTIME_PACKAGE: &str = "@teinte/runtime";

/// Marker file inside a generated substitute.
pub const MARKER_FILE: &str = ".teinte-substitute.json";

/// Runtime parameter file read by the substitute at compile time.
pub const PARAMS_FILE: &str = "substitute-params.json";

const ORIGINAL_DIR: &str = "original";
const SUBSTITUTE_DIR: &str = "substitute";
const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identity of an installed substitute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteMarker {
    pub package: String,
    pub version: String,
    pub fingerprint: String,
    pub generator: String,
}

/// Theme parameters baked into a substitute.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteParams {
    pub arbitrary_mode: bool,
    pub include_style_with_colors: Vec<ForcedColor>,
}

impl SubstituteParams {
    pub fn from_options(options: &ThemeOptions) -> Self {
        Self {
            arbitrary_mode: options.arbitrary_mode,
            include_style_with_colors: options.include_style_with_colors.clone(),
        }
    }
}

/// Per-session parameters read by the substitute on every compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeParams {
    /// Theme files are extracted. Always `false` outside a build.
    pub extract: bool,
    pub arbitrary_mode: bool,
    pub remove_css_scope_name: bool,
    pub scope_names: Vec<String>,
    pub command: BuildCommand,
}

impl RuntimeParams {
    pub fn from_session(session: &ThemeSession) -> Self {
        let options = session.options();
        Self {
            extract: session.is_build() && options.extract,
            arbitrary_mode: options.arbitrary_mode,
            remove_css_scope_name: options.remove_css_scope_name,
            scope_names: session.registry().scope_names(),
            command: session.command(),
        }
    }
}

/// Result of [`PreprocessorSubstitution::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A substitute was copied over the installed package.
    Installed { lang: StyleLang, fingerprint: String },
    /// The installed package already is this substitute.
    AlreadyCurrent { lang: StyleLang, fingerprint: String },
}

impl InstallOutcome {
    pub fn fingerprint(&self) -> &str {
        match self {
            InstallOutcome::Installed { fingerprint, .. }
            | InstallOutcome::AlreadyCurrent { fingerprint, .. } => fingerprint,
        }
    }
}

/// Read the marker of a package directory. Unreadable markers count as absent.
pub fn read_marker(dir: &Path) -> Option<SubstituteMarker> {
    let path = dir.join(MARKER_FILE);
    let text = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&text) {
        Ok(marker) => Some(marker),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring malformed substitute marker: {e}");
            None
        }
    }
}

/// Whether the installed entry file is a generated wrapper.
fn entry_is_generated(package: &PackageLocation) -> bool {
    std::fs::read_to_string(package.dir.join(&package.main)).is_ok_and(|code| is_generated(&code))
}

/// A marker or a generated entry means the package is not pristine.
fn is_substituted_package(package: &PackageLocation) -> bool {
    read_marker(&package.dir).is_some() || entry_is_generated(package)
}

/// Installs and restores substituted preprocessors of one project.
#[derive(Debug, Clone)]
pub struct PreprocessorSubstitution {
    root: PathBuf,
    cache_dir: PathBuf,
    runtime_package: String,
}

impl PreprocessorSubstitution {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let cache_dir = root.join(CACHE_DIR);
        Self {
            root,
            cache_dir,
            runtime_package: DEFAULT_RUNTIME_PACKAGE.to_string(),
        }
    }

    pub fn for_session(session: &ThemeSession) -> Self {
        Self::new(session.root())
    }

    pub fn with_runtime_package(mut self, package: impl Into<String>) -> Self {
        self.runtime_package = package.into();
        self
    }

    pub fn node_modules(&self) -> PathBuf {
        self.root.join("node_modules")
    }

    pub fn original_root(&self) -> PathBuf {
        self.cache_dir.join(ORIGINAL_DIR)
    }

    pub fn substitute_root(&self) -> PathBuf {
        self.cache_dir.join(SUBSTITUTE_DIR)
    }

    pub fn params_path(&self) -> PathBuf {
        self.cache_dir.join(PARAMS_FILE)
    }

    /// Locate the package of `lang`, failing when neither the installed
    /// package nor a saved original exists.
    pub fn locate(&self, lang: StyleLang) -> ThemeResult<PackageLocation> {
        locate_package(&self.node_modules(), &self.original_root(), lang)?.ok_or_else(|| {
            ThemeError::MissingPreprocessor {
                lang,
                package: lang.package_name().to_string(),
            }
        })
    }

    /// Content address of the substitute for a package and parameters.
    pub fn fingerprint(
        &self,
        package: &PackageLocation,
        params: &SubstituteParams,
    ) -> ThemeResult<String> {
        let params_json = serde_json::to_string(params)?;
        let root = path_to_posix(&self.root);
        Ok(hash_to_hex(hash_parts([
            package.package,
            package.resolve_name.as_str(),
            package.version.as_str(),
            package.main.as_str(),
            params_json.as_str(),
            self.runtime_package.as_str(),
            root.as_str(),
            GENERATOR_VERSION,
        ])))
    }

    /// Install the substitute for `lang`. Safe to run repeatedly.
    pub fn install(&self, lang: StyleLang, params: &SubstituteParams) -> ThemeResult<InstallOutcome> {
        let package = self.locate(lang)?;
        let original = self.original_root().join(&package.resolve_name);
        let installed = read_marker(&package.dir);

        if !package.dir.is_dir() {
            tracing::info!(package = package.package, "restoring package from saved original");
            copy_tree(&original, &package.dir)?;
        } else if installed.is_none() {
            if entry_is_generated(&package) {
                if !original.is_dir() {
                    return Err(ThemeError::UnmarkedSubstitute {
                        package: package.package.to_string(),
                        path: package.dir.clone(),
                    });
                }
                tracing::warn!(
                    package = package.package,
                    "substitute without marker found, restoring saved original"
                );
                copy_tree(&original, &package.dir)?;
            } else {
                tracing::debug!(package = package.package, "saving pristine package");
                replace_tree(&package.dir, &original)?;
            }
        }

        let fingerprint = self.fingerprint(&package, params)?;
        if installed
            .as_ref()
            .is_some_and(|marker| marker.fingerprint == fingerprint)
        {
            tracing::debug!(%lang, %fingerprint, "substitute already installed");
            return Ok(InstallOutcome::AlreadyCurrent { lang, fingerprint });
        }

        let substitute = self
            .substitute_root()
            .join(format!("{}-{}", package.resolve_name, fingerprint));
        let ready = read_marker(&substitute).is_some_and(|marker| marker.fingerprint == fingerprint);
        if !ready {
            self.generate(&package, &original, &substitute, params, &fingerprint)?;
        }

        copy_tree_excluding(&substitute, &package.dir, &[MARKER_FILE])?;
        let marker = package.dir.join(MARKER_FILE);
        std::fs::copy(substitute.join(MARKER_FILE), &marker)
            .map_err(|e| ThemeError::io(&marker, e))?;
        tracing::info!(%lang, package = package.package, %fingerprint, "installed substitute preprocessor");
        Ok(InstallOutcome::Installed { lang, fingerprint })
    }

    fn generate(
        &self,
        package: &PackageLocation,
        original: &Path,
        substitute: &Path,
        params: &SubstituteParams,
        fingerprint: &str,
    ) -> ThemeResult<()> {
        replace_tree(original, substitute)?;

        let original_main = path_to_posix(&original.join(&package.main));
        let params_file = path_to_posix(&self.params_path());
        let entry = SubstituteEntry {
            original_main: &original_main,
            runtime_package: &self.runtime_package,
            factory: package.lang.factory_name(),
            arbitrary_mode: params.arbitrary_mode,
            include_style_with_colors: &params.include_style_with_colors,
            params_file: &params_file,
        };
        write_file(&substitute.join(&package.main), &entry.render())?;

        // Written last: a substitute without a marker is incomplete.
        let marker = SubstituteMarker {
            package: package.package.to_string(),
            version: package.version.clone(),
            fingerprint: fingerprint.to_string(),
            generator: GENERATOR_VERSION.to_string(),
        };
        write_file(
            &substitute.join(MARKER_FILE),
            &serde_json::to_string_pretty(&marker)?,
        )
    }

    /// Restore the pristine package. Returns `false` when nothing was
    /// substituted.
    pub fn reset(&self, lang: StyleLang) -> ThemeResult<bool> {
        let package = self.locate(lang)?;
        if package.dir.is_dir() && !is_substituted_package(&package) {
            return Ok(false);
        }
        let original = self.original_root().join(&package.resolve_name);
        if !original.is_dir() {
            return Err(ThemeError::MissingPreprocessor {
                lang,
                package: package.package.to_string(),
            });
        }

        copy_tree(&original, &package.dir)?;
        let marker = package.dir.join(MARKER_FILE);
        if marker.exists() {
            std::fs::remove_file(&marker).map_err(|e| ThemeError::io(&marker, e))?;
        }
        tracing::info!(%lang, package = package.package, "restored original preprocessor");
        Ok(true)
    }

    /// Whether the installed package of `lang` is a substitute.
    pub fn is_substituted(&self, lang: StyleLang) -> ThemeResult<bool> {
        let package = self.locate(lang)?;
        Ok(is_substituted_package(&package))
    }

    /// Write the per-session parameter file.
    pub fn write_runtime_params(&self, params: &RuntimeParams) -> ThemeResult<PathBuf> {
        let path = self.params_path();
        write_file(&path, &serde_json::to_string_pretty(params)?)?;
        Ok(path)
    }
}
