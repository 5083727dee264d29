//! Locating installed preprocessor packages.
//!
//! Handles the flat npm layout (`node_modules/less`) and the cnpm layout
//! (`node_modules/_less@4.2.0@less`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ThemeError, ThemeResult};
use crate::options::StyleLang;

/// An installed (or saved) preprocessor package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocation {
    pub lang: StyleLang,
    /// npm package name.
    pub package: &'static str,
    /// Directory name under `node_modules`.
    pub resolve_name: String,
    /// Installed package directory. May not exist when only the saved
    /// original is left.
    pub dir: PathBuf,
    /// Entry file relative to the package directory.
    pub main: String,
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Directory name of `package` inside `dir`, if present.
pub fn resolve_name(dir: &Path, package: &str) -> Option<String> {
    if dir.join(package).is_dir() {
        return Some(package.to_string());
    }
    let prefix = format!("_{}@", package.replace('/', "_"));
    let suffix = format!("@{package}");
    fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.len() > prefix.len() + suffix.len())
        .filter(|name| name.starts_with(&prefix) && name.ends_with(&suffix))
        .max_by(|a, b| {
            let version = |name: &str| version_key(&name[prefix.len()..name.len() - suffix.len()]);
            version(a).cmp(&version(b)).then_with(|| a.cmp(b))
        })
}

/// Numeric components of a version, `4.10.0-beta.1` giving `[4, 10, 0]`.
fn version_key(version: &str) -> Vec<u64> {
    let release = version.split(['-', '+']).next().unwrap_or_default();
    release
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

fn read_package_json(dir: &Path) -> ThemeResult<Option<PackageJson>> {
    let path = dir.join("package.json");
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path).map_err(|e| ThemeError::io(&path, e))?;
    Ok(Some(serde_json::from_str(&text)?))
}

/// Locate the package implementing `lang`.
///
/// `node_modules` is searched first, then `original_root` where pristine
/// copies are saved.
pub fn locate_package(
    node_modules: &Path,
    original_root: &Path,
    lang: StyleLang,
) -> ThemeResult<Option<PackageLocation>> {
    let package = lang.package_name();
    let Some(resolve_name) =
        resolve_name(node_modules, package).or_else(|| resolve_name(original_root, package))
    else {
        return Ok(None);
    };

    let dir = node_modules.join(&resolve_name);
    let manifest = match read_package_json(&dir)? {
        Some(manifest) => manifest,
        None => read_package_json(&original_root.join(&resolve_name))?.unwrap_or_default(),
    };
    let main = manifest
        .main
        .filter(|main| !main.trim().is_empty())
        .unwrap_or_else(|| "index.js".to_string());
    let main = main.trim_start_matches("./").to_string();

    Ok(Some(PackageLocation {
        lang,
        package,
        resolve_name,
        dir,
        main,
        version: manifest.version.unwrap_or_else(|| "0.0.0".to_string()),
    }))
}
