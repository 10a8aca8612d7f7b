//! Function manifest (`stack.yml`) model.
//!
//! The manifest grammar belongs to the platform's CLI; this module only
//! reads the parts the pipeline consumes: each function's name, image,
//! handler and build options.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Function name → definition, name-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    functions: BTreeMap<String, FunctionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Declared image, optionally tagged (`owner/fn:0.1`)
    pub image: String,
    /// Handler directory, relative to the manifest
    #[serde(default)]
    pub handler: String,
    /// Template language
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub build_options: Vec<String>,
}

impl FunctionDefinition {
    pub fn new(image: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            handler: handler.into(),
            lang: None,
            build_options: Vec::new(),
        }
    }
}

impl Stack {
    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &FunctionDefinition)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Parse manifest text. `path` is only used for error context.
    pub fn from_yaml_str(content: &str, path: &Path) -> crate::Result<Self> {
        let raw: RawManifest =
            serde_yaml::from_str(content).map_err(|e| crate::Error::ManifestParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        if raw.functions.is_empty() {
            return Err(crate::Error::EmptyManifest {
                path: path.to_path_buf(),
            });
        }

        let mut functions = BTreeMap::new();
        for (name, def) in raw.functions {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(invalid(path, name, "function name is empty"));
            }
            if !is_single_component(&name) {
                return Err(invalid(path, name, "function name must be a single path component"));
            }
            if def.image.trim().is_empty() {
                return Err(invalid(path, name, "image is empty"));
            }
            if functions.contains_key(&name) {
                return Err(invalid(path, name, "declared more than once"));
            }
            functions.insert(name, def);
        }

        Ok(Self { functions })
    }
}

impl FromIterator<(String, FunctionDefinition)> for Stack {
    fn from_iter<I: IntoIterator<Item = (String, FunctionDefinition)>>(iter: I) -> Self {
        Self {
            functions: iter.into_iter().collect(),
        }
    }
}

/// Names become `build/<name>` and `<name>.tar` inside the checkout.
fn is_single_component(name: &str) -> bool {
    if name.contains(['/', '\\']) || name.contains("..") {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn invalid(path: &Path, function: String, reason: &'static str) -> crate::Error {
    crate::Error::InvalidFunction {
        path: path.to_path_buf(),
        function,
        reason,
    }
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    functions: BTreeMap<String, FunctionDefinition>,
}

/// Turns a manifest file into a [`Stack`].
pub trait ManifestParser: Send + Sync {
    fn parse(&self, path: &Path) -> crate::Result<Stack>;
}

/// Reads `stack.yml`-style YAML manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlManifestParser;

impl ManifestParser for YamlManifestParser {
    fn parse(&self, path: &Path) -> crate::Result<Stack> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::ManifestRead {
            path: PathBuf::from(path),
            source: e,
        })?;
        Stack::from_yaml_str(&content, path)
    }
}
