//! Module discovery
//!
//! Registration code is grouped into modules: named registration functions kept
//! in a [`ModuleCatalog`] under dotted paths (`payload`, `payload.models.old`).
//! During `setup` each configured discovery path is expanded package-style, the
//! module itself first and then every module nested beneath it, and each module
//! runs at most once.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use indexmap::IndexMap;
use regex::Regex;

use crate::error::SetupError;
use crate::registry::SchemaRegistry;

/// A registration function run during discovery
pub type RegisterFn<O> =
    Arc<dyn Fn(&mut SchemaRegistry<O>) -> Result<(), SetupError> + Send + Sync>;

fn module_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("valid module path pattern")
    })
}

/// Check that a module path is a dotted identifier
pub fn is_valid_module_path(path: &str) -> bool {
    module_path_pattern().is_match(path)
}

/// Ordered catalog of registration modules
pub struct ModuleCatalog<O> {
    modules: IndexMap<String, RegisterFn<O>>,
}

impl<O> Default for ModuleCatalog<O> {
    fn default() -> Self {
        Self {
            modules: IndexMap::new(),
        }
    }
}

impl<O: 'static> ModuleCatalog<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, replacing the registration function of an existing path in place
    pub fn add<F>(&mut self, path: impl Into<String>, register: F) -> Result<(), SetupError>
    where
        F: Fn(&mut SchemaRegistry<O>) -> Result<(), SetupError> + Send + Sync + 'static,
    {
        let path = path.into();
        if !is_valid_module_path(&path) {
            return Err(SetupError::InvalidModulePath(path));
        }
        tracing::debug!(module = %path, "module added to catalog");
        self.modules.insert(path, Arc::new(register));
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module paths in catalog order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Expand a discovery path to the modules it covers
    pub fn expand(&self, path: &str) -> Result<Vec<(String, RegisterFn<O>)>, SetupError> {
        let prefix = format!("{}.", path);
        let mut expanded: Vec<(String, RegisterFn<O>)> = Vec::new();

        if let Some(register) = self.modules.get(path) {
            expanded.push((path.to_string(), Arc::clone(register)));
        }
        expanded.extend(
            self.modules
                .iter()
                .filter(|(name, _)| name.starts_with(&prefix))
                .map(|(name, register)| (name.clone(), Arc::clone(register))),
        );

        if expanded.is_empty() {
            return Err(SetupError::UnknownModule {
                path: path.to_string(),
                suggestion: self.suggest(path),
            });
        }
        Ok(expanded)
    }

    /// Closest known module path to a mistyped one
    pub fn suggest(&self, path: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default();
        self.modules
            .keys()
            .filter_map(|name| matcher.fuzzy_match(name, path).map(|score| (score, name)))
            .max_by_key(|(score, _)| *score)
            .map(|(_, name)| name.clone())
    }
}

impl<O> fmt::Debug for ModuleCatalog<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.modules.keys()).finish()
    }
}

/// Modules already run, so each runs at most once
#[derive(Debug, Default)]
pub(crate) struct LoadedModules(HashSet<String>);

impl LoadedModules {
    /// Record a module as loaded; false if it already was
    pub(crate) fn mark(&mut self, path: &str) -> bool {
        self.0.insert(path.to_string())
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut SchemaRegistry<i64>) -> Result<(), SetupError> {
        Ok(())
    }

    fn catalog() -> ModuleCatalog<i64> {
        let mut catalog = ModuleCatalog::new();
        catalog.add("payload.registry", noop).unwrap();
        catalog.add("payload", noop).unwrap();
        catalog.add("payload.models.old", noop).unwrap();
        catalog.add("payload.models.new", noop).unwrap();
        catalog.add("payload_extra", noop).unwrap();
        catalog.add("other.builders", noop).unwrap();
        catalog
    }

    fn expanded_paths(catalog: &ModuleCatalog<i64>, path: &str) -> Vec<String> {
        catalog
            .expand(path)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    #[test]
    fn test_module_path_validation() {
        assert!(is_valid_module_path("payload"));
        assert!(is_valid_module_path("payload.models.old_v1"));
        assert!(!is_valid_module_path(""));
        assert!(!is_valid_module_path("payload..models"));
        assert!(!is_valid_module_path("1payload"));
        assert!(!is_valid_module_path("payload/models"));

        let mut catalog = ModuleCatalog::<i64>::new();
        assert_eq!(
            catalog.add("bad path", noop),
            Err(SetupError::InvalidModulePath("bad path".to_string()))
        );
    }

    #[test]
    fn test_package_expansion() {
        let catalog = catalog();
        assert_eq!(
            expanded_paths(&catalog, "payload"),
            vec!["payload", "payload.registry", "payload.models.old", "payload.models.new"]
        );
        assert_eq!(
            expanded_paths(&catalog, "payload.models"),
            vec!["payload.models.old", "payload.models.new"]
        );
        assert_eq!(expanded_paths(&catalog, "other.builders"), vec!["other.builders"]);
    }

    #[test]
    fn test_unknown_module_suggestion() {
        let catalog = catalog();
        match catalog.expand("payload.modls") {
            Err(SetupError::UnknownModule { path, suggestion }) => {
                assert_eq!(path, "payload.modls");
                assert!(suggestion.unwrap().starts_with("payload.models"));
            }
            other => panic!("Expected UnknownModule, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_loaded_modules() {
        let mut loaded = LoadedModules::default();
        assert!(loaded.mark("payload"));
        assert!(!loaded.mark("payload"));
        assert_eq!(loaded.len(), 1);
    }
}
