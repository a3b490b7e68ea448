//! File and symbol indexes for import resolution.

use indexmap::IndexMap;
use std::collections::HashMap;

use super::paths;
use crate::model::Node;
use crate::ontology::{attr, class};

/// Path and symbol lookup tables built from one dataset.
///
/// Every file is indexed under both its normalized path and its
/// extension-stripped path, so `pkg/util` and `pkg/util.py` resolve alike.
#[derive(Debug, Default)]
pub struct CodeIndex {
    /// path key -> file node id, in insertion order
    files: IndexMap<String, String>,
    /// path key -> (symbol name -> node id)
    symbols: HashMap<String, IndexMap<String, String>>,
}

impl CodeIndex {
    pub fn build(nodes: &[Node]) -> Self {
        let mut index = Self::default();

        for node in nodes {
            let Some(raw_path) = node.first_attr_str(&[attr::FILE_PATH, attr::SOURCE]) else {
                continue;
            };
            let path = paths::normalize(raw_path);
            let stripped = paths::strip_extension(&path).to_string();

            if node.class == class::FILE {
                index.files.insert(path.clone(), node.id.clone());
                index.files.insert(stripped.clone(), node.id.clone());
            }

            let name = match node.class.as_str() {
                class::CLASS => node.attr_str(attr::CLASS_NAME),
                class::FUNCTION | class::METHOD => node.attr_str(attr::FUNCTION_NAME),
                _ => None,
            };
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                for key in [path, stripped] {
                    index
                        .symbols
                        .entry(key)
                        .or_default()
                        .insert(name.to_string(), node.id.clone());
                }
            }
        }

        index
    }

    /// File node indexed under `key`.
    pub fn file(&self, key: &str) -> Option<&str> {
        self.files.get(key).map(String::as_str)
    }

    /// Symbol `name` defined in the file indexed under `key`.
    pub fn symbol(&self, key: &str, name: &str) -> Option<&str> {
        self.symbols
            .get(key)
            .and_then(|names| names.get(name))
            .map(String::as_str)
    }

    /// Names of the symbols defined in the file indexed under `key`.
    pub fn symbols_in(&self, key: &str) -> Vec<&str> {
        self.symbols
            .get(key)
            .map(|names| names.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Resolve `from <dots><module> import ...` seen in `current_dir`.
    ///
    /// Tries the module path, then its package initializer.
    pub fn resolve_relative(&self, current_dir: &str, level: u64, module: &str) -> Option<String> {
        let guess = paths::relative_base(current_dir, level, module);
        if !guess.is_empty() && self.files.contains_key(&guess) {
            return Some(guess);
        }
        let init = paths::init_of(&guess);
        self.files.contains_key(&init).then_some(init)
    }

    /// Resolve an absolute import: the first key, in insertion order, ending
    /// with the module path or with its package initializer.
    pub fn resolve_absolute(&self, module: &str) -> Option<&str> {
        let suffix = paths::module_to_path(module);
        let init_suffix = paths::init_of(&suffix);
        self.files
            .keys()
            .find(|key| key.ends_with(&suffix) || key.ends_with(&init_suffix))
            .map(String::as_str)
    }

    /// Number of path keys (two per file when the extension differs).
    pub fn file_key_count(&self) -> usize {
        self.files.len()
    }

    /// Number of (path key, symbol) entries.
    pub fn symbol_count(&self) -> usize {
        self.symbols.values().map(IndexMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, path: &str) -> Node {
        Node::new(id, class::FILE).with_attr(attr::FILE_PATH, path)
    }

    fn function(id: &str, path: &str, name: &str) -> Node {
        Node::new(id, class::FUNCTION)
            .with_attr(attr::FILE_PATH, path)
            .with_attr(attr::FUNCTION_NAME, name)
    }

    #[test]
    fn test_files_indexed_with_and_without_extension() {
        let index = CodeIndex::build(&[file("f1", r"pkg\util.py")]);
        assert_eq!(index.file("pkg/util.py"), Some("f1"));
        assert_eq!(index.file("pkg/util"), Some("f1"));
        assert_eq!(index.file_key_count(), 2);
    }

    #[test]
    fn test_source_fallback() {
        let node = Node::new("f1", class::FILE).with_attr(attr::SOURCE, "a/b.py");
        let index = CodeIndex::build(&[node]);
        assert_eq!(index.file("a/b"), Some("f1"));
    }

    #[test]
    fn test_symbols() {
        let index = CodeIndex::build(&[
            file("f1", "pkg/util.py"),
            function("fn1", "pkg/util.py", "helper"),
            Node::new("c1", class::CLASS)
                .with_attr(attr::FILE_PATH, "pkg/util.py")
                .with_attr(attr::CLASS_NAME, "Widget"),
        ]);
        assert_eq!(index.symbol("pkg/util", "helper"), Some("fn1"));
        assert_eq!(index.symbol("pkg/util.py", "Widget"), Some("c1"));
        assert_eq!(index.symbol("pkg/util", "missing"), None);
        assert_eq!(index.symbols_in("pkg/util"), vec!["helper", "Widget"]);
        assert_eq!(index.symbol_count(), 4);
    }

    #[test]
    fn test_resolve_relative() {
        let index = CodeIndex::build(&[
            file("f1", "pkg/util.py"),
            file("f2", "pkg/sub/__init__.py"),
        ]);
        assert_eq!(index.resolve_relative("pkg", 1, "util").as_deref(), Some("pkg/util"));
        assert_eq!(index.resolve_relative("pkg/sub", 2, "util").as_deref(), Some("pkg/util"));
        assert_eq!(
            index.resolve_relative("pkg", 1, "sub").as_deref(),
            Some("pkg/sub/__init__")
        );
        assert_eq!(
            index.resolve_relative("pkg/sub", 1, "").as_deref(),
            Some("pkg/sub/__init__")
        );
        assert_eq!(index.resolve_relative("pkg", 1, "nope"), None);
    }

    #[test]
    fn test_resolve_absolute_first_match() {
        let index = CodeIndex::build(&[
            file("f1", "src/pkg/util.py"),
            file("f2", "vendor/pkg/util.py"),
            file("f3", "lib/__init__.py"),
        ]);
        assert_eq!(index.resolve_absolute("pkg.util"), Some("src/pkg/util"));
        assert_eq!(index.resolve_absolute("lib"), Some("lib/__init__"));
        assert_eq!(index.resolve_absolute("missing"), None);
    }
}
