//! Module selection from product and target filters.

use tracing::debug;

use crate::domain::error::{ApiDiffError, Result};
use crate::domain::module::ModuleSet;
use crate::domain::package::{PackageGraph, SourceLanguage, TargetKind};
use crate::obs::ObservabilityScope;

/// Resolves the modules to diff against a package graph.
pub struct ModuleSelector<'a> {
    graph: &'a PackageGraph,
    language: SourceLanguage,
    scope: &'a ObservabilityScope,
}

impl<'a> ModuleSelector<'a> {
    pub fn new(
        graph: &'a PackageGraph,
        language: SourceLanguage,
        scope: &'a ObservabilityScope,
    ) -> Self {
        Self {
            graph,
            language,
            scope,
        }
    }

    /// Select modules named by `products` and `targets`.
    ///
    /// With both lists empty every library module in the diffable language is
    /// selected, possibly none. Otherwise every name is checked before
    /// failing, so one run reports all invalid names, and filters that match
    /// no module are an error.
    pub fn select(&self, products: &[String], targets: &[String]) -> Result<ModuleSet> {
        if products.is_empty() && targets.is_empty() {
            return Ok(self.graph.library_modules(self.language));
        }

        let mut modules = ModuleSet::new();
        let mut rejected = Vec::new();

        for name in products {
            match self.graph.find_product(name) {
                None => self.reject(&mut rejected, name, format!("no such product '{name}'")),
                Some((_, product)) if !product.kind.is_library() => self.reject(
                    &mut rejected,
                    name,
                    format!("'{name}' is not a library product"),
                ),
                Some((package, product)) => modules.extend(
                    package
                        .product_targets(product)
                        .filter(|t| t.language == self.language)
                        .map(|t| t.module.clone()),
                ),
            }
        }

        for name in targets {
            match self.graph.find_target(name) {
                None => self.reject(&mut rejected, name, format!("no such target '{name}'")),
                Some(target) if target.kind != TargetKind::Library => self.reject(
                    &mut rejected,
                    name,
                    format!("'{name}' is not a library target"),
                ),
                Some(target) if target.language != self.language => self.reject(
                    &mut rejected,
                    name,
                    format!("'{name}' is not a {} language target", self.language),
                ),
                Some(target) => {
                    modules.insert(target.module.clone());
                }
            }
        }

        if !rejected.is_empty() {
            return Err(ApiDiffError::InvalidSelection { rejected });
        }
        debug!(modules = modules.len(), "resolved module filters");
        non_empty(modules)
    }

    fn reject(&self, rejected: &mut Vec<String>, name: &str, message: String) {
        self.scope.emit_error(message);
        rejected.push(name.to_string());
    }
}

fn non_empty(modules: ModuleSet) -> Result<ModuleSet> {
    if modules.is_empty() {
        return Err(ApiDiffError::NoModulesSelected);
    }
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::module::ModuleName;
    use crate::domain::package::{LibraryLinkage, Package, Product, ProductKind, Target};
    use crate::obs::ObservedLevel;

    fn target(name: &str, kind: TargetKind, language: SourceLanguage) -> Target {
        Target {
            name: name.to_string(),
            module: ModuleName::from_target_name(name),
            kind,
            language,
        }
    }

    fn product(name: &str, kind: ProductKind, targets: &[&str]) -> Product {
        Product {
            name: name.to_string(),
            kind,
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn graph() -> PackageGraph {
        PackageGraph::new(vec![Package {
            name: "Pkg".to_string(),
            products: vec![
                product(
                    "Foo",
                    ProductKind::Library(LibraryLinkage::Automatic),
                    &["Foo", "CFoo"],
                ),
                product(
                    "Bar",
                    ProductKind::Library(LibraryLinkage::Static),
                    &["Bar-Core"],
                ),
                product(
                    "CFooOnly",
                    ProductKind::Library(LibraryLinkage::Dynamic),
                    &["CFoo"],
                ),
                product("tool", ProductKind::Executable, &["tool"]),
            ],
            targets: vec![
                target("Foo", TargetKind::Library, SourceLanguage::Swift),
                target("CFoo", TargetKind::Library, SourceLanguage::Clang),
                target("Bar-Core", TargetKind::Library, SourceLanguage::Swift),
                target("Internal", TargetKind::Library, SourceLanguage::Swift),
                target("tool", TargetKind::Executable, SourceLanguage::Swift),
            ],
        }])
    }

    fn names(modules: &ModuleSet) -> Vec<&str> {
        modules.iter().map(|m| m.as_str()).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_scope_is_library_product_modules() {
        let graph = graph();
        let scope = ObservabilityScope::new();
        let selector = ModuleSelector::new(&graph, SourceLanguage::Swift, &scope);

        let modules = selector.select(&[], &[]).unwrap();
        assert_eq!(names(&modules), vec!["Bar_Core", "Foo"]);
        assert!(!scope.errors_reported());
    }

    #[test]
    fn test_product_filter_keeps_diffable_language_only() {
        let graph = graph();
        let scope = ObservabilityScope::new();
        let selector = ModuleSelector::new(&graph, SourceLanguage::Swift, &scope);

        let modules = selector.select(&strings(&["Foo"]), &[]).unwrap();
        assert_eq!(names(&modules), vec!["Foo"]);
    }

    #[test]
    fn test_target_filter_selects_targets_outside_products() {
        let graph = graph();
        let scope = ObservabilityScope::new();
        let selector = ModuleSelector::new(&graph, SourceLanguage::Swift, &scope);

        let modules = selector
            .select(&strings(&["Bar"]), &strings(&["Internal", "Foo"]))
            .unwrap();
        assert_eq!(names(&modules), vec!["Bar_Core", "Foo", "Internal"]);
    }

    #[test]
    fn test_every_invalid_name_is_reported_before_failing() {
        let graph = graph();
        let scope = ObservabilityScope::new();
        let selector = ModuleSelector::new(&graph, SourceLanguage::Swift, &scope);

        let err = selector
            .select(
                &strings(&["Nope", "tool", "Foo"]),
                &strings(&["DoesNotExist", "tool", "CFoo"]),
            )
            .unwrap_err();

        match err {
            ApiDiffError::InvalidSelection { rejected } => {
                assert_eq!(rejected, strings(&["Nope", "tool", "DoesNotExist", "tool", "CFoo"]));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            scope.messages(ObservedLevel::Error),
            strings(&[
                "no such product 'Nope'",
                "'tool' is not a library product",
                "no such target 'DoesNotExist'",
                "'tool' is not a library target",
                "'CFoo' is not a Swift language target",
            ])
        );
    }

    #[test]
    fn test_default_scope_may_be_empty() {
        let graph = PackageGraph::default();
        let scope = ObservabilityScope::new();
        let selector = ModuleSelector::new(&graph, SourceLanguage::Swift, &scope);
        assert!(selector.select(&[], &[]).unwrap().is_empty());
        assert!(!scope.errors_reported());
    }

    #[test]
    fn test_filters_matching_no_module_fail() {
        let graph = graph();
        let scope = ObservabilityScope::new();
        let selector = ModuleSelector::new(&graph, SourceLanguage::Swift, &scope);
        assert!(matches!(
            selector.select(&strings(&["CFooOnly"]), &[]),
            Err(ApiDiffError::NoModulesSelected)
        ));
    }
}
