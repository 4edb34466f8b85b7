//! Package graph model: root packages, their products and targets.
//!
//! Product and target kinds are closed enums. Callers match them exhaustively
//! instead of probing for capabilities at runtime.

use serde::{Deserialize, Serialize};

use super::module::{ModuleName, ModuleSet};

/// Linkage of a library product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryLinkage {
    Automatic,
    Static,
    Dynamic,
}

/// Kind of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "linkage", rename_all = "snake_case")]
pub enum ProductKind {
    Library(LibraryLinkage),
    Executable,
    Plugin,
    Snippet,
    Test,
    Macro,
}

impl ProductKind {
    pub fn is_library(&self) -> bool {
        match self {
            ProductKind::Library(_) => true,
            ProductKind::Executable
            | ProductKind::Plugin
            | ProductKind::Snippet
            | ProductKind::Test
            | ProductKind::Macro => false,
        }
    }
}

/// Kind of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Library,
    Executable,
    Test,
    Plugin,
    Macro,
    System,
    Binary,
    Snippet,
}

/// Implementation language of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLanguage {
    Swift,
    Clang,
    Other,
}

impl std::fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceLanguage::Swift => "Swift",
            SourceLanguage::Clang => "C-family",
            SourceLanguage::Other => "other",
        };
        f.write_str(name)
    }
}

/// A build target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Name as written in the package manifest.
    pub name: String,
    /// Canonical module name.
    pub module: ModuleName,
    pub kind: TargetKind,
    pub language: SourceLanguage,
}

impl Target {
    /// A library target implemented in `language`.
    pub fn is_diffable(&self, language: SourceLanguage) -> bool {
        self.kind == TargetKind::Library && self.language == language
    }
}

/// A product vended by a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub kind: ProductKind,
    /// Names of the targets making up this product.
    pub targets: Vec<String>,
}

/// A package: its products and targets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub products: Vec<Product>,
    pub targets: Vec<Target>,
}

impl Package {
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Targets of `product`, resolved against this package.
    pub fn product_targets<'a>(&'a self, product: &'a Product) -> impl Iterator<Item = &'a Target> {
        product.targets.iter().filter_map(|name| self.target(name))
    }
}

/// The root packages of a build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageGraph {
    pub root_packages: Vec<Package>,
}

impl PackageGraph {
    pub fn new(root_packages: Vec<Package>) -> Self {
        Self { root_packages }
    }

    /// First product named `name` across the root packages, with its owner.
    pub fn find_product(&self, name: &str) -> Option<(&Package, &Product)> {
        self.root_packages.iter().find_map(|pkg| {
            pkg.products
                .iter()
                .find(|p| p.name == name)
                .map(|p| (pkg, p))
        })
    }

    /// First target named `name` across the root packages.
    pub fn find_target(&self, name: &str) -> Option<&Target> {
        self.root_packages.iter().find_map(|pkg| pkg.target(name))
    }

    /// Every module that belongs to a library product and is implemented in
    /// `language`.
    pub fn library_modules(&self, language: SourceLanguage) -> ModuleSet {
        let mut modules = ModuleSet::new();
        for pkg in &self.root_packages {
            for product in pkg.products.iter().filter(|p| p.kind.is_library()) {
                modules.extend(
                    pkg.product_targets(product)
                        .filter(|t| t.language == language)
                        .map(|t| t.module.clone()),
                );
            }
        }
        modules
    }
}
