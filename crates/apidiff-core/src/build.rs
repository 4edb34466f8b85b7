//! Build system collaborator: package description and compilation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::domain::error::{ApiDiffError, Result};
use crate::domain::module::ModuleName;
use crate::domain::package::{
    LibraryLinkage, Package, PackageGraph, Product, ProductKind, SourceLanguage, Target,
    TargetKind,
};
use crate::process::ToolCommand;
use crate::vcs::SourceTree;

/// Handle on a built source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub package_root: PathBuf,

    /// Directory holding compiled module metadata.
    pub module_dir: PathBuf,
}

/// Build system collaborator.
#[async_trait]
pub trait BuildSystem: Send + Sync {
    /// Describe the root packages at `root`.
    async fn package_graph(&self, root: &Path) -> Result<PackageGraph>;

    /// Build `tree` far enough for the digester to read module metadata.
    async fn build(&self, tree: &SourceTree) -> Result<BuildPlan>;

    /// Number of parallel workers the build is allowed to use.
    fn worker_count(&self) -> usize;
}

/// Swift package build driven through the `swift` command line.
#[derive(Debug, Clone)]
pub struct SwiftPackageBuildSystem {
    tool: String,
    workers: usize,
}

impl SwiftPackageBuildSystem {
    pub fn new(tool: impl Into<String>, workers: usize) -> Self {
        Self {
            tool: tool.into(),
            workers: workers.max(1),
        }
    }

    async fn run(&self, root: &Path, args: &[&str]) -> Result<String> {
        let output = ToolCommand::new(self.tool.as_str(), args.iter().copied())
            .current_dir(root)
            .run()
            .await
            .map_err(|e| ApiDiffError::Build(e.to_string()))?;

        if !output.success {
            return Err(ApiDiffError::Build(format!(
                "{} {} failed with {}",
                self.tool,
                args.join(" "),
                output.failure_summary()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl BuildSystem for SwiftPackageBuildSystem {
    async fn package_graph(&self, root: &Path) -> Result<PackageGraph> {
        let root_arg = root.to_string_lossy().to_string();
        let stdout = self
            .run(
                root,
                &["package", "--package-path", &root_arg, "describe", "--type", "json"],
            )
            .await?;
        let description: PackageDescription = serde_json::from_str(&stdout)?;
        Ok(PackageGraph::new(vec![description.into_package()?]))
    }

    async fn build(&self, tree: &SourceTree) -> Result<BuildPlan> {
        let root_arg = tree.root.to_string_lossy().to_string();
        let jobs = self.workers.to_string();
        info!(root = %root_arg, jobs = self.workers, "building package");

        self.run(&tree.root, &["build", "--package-path", &root_arg, "-j", &jobs])
            .await?;
        let bin_path = self
            .run(&tree.root, &["build", "--package-path", &root_arg, "--show-bin-path"])
            .await?;

        Ok(BuildPlan {
            package_root: tree.root.clone(),
            module_dir: PathBuf::from(bin_path.trim()),
        })
    }

    fn worker_count(&self) -> usize {
        self.workers
    }
}

// ---------------------------------------------------------------------------
// `swift package describe --type json` schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PackageDescription {
    name: String,
    #[serde(default)]
    products: Vec<ProductDescription>,
    #[serde(default)]
    targets: Vec<TargetDescription>,
}

#[derive(Debug, Deserialize)]
struct ProductDescription {
    name: String,
    #[serde(default)]
    targets: Vec<String>,
    /// Single-key object, e.g. `{"library": ["automatic"]}`.
    #[serde(rename = "type")]
    kind: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TargetDescription {
    name: String,
    c99name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    module_type: Option<String>,
}

impl PackageDescription {
    fn into_package(self) -> Result<Package> {
        let products = self
            .products
            .into_iter()
            .map(ProductDescription::into_product)
            .collect::<Result<Vec<_>>>()?;
        let targets = self
            .targets
            .into_iter()
            .map(TargetDescription::into_target)
            .collect::<Result<Vec<_>>>()?;
        Ok(Package {
            name: self.name,
            products,
            targets,
        })
    }
}

impl ProductDescription {
    fn into_product(self) -> Result<Product> {
        let (key, value) = self.kind.into_iter().next().ok_or_else(|| {
            ApiDiffError::PackageDescription(format!("product '{}' has no type", self.name))
        })?;
        let kind = match key.as_str() {
            "library" => ProductKind::Library(library_linkage(&value)),
            "executable" => ProductKind::Executable,
            "plugin" => ProductKind::Plugin,
            "snippet" => ProductKind::Snippet,
            "test" => ProductKind::Test,
            "macro" => ProductKind::Macro,
            other => {
                return Err(ApiDiffError::PackageDescription(format!(
                    "product '{}' has unknown type '{}'",
                    self.name, other
                )))
            }
        };
        Ok(Product {
            name: self.name,
            kind,
            targets: self.targets,
        })
    }
}

fn library_linkage(value: &serde_json::Value) -> LibraryLinkage {
    let linkage = value
        .as_array()
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .unwrap_or("automatic");
    match linkage {
        "static" => LibraryLinkage::Static,
        "dynamic" => LibraryLinkage::Dynamic,
        _ => LibraryLinkage::Automatic,
    }
}

impl TargetDescription {
    fn into_target(self) -> Result<Target> {
        let kind = match self.kind.as_str() {
            "library" | "regular" => TargetKind::Library,
            "executable" => TargetKind::Executable,
            "test" => TargetKind::Test,
            "plugin" => TargetKind::Plugin,
            "macro" => TargetKind::Macro,
            "system-target" | "system" => TargetKind::System,
            "binary" => TargetKind::Binary,
            "snippet" => TargetKind::Snippet,
            other => {
                return Err(ApiDiffError::PackageDescription(format!(
                    "target '{}' has unknown type '{}'",
                    self.name, other
                )))
            }
        };
        let language = match self.module_type.as_deref() {
            Some("SwiftTarget") => SourceLanguage::Swift,
            Some("ClangTarget") => SourceLanguage::Clang,
            _ => SourceLanguage::Other,
        };
        let module = match self.c99name {
            Some(name) => ModuleName::new(name),
            None => ModuleName::from_target_name(&self.name),
        };
        Ok(Target {
            name: self.name,
            module,
            kind,
            language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIBE_JSON: &str = r#"{
        "name": "Pkg",
        "path": "/src/Pkg",
        "products": [
            {"name": "Pkg", "targets": ["Pkg", "CPkg"], "type": {"library": ["automatic"]}},
            {"name": "PkgDyn", "targets": ["Pkg"], "type": {"library": ["dynamic"]}},
            {"name": "pkg-tool", "targets": ["pkg-tool"], "type": {"executable": null}}
        ],
        "targets": [
            {"name": "Pkg", "c99name": "Pkg", "type": "library", "module_type": "SwiftTarget"},
            {"name": "CPkg", "c99name": "CPkg", "type": "library", "module_type": "ClangTarget"},
            {"name": "pkg-tool", "c99name": "pkg_tool", "type": "executable", "module_type": "SwiftTarget"},
            {"name": "PkgTests", "type": "test", "module_type": "SwiftTarget"}
        ]
    }"#;

    #[test]
    fn test_parse_describe_output() {
        let description: PackageDescription = serde_json::from_str(DESCRIBE_JSON).unwrap();
        let package = description.into_package().unwrap();

        assert_eq!(package.name, "Pkg");
        assert_eq!(package.products.len(), 3);
        assert_eq!(
            package.products[0].kind,
            ProductKind::Library(LibraryLinkage::Automatic)
        );
        assert_eq!(
            package.products[1].kind,
            ProductKind::Library(LibraryLinkage::Dynamic)
        );
        assert_eq!(package.products[2].kind, ProductKind::Executable);

        let tool = package.target("pkg-tool").unwrap();
        assert_eq!(tool.module.as_str(), "pkg_tool");
        assert_eq!(tool.kind, TargetKind::Executable);

        let tests = package.target("PkgTests").unwrap();
        assert_eq!(tests.module.as_str(), "PkgTests");
        assert_eq!(tests.kind, TargetKind::Test);

        assert_eq!(package.target("CPkg").unwrap().language, SourceLanguage::Clang);
    }

    #[test]
    fn test_default_modules_from_describe_output() {
        let description: PackageDescription = serde_json::from_str(DESCRIBE_JSON).unwrap();
        let graph = PackageGraph::new(vec![description.into_package().unwrap()]);
        let modules = graph.library_modules(SourceLanguage::Swift);
        let names: Vec<&str> = modules.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["Pkg"]);
    }

    #[test]
    fn test_unknown_target_type_is_rejected() {
        let json = r#"{"name": "P", "targets": [{"name": "X", "type": "weird"}]}"#;
        let description: PackageDescription = serde_json::from_str(json).unwrap();
        let err = description.into_package().unwrap_err();
        assert!(matches!(err, ApiDiffError::PackageDescription(_)));
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        assert_eq!(SwiftPackageBuildSystem::new("swift", 0).worker_count(), 1);
        assert_eq!(SwiftPackageBuildSystem::new("swift", 8).worker_count(), 8);
    }
}
