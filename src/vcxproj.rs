//! Owned model of a Visual Studio `.vcxproj` file.
//!
//! Only the parts needed to derive compile commands are captured:
//!
//! ```text
//! Project
//! ├── ItemGroup[Label]
//! │   ├── ProjectConfiguration[Include]  (Configuration, Platform)
//! │   └── ClCompile[Include]
//! └── ItemDefinitionGroup[Condition]
//!     └── ClCompile
//!         ├── AdditionalIncludeDirectories
//!         ├── PreprocessorDefinitions
//!         ├── LanguageStandard
//!         └── ConformanceMode
//! ```
//!
//! Anything else in the document is ignored.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
//  Type definitions
// ═══════════════════════════════════════════════════════════════════════════════

// Settings values are kept as raw strings: macros, inherit placeholders and
// separators are interpreted later, once a configuration is selected.

/// A parsed `.vcxproj` file.  Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct ProjectModel {
    /// Absolute path of the project file.
    pub path: PathBuf,
    /// Directory containing the project file; `$(ProjectDir)` and the
    /// working directory of every emitted command.
    pub directory: PathBuf,
    pub item_groups: Vec<ItemGroup>,
    pub item_definition_groups: Vec<ItemDefinitionGroup>,
}

/// An `<ItemGroup>` element.
#[derive(Debug, Clone, Default)]
pub struct ItemGroup {
    pub label: Option<String>,
    pub project_configurations: Vec<ProjectConfiguration>,
    pub sources: Vec<SourceFile>,
}

/// `<ProjectConfiguration Include="Debug|x64">`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfiguration {
    /// The full `Configuration|Platform` identifier.
    pub include: String,
    pub configuration: String,
    pub platform: String,
}

/// `<ClCompile Include="main.cpp" />` inside an `<ItemGroup>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub include: String,
}

/// An `<ItemDefinitionGroup>` element.
#[derive(Debug, Clone, Default)]
pub struct ItemDefinitionGroup {
    pub condition: Option<String>,
    pub cl_compile: ClCompileSettings,
}

/// The `<ClCompile>` settings block of an `<ItemDefinitionGroup>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClCompileSettings {
    pub additional_include_directories: String,
    pub preprocessor_definitions: String,
    pub language_standard: String,
    /// Parsed for completeness; not used when deriving flags.
    pub conformance_mode: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ProjectModel
// ═══════════════════════════════════════════════════════════════════════════════

impl ProjectModel {
    /// Load a `.vcxproj` file from disk.
    ///
    /// The stored path is made absolute; the file itself is read as given.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let absolute = std::path::absolute(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let project = Self::parse(&source, absolute)?;
        tracing::debug!(
            "Loaded {} ({} sources, {} configurations)",
            project.path.display(),
            project.find_source_files().len(),
            project.configurations().len()
        );
        Ok(project)
    }

    /// Parse project XML `source` as if it had been read from `path`.
    pub fn parse(source: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = roxmltree::Document::parse(source).map_err(|source| Error::Parse {
            path: path.clone(),
            source,
        })?;

        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut project = Self {
            path,
            directory,
            ..Default::default()
        };

        for child in doc.root_element().children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "ItemGroup" => project.item_groups.push(ItemGroup::parse(&child)),
                "ItemDefinitionGroup" => project
                    .item_definition_groups
                    .push(ItemDefinitionGroup::parse(&child)),
                _ => {}
            }
        }

        Ok(project)
    }

    /// Source files compiled by this project, across all item groups, in
    /// declaration order.
    pub fn find_source_files(&self) -> Vec<&str> {
        self.item_groups
            .iter()
            .flat_map(|ig| &ig.sources)
            .map(|src| src.include.as_str())
            .collect()
    }

    /// The declared configurations.
    ///
    /// Only the first item group declaring any `ProjectConfiguration` is
    /// honoured; later declarations are ignored.  Empty when none exists.
    pub fn configurations(&self) -> &[ProjectConfiguration] {
        self.item_groups
            .iter()
            .map(|ig| ig.project_configurations.as_slice())
            .find(|list| !list.is_empty())
            .unwrap_or(&[])
    }

    /// The first settings block whose condition contains `configuration`
    /// (e.g. `"Debug|x64"`) as a substring.
    pub fn settings_for(&self, configuration: &str) -> Option<&ClCompileSettings> {
        self.item_definition_groups
            .iter()
            .find(|idg| {
                idg.condition
                    .as_deref()
                    .is_some_and(|cond| cond.contains(configuration))
            })
            .map(|idg| &idg.cl_compile)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Parsing – roxmltree → owned types
// ═══════════════════════════════════════════════════════════════════════════════

impl ItemGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        let mut ig = Self {
            label: node.attribute("Label").map(String::from),
            ..Default::default()
        };

        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "ProjectConfiguration" => {
                    ig.project_configurations.push(ProjectConfiguration {
                        include: child.attribute("Include").unwrap_or("").to_string(),
                        configuration: find_child_text(&child, "Configuration")
                            .unwrap_or_default(),
                        platform: find_child_text(&child, "Platform").unwrap_or_default(),
                    });
                }
                "ClCompile" => {
                    ig.sources.push(SourceFile {
                        include: child.attribute("Include").unwrap_or("").to_string(),
                    });
                }
                _ => {}
            }
        }

        ig
    }
}

impl ItemDefinitionGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        let cl_compile = node
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "ClCompile")
            .map(|cl| ClCompileSettings::parse(&cl))
            .unwrap_or_default();

        Self {
            condition: node.attribute("Condition").map(String::from),
            cl_compile,
        }
    }
}

impl ClCompileSettings {
    fn parse(node: &roxmltree::Node) -> Self {
        let text = |tag| find_child_text(node, tag).unwrap_or_default();
        Self {
            additional_include_directories: text("AdditionalIncludeDirectories"),
            preprocessor_definitions: text("PreprocessorDefinitions"),
            language_standard: text("LanguageStandard"),
            conformance_mode: text("ConformanceMode"),
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Return the text content of the first child element with the given tag name.
fn find_child_text(parent: &roxmltree::Node, tag: &str) -> Option<String> {
    parent
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
        .and_then(|c| c.text())
        .map(String::from)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
