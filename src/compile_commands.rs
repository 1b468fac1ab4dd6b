//! `compile_commands.json` synthesis.
//!
//! Every source file of every project becomes one [`CompileCommand`]:
//!
//! ```text
//! <compiler> <std flag> /I<dir>... /D<define>... <file>
//! ```
//!
//! run from the project directory.  Output order follows project order, then
//! source declaration order, so the database is reproducible.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{self, ConfigurationId, ResolvedConfig};
use crate::error::{Error, Result};
use crate::vcxproj::ProjectModel;

/// Compiler invocation used when none is configured.
pub const DEFAULT_COMPILER: &str = "clang-cl.exe";

/// Placeholder/separator pairs and the current-directory entry replacing
/// each, keeping the separator on the same side.
const INHERIT_INCLUDES: [(&str, &str); 2] = [
    (";%(AdditionalIncludeDirectories)", ";."),
    ("%(AdditionalIncludeDirectories);", ".;"),
];

const INHERIT_DEFINES: [&str; 2] = [";%(PreprocessorDefinitions)", "%(PreprocessorDefinitions);"];

// ═══════════════════════════════════════════════════════════════════════════════
//  CompileCommand
// ═══════════════════════════════════════════════════════════════════════════════

/// One entry of a `compile_commands.json` database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    /// The working directory for compilation.
    pub directory: String,
    /// The full compilation command.
    pub command: String,
    /// The source file, as declared in the project.
    pub file: String,
}

/// Render `commands` as a JSON array.
pub fn to_json(commands: &[CompileCommand]) -> Result<String> {
    Ok(serde_json::to_string_pretty(commands)?)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Sanitization
// ═══════════════════════════════════════════════════════════════════════════════

/// Replace `%(AdditionalIncludeDirectories)` placeholders that sit next to a
/// `;` with the current directory `.`.
pub fn sanitize_includes(include: &str) -> String {
    let mut include = include.to_string();
    for (bad, good) in INHERIT_INCLUDES {
        include = include.replace(bad, good);
    }
    include
}

/// Remove `%(PreprocessorDefinitions)` placeholders that sit next to a `;`.
pub fn sanitize_definitions(definitions: &str) -> String {
    let mut definitions = definitions.to_string();
    for bad in INHERIT_DEFINES {
        definitions = definitions.replace(bad, "");
    }
    definitions
}

/// Split a `;`-separated list into its non-empty entries.  A bare inherit
/// placeholder (`%(Name)`) has no value and is skipped too.
fn list_entries(list: &str) -> impl Iterator<Item = &str> {
    list.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| !(entry.starts_with("%(") && entry.ends_with(')')))
}

fn quote(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

/// Compiler arguments shared by every source file of a resolved project:
/// the standard flag, then `/I` and `/D` switches.
pub fn compiler_flags(resolved: &ResolvedConfig) -> Vec<String> {
    let includes = sanitize_includes(&resolved.include_directories);
    let definitions = sanitize_definitions(&resolved.preprocessor_definitions);

    let mut flags = vec![resolved.standard_flag().to_string()];
    flags.extend(list_entries(&includes).map(|dir| quote(&format!("/I{dir}"))));
    flags.extend(list_entries(&definitions).map(|def| quote(&format!("/D{def}"))));
    flags
}

/// Build the command records for every source file of `project`.
pub fn project_commands(
    project: &ProjectModel,
    resolved: &ResolvedConfig,
    compiler: &str,
) -> Vec<CompileCommand> {
    let directory = project.directory.to_string_lossy().into_owned();
    let prefix = std::iter::once(quote(compiler))
        .chain(compiler_flags(resolved))
        .collect::<Vec<_>>()
        .join(" ");

    project
        .find_source_files()
        .into_iter()
        .map(|file| CompileCommand {
            directory: directory.clone(),
            command: format!("{prefix} {}", quote(file)),
            file: file.to_string(),
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  CompileDbBuilder – options and environment
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for a [`CompileDb`].
///
/// The environment snapshot starts empty; [`system_env`](Self::system_env)
/// pulls in the process environment.  Later calls override earlier values
/// for the same key.
///
/// # Example
/// ```no_run
/// use vcxproj_compdb::CompileDbBuilder;
///
/// let db = CompileDbBuilder::new()
///     .system_env()
///     .env_var("VcpkgRoot", r"C:\vcpkg\installed")
///     .fail_fast(false)
///     .build();
/// let synthesis = db
///     .generate_from_paths(&["app/app.vcxproj", "lib/lib.vcxproj"], "Debug|x64")
///     .unwrap();
/// println!("{}", synthesis.to_json().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct CompileDbBuilder {
    env: HashMap<String, String>,
    compiler: String,
    fail_fast: bool,
}

impl Default for CompileDbBuilder {
    fn default() -> Self {
        Self {
            env: HashMap::new(),
            compiler: DEFAULT_COMPILER.to_string(),
            fail_fast: true,
        }
    }
}

impl CompileDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an entire variable map into the environment.
    pub fn env(mut self, vars: HashMap<String, String>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Set a single environment variable.
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Pull all current process environment variables into the map.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn system_env(mut self) -> Self {
        for (k, v) in std::env::vars_os() {
            if let (Ok(k), Ok(v)) = (k.into_string(), v.into_string()) {
                self.env.insert(k, v);
            }
        }
        self
    }

    /// Parse an environment dump (see [`crate::envfile`]) and merge it.
    pub fn env_dump(self, content: &str) -> Self {
        let vars = crate::envfile::parse_env_dump(content);
        self.env(vars)
    }

    /// Read an environment dump from disk and merge it.
    pub fn env_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let vars = crate::envfile::parse_env_file(path)?;
        Ok(self.env(vars))
    }

    /// Compiler invocation placed first in every command.
    pub fn compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Abort on the first failing project (`true`, the default) or collect
    /// failures and keep going (`false`).
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn build(self) -> CompileDb {
        CompileDb {
            env: self.env,
            compiler: self.compiler,
            fail_fast: self.fail_fast,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  CompileDb – whole-solution synthesis
// ═══════════════════════════════════════════════════════════════════════════════

/// Generates compile commands for a set of projects.
#[derive(Debug, Clone)]
pub struct CompileDb {
    env: HashMap<String, String>,
    compiler: String,
    fail_fast: bool,
}

impl Default for CompileDb {
    fn default() -> Self {
        CompileDbBuilder::new().build()
    }
}

/// A project that could not be loaded or resolved.
#[derive(Debug)]
pub struct ProjectFailure {
    pub project: PathBuf,
    pub error: Error,
}

/// Outcome of a generation run.
#[derive(Debug, Default)]
pub struct Synthesis {
    pub commands: Vec<CompileCommand>,
    /// Always empty in fail-fast mode.
    pub failures: Vec<ProjectFailure>,
}

impl Synthesis {
    /// `true` when every project resolved.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_projects(&self) -> Vec<&Path> {
        self.failures.iter().map(|f| f.project.as_path()).collect()
    }

    /// Render the commands as a `compile_commands.json` array.
    pub fn to_json(&self) -> Result<String> {
        to_json(&self.commands)
    }
}

impl CompileDb {
    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Resolve one project and build its commands.
    pub fn project_commands(
        &self,
        project: &ProjectModel,
        configuration: &str,
    ) -> Result<Vec<CompileCommand>> {
        let resolved = config::find_config(project, configuration, &self.env)?;
        let commands = project_commands(project, &resolved, &self.compiler);
        tracing::debug!(
            "{}: {} compile commands",
            project.path.display(),
            commands.len()
        );
        Ok(commands)
    }

    /// Generate commands for `projects`, in order, for `configuration`.
    ///
    /// A malformed `configuration` fails the whole run in either mode.
    pub fn generate(&self, projects: &[ProjectModel], configuration: &str) -> Result<Synthesis> {
        ConfigurationId::parse(configuration)?;

        let mut synthesis = Synthesis::default();
        for project in projects {
            let outcome = self.project_commands(project, configuration);
            self.record(&mut synthesis, &project.path, outcome)?;
        }
        Ok(synthesis)
    }

    /// Load each project file, then generate as [`generate`](Self::generate)
    /// does.  Load errors count as project failures.
    pub fn generate_from_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        configuration: &str,
    ) -> Result<Synthesis> {
        ConfigurationId::parse(configuration)?;

        let mut synthesis = Synthesis::default();
        for path in paths {
            let path = path.as_ref();
            let outcome = ProjectModel::load(path)
                .and_then(|project| self.project_commands(&project, configuration));
            self.record(&mut synthesis, path, outcome)?;
        }
        Ok(synthesis)
    }

    fn record(
        &self,
        synthesis: &mut Synthesis,
        project: &Path,
        outcome: Result<Vec<CompileCommand>>,
    ) -> Result<()> {
        match outcome {
            Ok(commands) => synthesis.commands.extend(commands),
            Err(error) if self.fail_fast => return Err(error),
            Err(error) => {
                tracing::warn!("Skipping {}: {error}", project.display());
                synthesis.failures.push(ProjectFailure {
                    project: project.to_path_buf(),
                    error,
                });
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
