//! MSBuild `$(Name)` macro table and textual expansion.
//!
//! A [`MacroEnvironment`] is built fresh for every (project, configuration)
//! pair.  It is seeded with the project intrinsics:
//!
//! - `$(ProjectDir)` – directory containing the project file
//! - `$(Configuration)` / `$(ConfigurationName)` – e.g. `Debug`
//! - `$(Platform)` – e.g. `x64`
//!
//! and then overlaid with an explicit environment snapshot, every variable
//! re-keyed as `$(NAME)`.  Insertion order decides collisions: an
//! environment variable named `Platform` replaces the intrinsic value.
//!
//! Expansion is a single pass over the [`chumsky`]-parsed literal and macro
//! segments: every known `$(Name)` is replaced by its value, which is not
//! scanned again.  Whatever `$(...)` survives is reported by
//! [`unresolved_macros`].

use std::collections::HashMap;
use std::path::Path;

use chumsky::prelude::*;

use crate::config::ConfigurationId;
use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
//  Segments
// ═══════════════════════════════════════════════════════════════════════════════

/// A fragment of a settings string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain text.
    Literal(String),
    /// A `$(Name)` reference, holding `Name`.
    Macro(String),
}

/// Build the chumsky parser that splits text into [`Segment`]s.
///
/// Names may hold one level of balanced parentheses, as in
/// `$(ProgramFiles(x86))`.  `$(` without a closing `)` and the empty `$()`
/// stay literal text.
fn segment_parser<'a>() -> impl Parser<'a, &'a str, Vec<Segment>, extra::Err<Simple<'a, char>>> {
    let nested = just('(')
        .then(none_of("()").repeated())
        .then(just(')'))
        .ignored();

    let name = choice((none_of("()").ignored(), nested))
        .repeated()
        .at_least(1)
        .to_slice();

    let macro_ref = just("$(")
        .ignore_then(name)
        .then_ignore(just(')'))
        .map(|name: &str| Segment::Macro(name.to_string()));

    let literal = any()
        .and_is(macro_ref.clone().not())
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|text: &str| Segment::Literal(text.to_string()));

    choice((macro_ref, literal)).repeated().collect::<Vec<_>>()
}

/// Split `input` into literal and macro segments.
pub fn segments(input: &str) -> Vec<Segment> {
    segment_parser()
        .parse(input)
        .into_result()
        .unwrap_or_else(|_| vec![Segment::Literal(input.to_string())])
}

/// Names of every `$(Name)` reference left in `input`, in order of
/// appearance, without duplicates.
pub fn unresolved_macros(input: &str) -> Vec<String> {
    if !input.contains("$(") {
        return Vec::new();
    }
    let mut names: Vec<String> = Vec::new();
    for segment in segments(input) {
        if let Segment::Macro(name) = segment {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// The `$(Name)` key under which a macro is stored.
pub fn macro_key(name: &str) -> String {
    format!("$({name})")
}

// ═══════════════════════════════════════════════════════════════════════════════
//  MacroEnvironment
// ═══════════════════════════════════════════════════════════════════════════════

/// Layered `$(Name)` → value table for one project/configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct MacroEnvironment {
    macros: HashMap<String, String>,
}

impl MacroEnvironment {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table for `project_dir` and the raw configuration
    /// identifier `configuration` (`"<Configuration>|<Platform>"`), overlaid
    /// with `env`.
    pub fn for_project(
        project_dir: &Path,
        configuration: &str,
        env: &HashMap<String, String>,
    ) -> Result<Self> {
        let id = ConfigurationId::parse(configuration)?;
        Ok(Self::for_configuration(project_dir, &id, env))
    }

    /// Same as [`for_project`](Self::for_project) with an already-parsed
    /// identifier.
    pub fn for_configuration(
        project_dir: &Path,
        configuration: &ConfigurationId,
        env: &HashMap<String, String>,
    ) -> Self {
        let mut table = Self::new();
        table.insert("ProjectDir", project_dir.to_string_lossy());
        table.insert("Configuration", configuration.configuration.as_str());
        table.insert("ConfigurationName", configuration.configuration.as_str());
        table.insert("Platform", configuration.platform.as_str());

        // Environment last: later writers win.
        for (name, value) in env {
            table.insert(name, value.as_str());
        }
        table
    }

    /// Register `$(name)` → `value`, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.macros.insert(macro_key(name), value.into());
    }

    /// Value registered for `$(name)`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(&macro_key(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Replace every `$(Name)` in `raw` that has a value.
    ///
    /// Substituted values are emitted verbatim, so the result does not
    /// depend on key order.  Unknown macros are left in place; see
    /// [`unresolved_macros`].
    pub fn expand(&self, raw: &str) -> String {
        if !raw.contains("$(") {
            return raw.to_string();
        }
        let mut expanded = String::with_capacity(raw.len());
        for segment in segments(raw) {
            match segment {
                Segment::Literal(text) => expanded.push_str(&text),
                Segment::Macro(name) => match self.get(&name) {
                    Some(value) => expanded.push_str(value),
                    None => expanded.push_str(&macro_key(&name)),
                },
            }
        }
        expanded
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
