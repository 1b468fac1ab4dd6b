//! Parse environment dumps into a variable map.
//!
//! An environment dump is the output of `set` (cmd.exe) or `env` (POSIX
//! shells): one `NAME=VALUE` line per variable.  Capturing a developer
//! prompt this way (e.g. `vcvars64.bat && set > env.txt`) lets callers
//! replay the variables that `.vcxproj` files reference as `$(VCInstallDir)`,
//! `$(WindowsSdkDir)` etc. without running inside that prompt.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Split a single `NAME=VALUE` entry on its **first** `=`.
///
/// Values keep any further `=` characters verbatim.  Returns `None` for
/// entries without `=` or with an empty name.
pub fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let (name, value) = entry.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

/// Case-insensitive ASCII prefix check that never splits a UTF-8 character.
fn has_keyword(line: &str, keyword: &str) -> bool {
    line.get(..keyword.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
}

/// Parse the **contents** of an environment dump into a variable map.
///
/// Blank lines and comment lines (`#`, `::`, `REM`) are skipped, as is an
/// optional leading `set ` keyword (case-insensitive).  Lines without `=`
/// are ignored.  Later lines override earlier ones.
///
/// # Example
/// ```
/// let vars = vcxproj_compdb::envfile::parse_env_dump(
///     "VCToolsVersion=14.38.33130\nCL=/DFOO=1\n",
/// );
/// assert_eq!(vars["VCToolsVersion"], "14.38.33130");
/// assert_eq!(vars["CL"], "/DFOO=1");
/// ```
pub fn parse_env_dump(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("::") {
            continue;
        }
        if has_keyword(trimmed, "rem ") {
            continue;
        }

        let rest = trimmed.strip_prefix('@').unwrap_or(trimmed);
        let rest = if has_keyword(rest, "set ") {
            rest[4..].trim_start()
        } else {
            rest
        };

        let Some((name, value)) = split_entry(rest.trim_end_matches(['\r', '\n'])) else {
            continue;
        };
        vars.insert(name.to_string(), value.to_string());
    }

    vars
}

/// Parse an environment dump from disk into a variable map.
pub fn parse_env_file(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_env_dump(&content))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
