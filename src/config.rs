//! Configuration matching: pick the settings block for a requested
//! `Configuration|Platform` pair and expand it into a [`ResolvedConfig`].

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::macros::{self, MacroEnvironment};
use crate::vcxproj::ProjectModel;

// ═══════════════════════════════════════════════════════════════════════════════
//  ConfigurationId
// ═══════════════════════════════════════════════════════════════════════════════

/// A `"<Configuration>|<Platform>"` identifier, e.g. `Debug|x64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigurationId {
    pub configuration: String,
    pub platform: String,
}

impl ConfigurationId {
    /// Split `id` on its first `|`.
    ///
    /// Fails with [`Error::MalformedConfiguration`] when there is no `|`.
    pub fn parse(id: &str) -> Result<Self> {
        let (configuration, platform) = id
            .split_once('|')
            .ok_or_else(|| Error::MalformedConfiguration(id.to_string()))?;
        Ok(Self {
            configuration: configuration.to_string(),
            platform: platform.to_string(),
        })
    }
}

impl fmt::Display for ConfigurationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.configuration, self.platform)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  LanguageStandard
// ═══════════════════════════════════════════════════════════════════════════════

/// C++ language standard selected by `<LanguageStandard>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageStandard {
    Cpp11,
    Cpp14,
    Cpp17,
    #[default]
    Cpp20,
}

impl LanguageStandard {
    /// Map the raw MSBuild token (case-sensitive).  `stdcpplatest`, empty
    /// and unknown values all select C++20.
    pub fn from_token(token: &str) -> Self {
        match token {
            "stdcpp11" => Self::Cpp11,
            "stdcpp14" => Self::Cpp14,
            "stdcpp17" => Self::Cpp17,
            _ => Self::Cpp20,
        }
    }

    /// The clang-cl compiler flag.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Cpp11 => "/std:c++11",
            Self::Cpp14 => "/std:c++14",
            Self::Cpp17 => "/std:c++17",
            Self::Cpp20 => "/std:c++20",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ResolvedConfig
// ═══════════════════════════════════════════════════════════════════════════════

/// Macro-expanded compiler settings of one project for one configuration.
///
/// Include and definition strings are still `;`-separated and may contain
/// inherit placeholders such as `%(AdditionalIncludeDirectories)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub include_directories: String,
    pub preprocessor_definitions: String,
    pub standard: LanguageStandard,
    /// Macro names that survived expansion, left verbatim in the strings above.
    pub unresolved: Vec<String>,
}

impl ResolvedConfig {
    pub fn standard_flag(&self) -> &'static str {
        self.standard.flag()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Matching
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolve `project`'s compiler settings for `configuration`
/// (`"Debug|x64"`), expanding macros against the intrinsics and `env`.
///
/// 1. `configuration` must contain `|` ([`Error::MalformedConfiguration`]).
/// 2. The first item group declaring configurations must exist
///    ([`Error::ConfigurationListNotFound`]) and contain `configuration`
///    ([`Error::ConfigurationNotFound`]).
/// 3. The first `ItemDefinitionGroup` whose condition contains
///    `configuration` as a substring supplies the settings; none matching
///    is [`Error::ConfigurationNotFound`] as well.
pub fn find_config(
    project: &ProjectModel,
    configuration: &str,
    env: &HashMap<String, String>,
) -> Result<ResolvedConfig> {
    let id = ConfigurationId::parse(configuration)?;

    let declared = project.configurations();
    if declared.is_empty() {
        return Err(Error::ConfigurationListNotFound {
            project: project.path.clone(),
        });
    }

    let not_found = || Error::ConfigurationNotFound {
        project: project.path.clone(),
        configuration: configuration.to_string(),
    };

    if !declared.iter().any(|pc| pc.include == configuration) {
        return Err(not_found());
    }

    let settings = project.settings_for(configuration).ok_or_else(not_found)?;
    let table = MacroEnvironment::for_configuration(&project.directory, &id, env);

    let include_directories = table.expand(&settings.additional_include_directories);
    let preprocessor_definitions = table.expand(&settings.preprocessor_definitions);

    let mut unresolved = macros::unresolved_macros(&include_directories);
    for name in macros::unresolved_macros(&preprocessor_definitions) {
        if !unresolved.contains(&name) {
            unresolved.push(name);
        }
    }
    if !unresolved.is_empty() {
        tracing::warn!(
            "{}: unresolved macros for {configuration}: {}",
            project.path.display(),
            unresolved.join(", ")
        );
    }

    tracing::debug!(
        "{}: matched {configuration}",
        project.path.display()
    );

    Ok(ResolvedConfig {
        include_directories,
        preprocessor_definitions,
        standard: LanguageStandard::from_token(&settings.language_standard),
        unresolved,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"<Project>
  <ItemGroup Label="ProjectConfigurations">
    <ProjectConfiguration Include="Debug|x64">
      <Configuration>Debug</Configuration>
      <Platform>x64</Platform>
    </ProjectConfiguration>
    <ProjectConfiguration Include="Release|x64">
      <Configuration>Release</Configuration>
      <Platform>x64</Platform>
    </ProjectConfiguration>
  </ItemGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
    <ClCompile>
      <AdditionalIncludeDirectories>C:\inc;$(ProjectDir)\include</AdditionalIncludeDirectories>
      <PreprocessorDefinitions>DEBUG;_WIN32</PreprocessorDefinitions>
      <LanguageStandard>stdcpp17</LanguageStandard>
      <ConformanceMode>true</ConformanceMode>
    </ClCompile>
  </ItemDefinitionGroup>
</Project>"#;

    fn scenario() -> ProjectModel {
        ProjectModel::parse(SCENARIO, "/work/app/app.vcxproj").unwrap()
    }

    // ── example.vcxproj ──────────────────────────────────────────────────

    #[test]
    fn example_every_declared_configuration_resolves() {
        let project = ProjectModel::load("example.vcxproj").unwrap();
        for pc in project.configurations() {
            let result = find_config(&project, &pc.include, &HashMap::new());
            assert!(result.is_ok(), "{}: {}", pc.include, result.unwrap_err());
        }
    }

    #[test]
    fn example_debug_x64() {
        let project = ProjectModel::load("example.vcxproj").unwrap();
        let resolved = find_config(&project, "Debug|x64", &HashMap::new()).unwrap();
        let dir = project.directory.display().to_string();
        assert_eq!(
            resolved.include_directories,
            format!(r"%(AdditionalIncludeDirectories);{dir}\include;{dir}\third_party\x64\Debug")
        );
        assert_eq!(
            resolved.preprocessor_definitions,
            "_DEBUG;_CONSOLE;%(PreprocessorDefinitions)"
        );
        assert_eq!(resolved.standard_flag(), "/std:c++17");
    }

    #[test]
    fn example_release_x64_uses_latest() {
        let project = ProjectModel::load("example.vcxproj").unwrap();
        let resolved = find_config(&project, "Release|x64", &HashMap::new()).unwrap();
        assert_eq!(resolved.standard, LanguageStandard::Cpp20);
        assert_eq!(resolved.preprocessor_definitions, "NDEBUG;_CONSOLE");
    }

    // ── ConfigurationId ──────────────────────────────────────────────────

    #[test]
    fn configuration_id_round_trips_display() {
        let id = ConfigurationId::parse("Debug|x64").unwrap();
        assert_eq!(id.configuration, "Debug");
        assert_eq!(id.platform, "x64");
        assert_eq!(id.to_string(), "Debug|x64");
    }

    #[test]
    fn configuration_id_without_separator() {
        let result = ConfigurationId::parse("DebugOnly");
        assert!(matches!(result, Err(Error::MalformedConfiguration(id)) if id == "DebugOnly"));
    }

    // ── LanguageStandard ─────────────────────────────────────────────────

    #[test]
    fn language_standard_mapping() {
        let cases = [
            ("stdcpplatest", "/std:c++20"),
            ("stdcpp20", "/std:c++20"),
            ("stdcpp17", "/std:c++17"),
            ("stdcpp14", "/std:c++14"),
            ("stdcpp11", "/std:c++11"),
            ("", "/std:c++20"),
            ("Default", "/std:c++20"),
            ("StdCpp17", "/std:c++20"),
        ];
        for (token, flag) in cases {
            assert_eq!(LanguageStandard::from_token(token).flag(), flag, "token {token:?}");
        }
    }

    // ── find_config ──────────────────────────────────────────────────────

    #[test]
    fn resolves_declared_configuration() {
        let project = scenario();
        let resolved = find_config(&project, "Debug|x64", &HashMap::new()).unwrap();
        let expected_include = format!(r"C:\inc;{}\include", project.directory.display());
        assert_eq!(resolved.include_directories, expected_include);
        assert_eq!(resolved.preprocessor_definitions, "DEBUG;_WIN32");
        assert_eq!(resolved.standard, LanguageStandard::Cpp17);
        assert_eq!(resolved.standard_flag(), "/std:c++17");
        assert!(resolved.unresolved.is_empty());
    }

    #[test]
    fn declared_but_unmatched_configuration() {
        let result = find_config(&scenario(), "Release|x64", &HashMap::new());
        match result {
            Err(Error::ConfigurationNotFound { configuration, .. }) => {
                assert_eq!(configuration, "Release|x64")
            }
            other => panic!("expected ConfigurationNotFound, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_configuration() {
        for id in ["Debug|Win32", "Profile|x64", "Debug|x64|extra"] {
            let result = find_config(&scenario(), id, &HashMap::new());
            assert!(
                matches!(result, Err(Error::ConfigurationNotFound { .. })),
                "{id}: {result:?}"
            );
        }
    }

    #[test]
    fn malformed_identifier() {
        let result = find_config(&scenario(), "DebugOnly", &HashMap::new());
        assert!(matches!(result, Err(Error::MalformedConfiguration(id)) if id == "DebugOnly"));
    }

    #[test]
    fn malformed_identifier_that_is_declared() {
        let source = r#"<Project>
  <ItemGroup><ProjectConfiguration Include="DebugOnly" /></ItemGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)'=='DebugOnly'">
    <ClCompile />
  </ItemDefinitionGroup>
</Project>"#;
        let project = ProjectModel::parse(source, "p.vcxproj").unwrap();
        let result = find_config(&project, "DebugOnly", &HashMap::new());
        assert!(matches!(result, Err(Error::MalformedConfiguration(_))));
    }

    #[test]
    fn no_configuration_list() {
        let project = ProjectModel::parse(
            r#"<Project><ItemGroup><ClCompile Include="a.cpp" /></ItemGroup></Project>"#,
            "p.vcxproj",
        )
        .unwrap();
        let result = find_config(&project, "Debug|x64", &HashMap::new());
        assert!(matches!(result, Err(Error::ConfigurationListNotFound { .. })));
    }

    #[test]
    fn environment_and_unresolved_macros() {
        let source = r#"<Project>
  <ItemGroup><ProjectConfiguration Include="Debug|x64" /></ItemGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
    <ClCompile>
      <AdditionalIncludeDirectories>$(BOOST_ROOT);$(VcpkgRoot)\$(Platform)</AdditionalIncludeDirectories>
      <PreprocessorDefinitions>CFG_$(Configuration);$(ExtraDefine)</PreprocessorDefinitions>
    </ClCompile>
  </ItemDefinitionGroup>
</Project>"#;
        let project = ProjectModel::parse(source, "/p/p.vcxproj").unwrap();
        let env = HashMap::from([("BOOST_ROOT".to_string(), r"C:\boost".to_string())]);
        let resolved = find_config(&project, "Debug|x64", &env).unwrap();
        assert_eq!(resolved.include_directories, r"C:\boost;$(VcpkgRoot)\x64");
        assert_eq!(resolved.preprocessor_definitions, "CFG_Debug;$(ExtraDefine)");
        assert_eq!(resolved.unresolved, ["VcpkgRoot", "ExtraDefine"]);
        assert_eq!(resolved.standard, LanguageStandard::Cpp20);
    }

    #[test]
    fn first_matching_settings_block_wins() {
        let source = r#"<Project>
  <ItemGroup><ProjectConfiguration Include="Debug|x64" /></ItemGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
    <ClCompile><PreprocessorDefinitions>FIRST</PreprocessorDefinitions></ClCompile>
  </ItemDefinitionGroup>
  <ItemDefinitionGroup Condition=" '$(Configuration)|$(Platform)' == 'Debug|x64' ">
    <ClCompile><PreprocessorDefinitions>SECOND</PreprocessorDefinitions></ClCompile>
  </ItemDefinitionGroup>
</Project>"#;
        let project = ProjectModel::parse(source, "p.vcxproj").unwrap();
        let resolved = find_config(&project, "Debug|x64", &HashMap::new()).unwrap();
        assert_eq!(resolved.preprocessor_definitions, "FIRST");
    }
}
