//! Error types for project resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for project resolution.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading projects and synthesizing compile commands.
#[derive(Error, Debug)]
pub enum Error {
    /// The project file could not be read.
    #[error("{}: IO Error: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The project file is not well-formed XML.
    #[error("{}: XML Error: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    /// No item group declares any `ProjectConfiguration`.
    #[error("{}: no ProjectConfiguration declared", project.display())]
    ConfigurationListNotFound { project: PathBuf },

    /// The configuration is not declared, or has no settings block.
    #[error("{}: configuration '{configuration}' not found", project.display())]
    ConfigurationNotFound {
        project: PathBuf,
        configuration: String,
    },

    /// The configuration identifier lacks the `|` separator.
    #[error("malformed configuration '{0}', expected '<Configuration>|<Platform>'")]
    MalformedConfiguration(String),

    /// The compile database could not be rendered as JSON.
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The project file this error refers to, when there is one.
    pub fn project(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. } | Self::Parse { path, .. } => Some(path),
            Self::ConfigurationListNotFound { project }
            | Self::ConfigurationNotFound { project, .. } => Some(project),
            Self::MalformedConfiguration(_) | Self::Json(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_project_and_configuration() {
        let err = Error::ConfigurationNotFound {
            project: PathBuf::from("app.vcxproj"),
            configuration: "Release|x64".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("app.vcxproj"), "{msg}");
        assert!(msg.contains("Release|x64"), "{msg}");
        assert_eq!(err.project(), Some(std::path::Path::new("app.vcxproj")));
    }

    #[test]
    fn malformed_configuration_has_no_project() {
        let err = Error::MalformedConfiguration("DebugOnly".into());
        assert!(err.project().is_none());
        assert!(err.to_string().contains("DebugOnly"));
    }
}
