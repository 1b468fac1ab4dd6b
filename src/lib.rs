pub mod compile_commands;
pub mod config;
pub mod envfile;
pub mod error;
pub mod macros;
pub mod vcxproj;

pub use compile_commands::{CompileCommand, CompileDb, CompileDbBuilder, Synthesis};
pub use config::{ConfigurationId, LanguageStandard, ResolvedConfig, find_config};
pub use error::{Error, Result};
pub use macros::MacroEnvironment;
pub use vcxproj::ProjectModel;
