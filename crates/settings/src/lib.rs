//! Configuration layer for TexDesk workspaces.
//! TexDesk 工作區的設定層。

pub mod config;

pub use config::{
    CompilerConfig, ConfigError, ConfigStore, DeskConfig, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    TEMPLATES_DIR_NAME,
};
