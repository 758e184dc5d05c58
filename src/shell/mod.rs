#![warn(clippy::all, clippy::pedantic)]

pub mod integration;

pub use integration::{
    install_shell_integration, integration_script_path, is_installed, uninstall_shell_integration,
};
