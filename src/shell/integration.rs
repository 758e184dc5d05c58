#![warn(clippy::all, clippy::pedantic)]

//! Installation of the zsh side of the tool: the hook that records exit
//! codes and the `clean-history*` shell functions.

use anyhow::Result;
use std::{fs, io::Write, path::Path, path::PathBuf};

/// The generated zsh integration script.
///
/// `preexec` captures the start timestamp so it lines up with the
/// EXTENDED_HISTORY timestamp zsh writes; `precmd` then appends
/// `<timestamp>:<exit_code>` to the side-file once the command finishes.
const INTEGRATION_SCRIPT: &str = r###"# Clean History integration
autoload -Uz add-zsh-hook

typeset -g __clean_history_ts=""

function __clean_history_preexec() {
    # EXTENDED_HISTORY stamps the entry when the command starts.
    __clean_history_ts=$EPOCHSECONDS
}

function __clean_history_precmd() {
    local exit_code=$?
    [[ -n "$__clean_history_ts" ]] || return 0
    echo "${__clean_history_ts}:${exit_code}" >> "${ZSH_CLEAN_HISTORY_EXIT_FILE:-$HOME/.zsh_history_exits}"
    __clean_history_ts=""
}

add-zsh-hook preexec __clean_history_preexec
add-zsh-hook precmd __clean_history_precmd

function clean-history() {
    command clean_history "$@"
}

function clean-history-stats() {
    command clean_history stats "$@"
}

function clean-history-info() {
    command clean_history info
}

function __clean_history_auto_clean() {
    if [[ "${ZSH_CLEAN_HISTORY_AUTO_CLEAN:-0}" == "1" ]]; then
        command clean_history --quiet
    fi
}
add-zsh-hook zshexit __clean_history_auto_clean
"###;

fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(".config").join("clean_history"))
}

/// Where the integration script lives.
///
/// # Errors
///
/// Returns an error if the home directory cannot be located.
pub fn integration_script_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("shell_integration.zsh"))
}

/// Whether the integration script is present on disk.
#[must_use]
pub fn is_installed() -> bool {
    integration_script_path().is_ok_and(|path| path.exists())
}

/// Installs the zsh integration: writes the script and sources it from
/// `~/.zshrc`.
///
/// # Errors
///
/// Returns an error on file system or permission problems.
pub fn install_shell_integration() -> Result<()> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    let config_dir = config_dir()?;
    let integration_path = config_dir.join("shell_integration.zsh");
    let zshrc_path = home.join(".zshrc");

    fs::create_dir_all(&config_dir)?;
    write_integration_script(&integration_path)?;
    add_source_directive(&zshrc_path, &integration_path)?;

    println!("Clean History shell integration installed successfully.");
    println!("Please restart your shell or run 'source ~/.zshrc' to activate it.");

    Ok(())
}

/// Writes the shell integration script to the specified path.
fn write_integration_script(integration_path: &Path) -> Result<()> {
    fs::write(integration_path, INTEGRATION_SCRIPT)?;
    Ok(())
}

/// Adds a source directive to the shell configuration file if not
/// already present.
fn add_source_directive(zshrc_path: &Path, integration_path: &Path) -> Result<()> {
    let integration_path_str = integration_path.to_string_lossy();
    let source_line = format!("source {integration_path_str}");

    if zshrc_path.exists() {
        let zshrc_content = fs::read_to_string(zshrc_path)?;
        if zshrc_content.contains(&source_line) || zshrc_content.contains(&*integration_path_str) {
            return Ok(());
        }
    }

    let mut file = fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(zshrc_path)?;

    writeln!(file, "\n# Clean History shell integration")?;
    writeln!(file, "{source_line}")?;

    Ok(())
}

/// Uninstalls the zsh integration: removes the script and the source
/// line, and the config directory when nothing else lives in it.
///
/// # Errors
///
/// Returns an error on file system or permission problems.
pub fn uninstall_shell_integration() -> Result<()> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    let config_dir = config_dir()?;
    let integration_path = config_dir.join("shell_integration.zsh");
    let zshrc_path = home.join(".zshrc");

    if integration_path.exists() {
        fs::remove_file(&integration_path)?;
    }

    if zshrc_path.exists() {
        remove_source_directive(&zshrc_path, &integration_path)?;
    }

    if config_dir.exists() {
        if let Ok(entries) = fs::read_dir(&config_dir) {
            if entries.count() == 0 {
                fs::remove_dir(&config_dir)?;
            }
        }
    }

    println!("Clean History shell integration removed.");

    Ok(())
}

fn remove_source_directive(zshrc_path: &Path, integration_path: &Path) -> Result<()> {
    let content = fs::read_to_string(zshrc_path)?;
    let integration_path_str = integration_path.to_string_lossy();
    let new_content = content
        .lines()
        .filter(|line| {
            !line.contains("Clean History shell integration")
                && !line.contains(&*integration_path_str)
        })
        .collect::<Vec<_>>()
        .join("\n");

    fs::write(zshrc_path, new_content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn script_registers_hooks_and_functions() {
        assert!(INTEGRATION_SCRIPT.contains("add-zsh-hook preexec __clean_history_preexec"));
        assert!(INTEGRATION_SCRIPT.contains("add-zsh-hook precmd __clean_history_precmd"));
        assert!(INTEGRATION_SCRIPT.contains("add-zsh-hook zshexit __clean_history_auto_clean"));
        assert!(INTEGRATION_SCRIPT.contains("function clean-history()"));
        assert!(INTEGRATION_SCRIPT.contains("function clean-history-stats()"));
        assert!(INTEGRATION_SCRIPT.contains("function clean-history-info()"));
        assert!(INTEGRATION_SCRIPT.contains("ZSH_CLEAN_HISTORY_EXIT_FILE"));
        assert!(INTEGRATION_SCRIPT.contains("ZSH_CLEAN_HISTORY_AUTO_CLEAN"));
    }

    #[test]
    fn source_directive_is_idempotent() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let zshrc = temp_dir.path().join(".zshrc");
        let script = temp_dir.path().join("shell_integration.zsh");

        add_source_directive(&zshrc, &script)?;
        add_source_directive(&zshrc, &script)?;

        let content = fs::read_to_string(&zshrc)?;
        let source_lines = content
            .lines()
            .filter(|line| line.starts_with("source "))
            .count();
        assert_eq!(source_lines, 1);
        Ok(())
    }

    #[test]
    fn removing_source_directive_keeps_other_lines() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let zshrc = temp_dir.path().join(".zshrc");
        let script = temp_dir.path().join("shell_integration.zsh");

        fs::write(&zshrc, "export EDITOR=vim\n")?;
        add_source_directive(&zshrc, &script)?;
        remove_source_directive(&zshrc, &script)?;

        let content = fs::read_to_string(&zshrc)?;
        assert!(content.contains("export EDITOR=vim"));
        assert!(!content.contains("source "));
        Ok(())
    }
}
