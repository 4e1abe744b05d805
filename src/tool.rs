//! Tool identity, binary resolution, and launch-command construction
//!
//! Each variant owns its command-construction strategy; status markers for
//! each variant live in the status module. Adding a tool means adding a
//! variant and one arm in each table.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The tool a shortcut launches inside its session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Claude,
    Opencode,
    Gemini,
    Codex,
    /// User-supplied command line; cli_options holds the whole invocation
    Custom,
    /// Plain shell, no command injected
    Shell,
}

impl Tool {
    /// String representation for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Claude => "claude",
            Tool::Opencode => "opencode",
            Tool::Gemini => "gemini",
            Tool::Codex => "codex",
            Tool::Custom => "custom",
            Tool::Shell => "shell",
        }
    }

    /// Parse from a stored string; unknown values fall back to shell
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "claude" => Tool::Claude,
            "opencode" => Tool::Opencode,
            "gemini" => Tool::Gemini,
            "codex" => Tool::Codex,
            "custom" => Tool::Custom,
            _ => Tool::Shell,
        }
    }

    /// Display name for list output
    pub fn display_name(&self) -> &'static str {
        match self {
            Tool::Claude => "Claude Code",
            Tool::Opencode => "OpenCode",
            Tool::Gemini => "Gemini CLI",
            Tool::Codex => "Codex CLI",
            Tool::Custom => "Custom",
            Tool::Shell => "Shell",
        }
    }

    /// The binary this tool invokes, if it has a fixed one
    pub fn binary_name(&self) -> Option<&'static str> {
        match self {
            Tool::Claude => Some("claude"),
            Tool::Opencode => Some("opencode"),
            Tool::Gemini => Some("gemini"),
            Tool::Codex => Some("codex"),
            Tool::Custom | Tool::Shell => None,
        }
    }

    /// Build the command injected into a fresh session.
    ///
    /// Returns None for a plain shell (the multiplexer starts its default
    /// shell). `skip_permissions` only affects claude.
    pub fn launch_command(
        &self,
        cli_options: &str,
        skip_permissions: bool,
        paths: &ToolPaths,
    ) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();

        match self {
            Tool::Shell => return None,
            Tool::Custom => {
                let trimmed = cli_options.trim();
                if trimmed.is_empty() {
                    return None;
                }
                return Some(trimmed.to_string());
            }
            tool => {
                // For the agent tools the storage string is the binary name
                let resolved = paths
                    .get(*tool)
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|| tool.as_str().to_string());
                parts.push(resolved);
            }
        }

        if *self == Tool::Claude && skip_permissions {
            parts.push("--dangerously-skip-permissions".to_string());
        }

        let trimmed = cli_options.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }

        Some(parts.join(" "))
    }

    /// All variants, in display order
    pub fn all() -> &'static [Tool] {
        &[
            Tool::Claude,
            Tool::Opencode,
            Tool::Gemini,
            Tool::Codex,
            Tool::Custom,
            Tool::Shell,
        ]
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Configured binary path overrides from config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolPaths {
    pub claude: Option<PathBuf>,
    pub opencode: Option<PathBuf>,
    pub gemini: Option<PathBuf>,
    pub codex: Option<PathBuf>,
}

impl ToolPaths {
    /// Get the configured path for a tool
    pub fn get(&self, tool: Tool) -> Option<&PathBuf> {
        match tool {
            Tool::Claude => self.claude.as_ref(),
            Tool::Opencode => self.opencode.as_ref(),
            Tool::Gemini => self.gemini.as_ref(),
            Tool::Codex => self.codex.as_ref(),
            Tool::Custom | Tool::Shell => None,
        }
    }

    /// Resolve the executable a tool would run: the configured override when
    /// it points at a real executable, otherwise a PATH lookup.
    pub fn resolve(&self, tool: Tool) -> Option<PathBuf> {
        if let Some(configured) = self.get(tool) {
            if is_executable(configured) {
                return Some(configured.clone());
            }
            tracing::warn!(
                tool = tool.as_str(),
                path = %configured.display(),
                "Configured tool path is not executable, falling back to PATH"
            );
        }
        tool.binary_name().and_then(|b| which::which(b).ok())
    }
}

/// Check if a path points to a valid executable
fn is_executable(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_parse_round_trip() {
        for tool in Tool::all() {
            assert_eq!(Tool::parse(tool.as_str()), *tool);
        }
    }

    #[test]
    fn test_parse_unknown_falls_back_to_shell() {
        assert_eq!(Tool::parse("emacs"), Tool::Shell);
    }

    #[test]
    fn test_shell_has_no_command() {
        let cmd = Tool::Shell.launch_command("", false, &ToolPaths::default());
        assert_eq!(cmd, None);
    }

    #[test]
    fn test_claude_command_with_skip_permissions() {
        let cmd = Tool::Claude
            .launch_command("--model opus", true, &ToolPaths::default())
            .unwrap();
        assert_eq!(cmd, "claude --dangerously-skip-permissions --model opus");
    }

    #[test]
    fn test_skip_permissions_ignored_for_other_tools() {
        let cmd = Tool::Codex
            .launch_command("", true, &ToolPaths::default())
            .unwrap();
        assert_eq!(cmd, "codex");
    }

    #[test]
    fn test_custom_uses_cli_options_verbatim() {
        let cmd = Tool::Custom
            .launch_command("htop -d 5", false, &ToolPaths::default())
            .unwrap();
        assert_eq!(cmd, "htop -d 5");
    }

    #[test]
    fn test_custom_empty_falls_back_to_shell() {
        assert_eq!(
            Tool::Custom.launch_command("  ", false, &ToolPaths::default()),
            None
        );
    }

    #[test]
    fn test_configured_path_used_in_command() {
        let paths = ToolPaths {
            claude: Some(PathBuf::from("/opt/bin/claude")),
            ..Default::default()
        };
        let cmd = Tool::Claude.launch_command("", false, &paths).unwrap();
        assert_eq!(cmd, "/opt/bin/claude");
    }
}
