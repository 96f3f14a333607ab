// THEORY:
// The downstream encoder and validator are external Node programs, treated as
// black boxes behind a fixed CLI contract. This module builds their exact
// argument vectors and runs them one-shot, capturing whatever they printed.
// The textual contract is deliberately forgiving: stdout if non-empty, else
// stderr, else a literal placeholder, always trimmed. Tool output is advisory
// display text for the user, never parsed.
//
// The exit code is the one hardened part. A tool that chatters on stderr and
// exits non-zero looks identical to a success in the text alone, so the
// outcome carries the raw exit code as its own field (`None` when the
// process never spawned). Spawn failures are folded into the same outcome
// shape as any other failed run; this module never returns an error.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Reported when an invocation produced nothing on either stream.
pub const NO_OUTPUT_PLACEHOLDER: &str = "(no output)";

/// The result of one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// The exact argument vector that was executed, program first.
    pub command: Vec<String>,
    /// Trimmed stdout if non-empty, else trimmed stderr, else the
    /// placeholder.
    pub output: String,
    /// Raw process exit code. `None` when the process never spawned or was
    /// terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutcome {
    /// True only for a clean zero exit.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Builds the encode invocation: visual PNG and target artifact as
/// positionals, groups and rules paths flagged.
pub fn encode_command(
    node_path: &str,
    encode_script: &str,
    visual_path: &Path,
    encoded_path: &Path,
    groups_path: &Path,
    rules_path: &Path,
) -> Vec<String> {
    vec![
        node_path.to_string(),
        encode_script.to_string(),
        visual_path.display().to_string(),
        encoded_path.display().to_string(),
        "--groups".to_string(),
        groups_path.display().to_string(),
        "--rules".to_string(),
        rules_path.display().to_string(),
    ]
}

/// Builds the validate invocation: the encoded artifact as the only
/// positional.
pub fn validate_command(
    node_path: &str,
    validate_script: &str,
    encoded_path: &Path,
) -> Vec<String> {
    vec![
        node_path.to_string(),
        validate_script.to_string(),
        encoded_path.display().to_string(),
    ]
}

/// Runs one command to completion and captures its streams.
///
/// Execution problems are never raised: a missing executable or a non-zero
/// exit is reported through the outcome's text and exit code, exactly like
/// a tool that ran and complained on stderr.
pub async fn run_tool(command: &[String]) -> ToolOutcome {
    let Some((program, args)) = command.split_first() else {
        return ToolOutcome {
            command: Vec::new(),
            output: NO_OUTPUT_PLACEHOLDER.to_string(),
            exit_code: None,
        };
    };

    debug!("running external tool: {} {:?}", program, args);
    match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
    {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code();
            if exit_code != Some(0) {
                warn!("external tool {} exited with {:?}", program, exit_code);
            }
            ToolOutcome {
                command: command.to_vec(),
                output: pick_output(&stdout, &stderr),
                exit_code,
            }
        }
        Err(error) => {
            warn!("failed to spawn {}: {}", program, error);
            ToolOutcome {
                command: command.to_vec(),
                output: format!("failed to run {}: {}", program, error),
                exit_code: None,
            }
        }
    }
}

fn pick_output(stdout: &str, stderr: &str) -> String {
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    NO_OUTPUT_PLACEHOLDER.to_string()
}
