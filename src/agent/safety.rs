//! Destructive-input denylist
//!
//! Input is lower-cased and scanned with a fixed set of patterns. This is a
//! coarse floor, not a classifier: anything matching is refused before
//! resolution. Command words match whole words only.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::AgentError;

/// Pattern name and source, matched against lower-cased input
type PatternTable = &'static [(&'static str, &'static str)];

/// Always refused
pub const DANGEROUS_PATTERNS: PatternTable = &[
    ("rm -rf /", r"\brm\s+-rf\s+/"),
    ("rm -rf ~", r"\brm\s+-rf\s+~"),
    ("dd if=", r"\bdd\s+if="),
    ("mkfs", r"\bmkfs\b"),
    ("fdisk", r"\bfdisk\b"),
    ("format <letter>:", r"\bformat\s+[a-z]:"),
    ("format /dev/", r"\bformat\s+/dev/"),
    (
        "format disk",
        r"\bformat\b(?:\s+\S+){0,3}?\s+(?:disk|disks|drive|drives|partition|partitions|volume|volumes|usb|ssd|hdd)\b",
    ),
    ("diskutil erasedisk", r"\bdiskutil\s+erase(?:disk|volume)\b"),
    ("shutdown", r"\bshutdown\b"),
    ("reboot", r"\breboot\b"),
    ("halt", r"\bhalt\b"),
    ("poweroff", r"\bpoweroff\b"),
];

/// Refused when guardrails are enabled
pub const GUARDRAIL_PATTERNS: PatternTable = &[
    (":(){ :|:& };:", r":\(\)\s*\{\s*:\|:&\s*\};\s*:"),
    ("chmod -r 777 /", r"\bchmod\s+-r\s+777\s+/"),
    ("chown -r", r"\bchown\s+-r\b"),
    ("> /dev/sd", r">\s*/dev/sd"),
    ("of=/dev/", r"\bof=/dev/"),
    ("kill -9 -1", r"\bkill\s+-9\s+-1\b"),
    ("userdel", r"\buserdel\b"),
    ("del /f /s /q", r"\bdel\s+/f\s+/s\s+/q\b"),
];

type Compiled = Vec<(&'static str, Regex)>;

fn compile(table: PatternTable) -> Compiled {
    table
        .iter()
        .filter_map(|&(name, source)| match Regex::new(source) {
            Ok(regex) => Some((name, regex)),
            Err(e) => {
                tracing::error!("[Agent] Bad denylist pattern '{}': {}", name, e);
                None
            }
        })
        .collect()
}

fn dangerous() -> &'static Compiled {
    static CELL: OnceLock<Compiled> = OnceLock::new();
    CELL.get_or_init(|| compile(DANGEROUS_PATTERNS))
}

fn guardrails() -> &'static Compiled {
    static CELL: OnceLock<Compiled> = OnceLock::new();
    CELL.get_or_init(|| compile(GUARDRAIL_PATTERNS))
}

/// Name of the first matching pattern, if any
pub fn find_dangerous_pattern(input: &str, guardrails_enabled: bool) -> Option<&'static str> {
    let lowered = input.to_lowercase();
    let extra: &[(&str, Regex)] = if guardrails_enabled { guardrails() } else { &[] };

    dangerous()
        .iter()
        .chain(extra.iter())
        .find(|(_, regex)| regex.is_match(&lowered))
        .map(|&(name, _)| name)
}

/// Reject input that matches the denylist
pub fn check_input(input: &str, guardrails: bool) -> Result<(), AgentError> {
    match find_dangerous_pattern(input, guardrails) {
        Some(pattern) => {
            tracing::warn!("[Agent] Blocked input matching '{}'", pattern);
            Err(AgentError::DangerousCommand)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_denylisted_input() {
        for input in [
            "rm -rf /",
            "please RM -RF / now",
            "sudo rm -rf /home/alice",
            "Shutdown the machine",
            "run dd if=/dev/zero of=/dev/sda",
            "mkfs.ext4 /dev/sdb1",
            "format C: quickly",
        ] {
            assert!(
                matches!(check_input(input, false), Err(AgentError::DangerousCommand)),
                "{} should be blocked",
                input
            );
        }
    }

    #[test]
    fn test_allows_ordinary_input() {
        for input in ["show me cpu usage", "system information", "clean up temp files", "list files"] {
            assert!(check_input(input, true).is_ok(), "{} should pass", input);
        }
    }

    #[test]
    fn test_blocks_disk_formatting() {
        for input in [
            "format /dev/sdb1",
            "format the drive",
            "format d:",
            "please format my usb disk",
            "Format partition 2",
        ] {
            assert!(find_dangerous_pattern(input, false).is_some(), "{} should be blocked", input);
        }
    }

    #[test]
    fn test_whole_words_only() {
        for input in [
            "asphalt driveway cost",
            "information about the system",
            "format this json",
            "show me the reboot_history.log file",
        ] {
            assert_eq!(find_dangerous_pattern(input, true), None, "{} should pass", input);
        }
        assert_eq!(find_dangerous_pattern("halt now", false), Some("halt"));
    }

    #[test]
    fn test_guardrail_patterns_toggle() {
        assert_eq!(find_dangerous_pattern("userdel bob", false), None);
        assert_eq!(find_dangerous_pattern("userdel bob", true), Some("userdel"));
        assert_eq!(find_dangerous_pattern("reboot", false), Some("reboot"));
    }
}
