//! Keyword rule ladder
//!
//! Input is lower-cased and split into words; the first rung whose words
//! appear wins. The same input always yields the same intent.

/// Outcome of rule-based classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Dispatch one tool action
    Call {
        tool: &'static str,
        action: &'static str,
    },
    GrantPermission,
    RevokePermission,
    ConfigHelp,
    Greeting,
    Unknown,
}

impl Intent {
    fn call(tool: &'static str, action: &'static str) -> Self {
        Intent::Call { tool, action }
    }
}

const FILE_TOOL: &str = "file_tool";
const SYSTEM_INFO_TOOL: &str = "system_info_tool";

const PERMISSION_WORDS: &[&str] = &["permission", "permissions"];
const CONFIG_WORDS: &[&str] = &["config", "configuration", "setting", "settings"];
const FILE_WORDS: &[&str] = &[
    "file", "files", "list", "directory", "folder", "clean", "cleanup", "organize",
];
const CPU_WORDS: &[&str] = &["cpu", "processor"];
const MEMORY_WORDS: &[&str] = &["memory", "ram"];
const DISK_WORDS: &[&str] = &["disk", "storage", "space"];
const PROCESS_WORDS: &[&str] = &["process", "processes", "running", "kill"];
const NETWORK_WORDS: &[&str] = &["network", "internet", "connection", "ping"];
const BATTERY_WORDS: &[&str] = &["battery", "power"];
const UPTIME_WORDS: &[&str] = &["uptime", "boot"];
const PERFORMANCE_WORDS: &[&str] = &["performance", "metrics", "load"];
const HARDWARE_WORDS: &[&str] = &["hardware", "specs"];
const SYSTEM_WORDS: &[&str] = &["system", "info", "information", "status", "overview"];
const GREETING_WORDS: &[&str] = &["hello", "hi", "hey", "help"];

/// Lower-cased words of the input
pub fn tokenize(input: &str) -> Vec<String> {
    input
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Classify input against the ordered ladder
pub fn classify(input: &str) -> Intent {
    let words = tokenize(input);
    let has = |word: &str| words.iter().any(|w| w == word);
    let any = |group: &[&str]| group.iter().any(|word| has(word));

    if has("grant") && any(PERMISSION_WORDS) {
        return Intent::GrantPermission;
    }
    if has("revoke") && any(PERMISSION_WORDS) {
        return Intent::RevokePermission;
    }
    if any(CONFIG_WORDS) {
        return Intent::ConfigHelp;
    }

    if any(FILE_WORDS) {
        let action = if has("clean") || has("cleanup") {
            "cleanup"
        } else if has("organize") {
            "organize"
        } else if has("search") || has("find") {
            "search"
        } else {
            "list"
        };
        return Intent::call(FILE_TOOL, action);
    }

    let ladder: [(&[&str], &'static str); 10] = [
        (CPU_WORDS, "cpu"),
        (MEMORY_WORDS, "memory"),
        (DISK_WORDS, "disk"),
        (PROCESS_WORDS, "processes"),
        (NETWORK_WORDS, "network"),
        (BATTERY_WORDS, "battery"),
        (UPTIME_WORDS, "uptime"),
        (PERFORMANCE_WORDS, "performance"),
        (HARDWARE_WORDS, "hardware"),
        (SYSTEM_WORDS, "overview"),
    ];
    if let Some(&(_, action)) = ladder.iter().find(|entry| any(entry.0)) {
        return Intent::call(SYSTEM_INFO_TOOL, action);
    }

    if any(GREETING_WORDS) {
        return Intent::Greeting;
    }
    Intent::Unknown
}

/// Target of a grant/revoke sub-command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionTarget {
    Named(String),
    /// The command had no target
    Missing,
    /// The input mentions the keywords but does not follow the grammar
    Malformed,
}

/// Parse `<verb> permission[s] [<preposition>] <target>` or
/// `<verb> permission[s]: <target>`
///
/// The target is the whole remainder, so multi-word names survive.
pub fn parse_permission_command(input: &str, verb: &str, prepositions: &[&str]) -> PermissionTarget {
    let text = input
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'))
        .to_lowercase();

    let Some(rest) = text.strip_prefix(verb) else {
        return PermissionTarget::Malformed;
    };
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return PermissionTarget::Malformed;
    }

    let rest = rest.trim_start();
    let Some(rest) = rest
        .strip_prefix("permissions")
        .or_else(|| rest.strip_prefix("permission"))
    else {
        return PermissionTarget::Malformed;
    };
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) && !rest.starts_with(':') {
        return PermissionTarget::Malformed;
    }

    let rest = rest.trim_start();
    let target = match rest.strip_prefix(':') {
        Some(after) => after.trim(),
        None => match rest.split_once(char::is_whitespace) {
            Some((first, tail)) if prepositions.contains(&first) => tail.trim(),
            _ if prepositions.contains(&rest) => "",
            _ => rest,
        },
    };

    if target.is_empty() {
        PermissionTarget::Missing
    } else {
        PermissionTarget::Named(target.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRANT: &[&str] = &["for", "to", "on"];

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("What's using the CPU?"), vec!["what", "s", "using", "the", "cpu"]);
        assert_eq!(tokenize("grant file_tool"), vec!["grant", "file_tool"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_reference_inputs() {
        assert_eq!(classify("show me cpu usage"), Intent::call("system_info_tool", "cpu"));
        assert_eq!(classify("clean up temp files"), Intent::call("file_tool", "cleanup"));
    }

    #[test]
    fn test_ladder_order() {
        let cases = [
            ("grant permissions for file_tool", Intent::GrantPermission),
            ("revoke permission for file_tool", Intent::RevokePermission),
            ("show config", Intent::ConfigHelp),
            ("list files in this folder", Intent::call("file_tool", "list")),
            ("organize my files", Intent::call("file_tool", "organize")),
            ("search files for notes", Intent::call("file_tool", "search")),
            ("how much ram is free", Intent::call("system_info_tool", "memory")),
            ("disk space left", Intent::call("system_info_tool", "disk")),
            ("show running processes", Intent::call("system_info_tool", "processes")),
            ("network status", Intent::call("system_info_tool", "network")),
            ("battery level", Intent::call("system_info_tool", "battery")),
            ("when did it boot", Intent::call("system_info_tool", "uptime")),
            ("system load", Intent::call("system_info_tool", "performance")),
            ("hardware specs", Intent::call("system_info_tool", "hardware")),
            ("system information", Intent::call("system_info_tool", "overview")),
            ("hello there", Intent::Greeting),
            ("make me a sandwich", Intent::Unknown),
            ("", Intent::Unknown),
        ];
        for (input, expected) in cases {
            assert_eq!(classify(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_classify_deterministic() {
        for input in ["show me cpu usage", "clean up temp files", "what is this"] {
            assert_eq!(classify(input), classify(input));
        }
    }

    #[test]
    fn test_words_not_substrings() {
        // "this" is not "hi", "profile" is not "file"
        assert_eq!(classify("this thing"), Intent::Unknown);
        assert_eq!(classify("profile"), Intent::Unknown);
    }

    #[test]
    fn test_parse_permission_command() {
        let cases = [
            ("grant permissions for file_tool", PermissionTarget::Named("file_tool".into())),
            ("grant permission to file tool", PermissionTarget::Named("file tool".into())),
            ("Grant Permission file_tool.", PermissionTarget::Named("file_tool".into())),
            ("grant permission: system admin", PermissionTarget::Named("system admin".into())),
            ("grant permissions:file_access", PermissionTarget::Named("file_access".into())),
            ("grant permissions on system_info_tool", PermissionTarget::Named("system_info_tool".into())),
            ("grant permissions", PermissionTarget::Missing),
            ("grant permissions for", PermissionTarget::Missing),
            ("please grant permissions for file_tool", PermissionTarget::Malformed),
            ("grant me permissions", PermissionTarget::Malformed),
            ("grantpermission file_tool", PermissionTarget::Malformed),
            ("grant permissionsfile", PermissionTarget::Malformed),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_permission_command(input, "grant", GRANT), expected, "{}", input);
        }

        assert_eq!(
            parse_permission_command("revoke permissions from file_tool", "revoke", &["for", "from", "on"]),
            PermissionTarget::Named("file_tool".into())
        );
    }
}
