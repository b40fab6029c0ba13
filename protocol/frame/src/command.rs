//! Command names carried in the first request field.

use std::fmt;

/// A recognized request command.
///
/// Names are matched case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Store a value under a key in a group.
    Set,
    /// Fetch the value for a key in a group.
    Get,
    /// Remove a key from a group.
    Del,
    /// Create a group. The key field carries the capacity in MiB.
    NewGroup,
    /// Remove a group and everything in it.
    DelGroup,
    /// List group names.
    ListGroup,
    /// List the keys of a group.
    Keys,
    /// Usage summary of a group.
    Stats,
    /// Cluster node owning a key.
    Locate,
}

impl Command {
    pub const ALL: [Command; 9] = [
        Command::Set,
        Command::Get,
        Command::Del,
        Command::NewGroup,
        Command::DelGroup,
        Command::ListGroup,
        Command::Keys,
        Command::Stats,
        Command::Locate,
    ];

    /// Look up a command by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "set" => Some(Command::Set),
            "get" => Some(Command::Get),
            "del" => Some(Command::Del),
            "new_group" => Some(Command::NewGroup),
            "del_group" => Some(Command::DelGroup),
            "list_group" => Some(Command::ListGroup),
            "keys" => Some(Command::Keys),
            "stats" => Some(Command::Stats),
            "locate" => Some(Command::Locate),
            _ => None,
        }
    }

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Set => "set",
            Command::Get => "get",
            Command::Del => "del",
            Command::NewGroup => "new_group",
            Command::DelGroup => "del_group",
            Command::ListGroup => "list_group",
            Command::Keys => "keys",
            Command::Stats => "stats",
            Command::Locate => "locate",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for cmd in Command::ALL {
            assert_eq!(Command::parse(cmd.as_str()), Some(cmd));
        }
    }

    #[test]
    fn test_case_sensitive() {
        assert_eq!(Command::parse("GET"), None);
        assert_eq!(Command::parse("New_Group"), None);
        assert_eq!(Command::parse(""), None);
    }
}
