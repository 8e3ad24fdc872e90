//! Stdin line commands for `hashchat listen`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Join(String),
    Channels,
    Tidy,
    Status,
    Login,
    Away,
    Back,
    Save,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP: &str = "/join <name>  switch channel (letters/digits, 12 max, or _)\n\
/channels     list channels (* = unread, > = selected)\n\
/tidy         drop channels with no messages\n\
/status       connection and event counters\n\
/login        log in with the configured key\n\
/away         mark the current channel unread on new messages\n\
/back         stop marking the current channel unread\n\
/save         write the cache now\n\
/quit         save and exit";

/// `None` for blank lines.
pub fn parse_line(line: &str) -> Option<LineCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(LineCommand::Unknown(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    Some(match name {
        "join" | "j" if !arg.is_empty() => LineCommand::Join(arg.to_string()),
        "channels" | "c" => LineCommand::Channels,
        "tidy" => LineCommand::Tidy,
        "status" => LineCommand::Status,
        "login" => LineCommand::Login,
        "away" => LineCommand::Away,
        "back" => LineCommand::Back,
        "save" => LineCommand::Save,
        "help" | "h" | "?" => LineCommand::Help,
        "quit" | "q" | "exit" => LineCommand::Quit,
        _ => LineCommand::Unknown(line.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("/join general"), Some(LineCommand::Join("general".to_string())));
        assert_eq!(parse_line("  /j  #news  "), Some(LineCommand::Join("#news".to_string())));
        assert_eq!(parse_line("/channels"), Some(LineCommand::Channels));
        assert_eq!(parse_line("/quit"), Some(LineCommand::Quit));
        assert_eq!(parse_line("/status"), Some(LineCommand::Status));
        assert_eq!(parse_line("/away"), Some(LineCommand::Away));
        assert_eq!(parse_line("/back"), Some(LineCommand::Back));
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn test_join_without_name_is_unknown() {
        assert_eq!(parse_line("/join"), Some(LineCommand::Unknown("/join".to_string())));
        assert_eq!(parse_line("hello"), Some(LineCommand::Unknown("hello".to_string())));
    }
}
