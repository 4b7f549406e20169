//! Text command parsing.
//!
//! Commands are `{prefix}{name} {args}`. The name is matched
//! case-insensitively and a `@botname` suffix is split off, so `/GTR@my_bot es hi`
//! parses as `gtr` with args `es hi`, addressed to `my_bot`.

/// A command addressed to one of the handlers.
#[derive(Debug, Clone)]
pub struct CommandMessage {
    pub chat_id: i64,
    pub message_id: i64,
    /// Everything after the command token, trimmed.
    pub args: String,
    /// Text of the message this command replies to, if any.
    pub reply_text: Option<String>,
}

/// Name and argument string of a parsed command.
#[derive(Debug, PartialEq)]
pub struct ParsedCommand<'a> {
    pub name: String,
    pub args: &'a str,
    /// Bot named after `@`, if any.
    pub mention: Option<&'a str>,
}

impl ParsedCommand<'_> {
    /// False when the command names a different bot.
    pub fn is_for(&self, bot_username: &str) -> bool {
        self.mention
            .is_none_or(|mention| mention.eq_ignore_ascii_case(bot_username))
    }
}

/// Parse `text` as a command, `None` if it does not start with `prefix`.
pub fn parse<'a>(text: &'a str, prefix: &str) -> Option<ParsedCommand<'a>> {
    let rest = text.trim_start().strip_prefix(prefix)?;
    let (token, args) = match rest.split_once(char::is_whitespace) {
        Some((token, args)) => (token, args.trim()),
        None => (rest, ""),
    };
    let (name, mention) = match token.split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (token, None),
    };
    if name.is_empty() {
        return None;
    }
    Some(ParsedCommand {
        name: name.to_lowercase(),
        args,
        mention,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let cmd = parse("/gchat on", "/").unwrap();
        assert_eq!(cmd.name, "gchat");
        assert_eq!(cmd.args, "on");
    }

    #[test]
    fn test_parse_no_args() {
        let cmd = parse("/gtr", "/").unwrap();
        assert_eq!(cmd.name, "gtr");
        assert_eq!(cmd.args, "");
    }

    #[test]
    fn test_parse_keeps_inner_whitespace() {
        let cmd = parse(".role  You are\na pirate  ", ".").unwrap();
        assert_eq!(cmd.name, "role");
        assert_eq!(cmd.args, "You are\na pirate");
    }

    #[test]
    fn test_parse_splits_bot_mention_and_case() {
        let cmd = parse("/GTR@my_bot es hi", "/").unwrap();
        assert_eq!(cmd.name, "gtr");
        assert_eq!(cmd.args, "es hi");
        assert_eq!(cmd.mention, Some("my_bot"));
    }

    #[test]
    fn test_mention_must_match_bot() {
        assert!(parse("/gtr es hi", "/").unwrap().is_for("my_bot"));
        assert!(parse("/gtr@My_Bot es hi", "/").unwrap().is_for("my_bot"));
        assert!(!parse("/gtr@other_bot es hi", "/").unwrap().is_for("my_bot"));
    }

    #[test]
    fn test_not_a_command() {
        assert!(parse("hello", "/").is_none());
        assert!(parse("/", "/").is_none());
        assert!(parse("/ gchat", "/").is_none());
        assert!(parse("gchat on", ".").is_none());
    }

    #[test]
    fn test_multichar_prefix() {
        let cmd = parse("!!gtr de text", "!!").unwrap();
        assert_eq!(cmd.name, "gtr");
        assert_eq!(cmd.args, "de text");
    }
}
