//! Operator reply parsing.
//!
//! The operator alert asks for a terse reply: `Y<request-id>` to approve
//! or `N<request-id>` to deny. Parsing is pure; authentication and the
//! resulting state change happen at the webhook route.

use uuid::Uuid;

/// Command decoded from an operator reply body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCommand {
    Approve(Uuid),
    Deny(Uuid),
    /// Recognized action marker but the id did not parse.
    Malformed,
    /// Unrecognized marker; the operator should get usage instructions.
    Help,
}

/// Parse a raw reply body. Markers are case-insensitive and surrounding
/// whitespace is ignored.
pub fn parse_reply(body: &str) -> ReplyCommand {
    let body = body.trim();
    let Some(marker) = body.chars().next() else {
        return ReplyCommand::Help;
    };
    let rest = body[marker.len_utf8()..].trim();
    match marker.to_ascii_lowercase() {
        'y' => match rest.parse::<Uuid>() {
            Ok(id) => ReplyCommand::Approve(id),
            Err(_) => ReplyCommand::Malformed,
        },
        'n' => match rest.parse::<Uuid>() {
            Ok(id) => ReplyCommand::Deny(id),
            Err(_) => ReplyCommand::Malformed,
        },
        _ => ReplyCommand::Help,
    }
}

/// Usage instructions sent back for unrecognized replies.
pub fn usage_text() -> &'static str {
    "Reply Y<request-id> to approve or N<request-id> to deny."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_approve() {
        let id = Uuid::new_v4();
        assert_eq!(parse_reply(&format!("Y{id}")), ReplyCommand::Approve(id));
        assert_eq!(parse_reply(&format!("y{id}")), ReplyCommand::Approve(id));
        assert_eq!(parse_reply(&format!("  Y {id}  ")), ReplyCommand::Approve(id));
    }

    #[test]
    fn test_parse_deny() {
        let id = Uuid::new_v4();
        assert_eq!(parse_reply(&format!("N{id}")), ReplyCommand::Deny(id));
        assert_eq!(parse_reply(&format!("n{id}")), ReplyCommand::Deny(id));
    }

    #[test]
    fn test_unknown_marker_asks_for_help() {
        let id = Uuid::new_v4();
        assert_eq!(parse_reply(&format!("X{id}")), ReplyCommand::Help);
        assert_eq!(parse_reply("hello"), ReplyCommand::Help);
        assert_eq!(parse_reply(""), ReplyCommand::Help);
        assert_eq!(parse_reply("   "), ReplyCommand::Help);
    }

    #[test]
    fn test_known_marker_bad_id_is_malformed() {
        assert_eq!(parse_reply("Y123"), ReplyCommand::Malformed);
        assert_eq!(parse_reply("N"), ReplyCommand::Malformed);
        assert_eq!(parse_reply("Ynot-a-uuid"), ReplyCommand::Malformed);
    }
}
