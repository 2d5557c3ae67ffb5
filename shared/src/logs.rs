use serde::{Deserialize, Serialize};
use std::fmt;

/// Body accepted by `POST /api/logs`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewCommandLog {
    pub command: String,
    #[serde(default)]
    pub args: Option<String>,
    pub user_rank: String,
}

/// A stored command-log record. Records are append-only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandLog {
    pub id: u64,
    pub command: String,
    pub args: Option<String>,
    pub user_rank: String,
    /// Unix time in milliseconds, assigned on insert.
    pub timestamp: u64,
}

#[derive(Debug)]
pub struct ValidationError {
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid log data: {}", self.reason)
    }
}

impl std::error::Error for ValidationError {}

impl NewCommandLog {
    pub fn new(command: &str, args: &[String], user_rank: &str) -> Self {
        Self {
            command: command.to_string(),
            args: Some(args.join(" ")),
            user_rank: user_rank.to_string(),
        }
    }

    /// Parses and validates a raw request body.
    ///
    /// `command` and `userRank` must be strings; `args` may be a string,
    /// null, or absent. Client-supplied `id`/`timestamp` fields are ignored.
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_body() {
        let body = br#"{"command":"kick","args":"bob","userRank":"Owner"}"#;
        let log = NewCommandLog::parse(body).unwrap();

        assert_eq!(log.command, "kick");
        assert_eq!(log.args.as_deref(), Some("bob"));
        assert_eq!(log.user_rank, "Owner");
    }

    #[test]
    fn test_parse_args_optional() {
        let absent = NewCommandLog::parse(br#"{"command":"help","userRank":"Guest"}"#).unwrap();
        assert_eq!(absent.args, None);

        let null =
            NewCommandLog::parse(br#"{"command":"help","args":null,"userRank":"Guest"}"#).unwrap();
        assert_eq!(null.args, None);
    }

    #[test]
    fn test_parse_rejects_invalid_bodies() {
        let bodies: Vec<&[u8]> = vec![
            b"",
            b"[]",
            b"{}",
            br#"{"command":"help"}"#,
            br#"{"userRank":"Owner"}"#,
            br#"{"command":5,"userRank":"Owner"}"#,
            br#"{"command":"tp","args":[1,2],"userRank":"Owner"}"#,
        ];

        for body in bodies {
            assert!(NewCommandLog::parse(body).is_err());
        }
    }

    #[test]
    fn test_new_joins_args() {
        let args = vec!["10".to_string(), "20".to_string()];
        let log = NewCommandLog::new("tp", &args, "SuperAdmin");
        assert_eq!(log.args.as_deref(), Some("10 20"));
    }

    #[test]
    fn test_command_log_serializes_camel_case() {
        let log = CommandLog {
            id: 1,
            command: "fly".to_string(),
            args: None,
            user_rank: "Admin".to_string(),
            timestamp: 1_700_000_000_000,
        };
        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["userRank"], "Admin");
        assert!(value["args"].is_null());
    }
}
