//! Session protocol spoken between a session server and its terminal client
//!
//! The server drives the conversation: it sends [`ServerMessage`]s and, for
//! `display` instructions that expect input and for `upload` requests, waits
//! for exactly one [`ClientReply`].

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// `response` value of a successful upload reply.
pub const UPLOAD_SUCCESS: &str = "success";
/// `response` value of a failed upload reply.
pub const UPLOAD_FAILURE: &str = "error";

/// What kind of reply a `display` instruction expects.
///
/// Wire forms: `"none"`, `["text", <max_len>]`, or a list of literal tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    /// Informational text; no reply follows.
    None,
    /// Free-form ASCII text of at most `max_len` characters.
    Text { max_len: usize },
    /// The reply must equal one of the tokens verbatim.
    Choice(Vec<String>),
}

/// Why a reply does not satisfy an [`InputSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("ASCII only")]
    NotAscii,

    #[error("max length is {max_len}")]
    TooLong { max_len: usize },

    #[error("invalid selection")]
    NotAnOption,

    #[error("no reply expected")]
    Unexpected,
}

impl InputSpec {
    pub fn text(max_len: usize) -> Self {
        InputSpec::Text { max_len }
    }

    pub fn choice<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        InputSpec::Choice(tokens.into_iter().map(Into::into).collect())
    }

    /// Tokens `"1"` through `"count"`.
    pub fn numbered(count: usize) -> Self {
        InputSpec::Choice((1..=count).map(|i| i.to_string()).collect())
    }

    pub fn expects_reply(&self) -> bool {
        !matches!(self, InputSpec::None)
    }

    /// Checks a reply against this specification.
    pub fn validate(&self, reply: &str) -> Result<(), InputError> {
        match self {
            InputSpec::None => Err(InputError::Unexpected),
            InputSpec::Text { max_len } => {
                if !reply.is_ascii() {
                    Err(InputError::NotAscii)
                } else if reply.len() > *max_len {
                    Err(InputError::TooLong { max_len: *max_len })
                } else {
                    Ok(())
                }
            }
            InputSpec::Choice(tokens) => {
                if tokens.iter().any(|token| token == reply) {
                    Ok(())
                } else {
                    Err(InputError::NotAnOption)
                }
            }
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(keyword) if keyword == "none" => Some(InputSpec::None),
            Value::Array(items) => match items.as_slice() {
                [Value::String(tag), Value::Number(max_len)] if tag == "text" => max_len
                    .as_u64()
                    .map(|max_len| InputSpec::Text {
                        max_len: max_len as usize,
                    }),
                _ => items
                    .iter()
                    .map(|item| match item {
                        Value::String(token) => Some(token.clone()),
                        Value::Number(number) => Some(number.to_string()),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
                    .map(InputSpec::Choice),
            },
            _ => None,
        }
    }
}

impl Serialize for InputSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InputSpec::None => serializer.serialize_str("none"),
            InputSpec::Text { max_len } => ("text", max_len).serialize(serializer),
            InputSpec::Choice(tokens) => tokens.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for InputSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        InputSpec::from_value(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid input specification: {raw}")))
    }
}

/// Instructions a session server sends to its client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Show `text`; reply according to `input`.
    Display { text: String, input: InputSpec },
    /// Launch the local game client against a running game server.
    Connect {
        game_path: String,
        host: String,
        port: u16,
    },
    /// Persist `file_data` at `path`, creating directories as needed.
    Save {
        path: String,
        #[serde(rename = "file data")]
        file_data: String,
    },
    /// Read the local file at `path` and send it back.
    Upload { path: String },
}

/// The single reply a client sends for a prompt or an upload request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientReply {
    pub response: String,
    #[serde(
        rename = "file data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub file_data: Option<String>,
}

impl ClientReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            file_data: None,
        }
    }

    pub fn file(content: String) -> Self {
        Self {
            response: UPLOAD_SUCCESS.to_string(),
            file_data: Some(content),
        }
    }

    pub fn upload_failed() -> Self {
        Self::text(UPLOAD_FAILURE)
    }

    /// File content carried by a successful upload reply.
    pub fn into_file(self) -> Option<String> {
        if self.response == UPLOAD_SUCCESS {
            Some(self.file_data.unwrap_or_default())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_spec_wire_forms() {
        assert_eq!(serde_json::to_value(InputSpec::None).unwrap(), json!("none"));
        assert_eq!(
            serde_json::to_value(InputSpec::text(20)).unwrap(),
            json!(["text", 20])
        );
        assert_eq!(
            serde_json::to_value(InputSpec::numbered(3)).unwrap(),
            json!(["1", "2", "3"])
        );
    }

    #[test]
    fn test_input_spec_parses_wire_forms() {
        let text: InputSpec = serde_json::from_value(json!(["text", 100])).unwrap();
        assert_eq!(text, InputSpec::text(100));

        // A two-token choice whose first token is "text" stays a choice.
        let choice: InputSpec = serde_json::from_value(json!(["text", "image"])).unwrap();
        assert_eq!(choice, InputSpec::choice(["text", "image"]));

        let numeric: InputSpec = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(numeric, InputSpec::numbered(2));

        assert!(serde_json::from_value::<InputSpec>(json!("anything")).is_err());
        assert!(serde_json::from_value::<InputSpec>(json!({"text": 3})).is_err());
    }

    #[test]
    fn test_text_validation() {
        let spec = InputSpec::text(5);
        assert_eq!(spec.validate("alice"), Ok(()));
        assert_eq!(spec.validate(""), Ok(()));
        assert_eq!(spec.validate("alice!"), Err(InputError::TooLong { max_len: 5 }));
        assert_eq!(spec.validate("zoë"), Err(InputError::NotAscii));
    }

    #[test]
    fn test_choice_validation_is_verbatim() {
        let spec = InputSpec::numbered(3);
        assert_eq!(spec.validate("2"), Ok(()));
        assert_eq!(spec.validate(" 2"), Err(InputError::NotAnOption));
        assert_eq!(spec.validate("4"), Err(InputError::NotAnOption));
        assert_eq!(InputSpec::None.validate("1"), Err(InputError::Unexpected));
    }

    #[test]
    fn test_server_message_shapes() {
        let display = ServerMessage::Display {
            text: "1. Login\n2. Register\n3. Exit".into(),
            input: InputSpec::numbered(3),
        };
        assert_eq!(
            serde_json::to_value(&display).unwrap(),
            json!({"op": "display", "text": "1. Login\n2. Register\n3. Exit", "input": ["1", "2", "3"]})
        );

        let save = ServerMessage::Save {
            path: "games/bob/ooxx/client.py".into(),
            file_data: "print('hi')".into(),
        };
        assert_eq!(
            serde_json::to_value(&save).unwrap(),
            json!({"op": "save", "path": "games/bob/ooxx/client.py", "file data": "print('hi')"})
        );

        let connect: ServerMessage = serde_json::from_value(
            json!({"op": "connect", "game_path": "games/bob/ooxx/client.py", "host": "127.0.0.1", "port": 20001}),
        )
        .unwrap();
        assert_eq!(
            connect,
            ServerMessage::Connect {
                game_path: "games/bob/ooxx/client.py".into(),
                host: "127.0.0.1".into(),
                port: 20001,
            }
        );
    }

    #[test]
    fn test_upload_reply_shapes() {
        assert_eq!(
            serde_json::to_value(ClientReply::upload_failed()).unwrap(),
            json!({"response": "error"})
        );
        let ok: ClientReply =
            serde_json::from_value(json!({"response": "success", "file data": "abc"})).unwrap();
        assert_eq!(ok.into_file(), Some("abc".to_string()));

        let failed: ClientReply = serde_json::from_value(json!({"response": "error"})).unwrap();
        assert_eq!(failed.into_file(), None);
    }
}
