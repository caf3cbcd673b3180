use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("malformed action record `{input}`: {reason}")]
    Record { input: String, reason: String },

    #[error("cannot parse action DSL `{input}`: {reason}")]
    Dsl { input: String, reason: String },

    #[error("unknown key name `{0}`")]
    UnknownKey(String),

    #[error("unsupported action payload `{0}`: expected a mapping or a string")]
    UnsupportedPayload(String),
}
