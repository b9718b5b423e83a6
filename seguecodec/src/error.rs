use std::io;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("unknown or unsupported stream format")]
    UnknownFormat,
    #[error("no decoder registered for {0} streams")]
    NoDecoder(&'static str),
    #[error("no encoder registered")]
    NoEncoder,
    #[error("unsupported configuration: {0}")]
    Unsupported(String),
}
