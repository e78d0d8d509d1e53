use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Component not configured: {0}")]
    NotConfigured(&'static str),

    // Type decoding errors
    #[error("Invalid user level code: {code}")]
    InvalidUserLevel { code: u8 },

    #[error("Invalid card UID: {0}")]
    InvalidCardUid(String),

    // Hardware errors (boot-blocking, see BoardLogic::Status::ErrorHardware)
    #[error("Hardware initialization failed: {0}")]
    HardwareInit(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
