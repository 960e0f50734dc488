#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown container {0:?}")]
    UnknownContainer(String),
}

pub type Result<T> = std::result::Result<T, Error>;
