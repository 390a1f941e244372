use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode CPU context: {0}")]
    ContextDecode(#[from] bincode::error::DecodeError),
    #[error("failed to encode CPU context: {0}")]
    ContextEncode(#[from] bincode::error::EncodeError),
    #[error("context buffer has {extra} unexpected trailing byte(s)")]
    TrailingContextBytes { extra: usize },
    #[error("image of {len} bytes does not fit in {capacity} bytes of physical space")]
    ImageTooLarge { len: usize, capacity: usize },
    #[error("saved state holds {found} core(s), machine has {expected}")]
    CoreCountMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
