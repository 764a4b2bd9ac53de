use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("tip sensor timeout")]
    Timeout,
    #[error("no such ADC channel: {0}")]
    InvalidChannel(u8),
}
