use thiserror::Error;

#[derive(Debug, Error)]
pub enum PcapSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error ({context}): {message}")]
    Pcap {
        context: &'static str,
        message: String,
    },
}

/// Why a captured frame could not be reduced to a UDP payload.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("packet slice error: {0}")]
    Slice(String),
    #[error("missing network layer in frame")]
    MissingNetworkLayer,
    #[error("missing IP payload in frame")]
    MissingIpPayload,
    #[error("UDP segment too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
}
