use thiserror::Error;

/// Why a poll produced no usable payload. None of these stop the polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("fetch #{seq} timed out after {secs}s")]
    Timeout { seq: u64, secs: u64 },
}

impl FeedError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FeedError::Timeout { .. })
    }
}

/// A payload field outside its domain. The clamped value is used and polling continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} out of range: {raw} clamped to {clamped}")]
pub struct DataWarning {
    pub field: &'static str,
    pub raw: i64,
    pub clamped: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_report_as_timeouts() {
        assert!(FeedError::Timeout { seq: 3, secs: 12 }.is_timeout());
        assert!(!FeedError::Network("reset".to_string()).is_timeout());
        assert_eq!(
            FeedError::Timeout { seq: 3, secs: 12 }.to_string(),
            "fetch #3 timed out after 12s"
        );
    }
}
