use thiserror::Error;

use crate::sink::SinkError;

pub type CrawlResult<T> = Result<T, CrawlError>;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("chromium launch failed: {0}")]
    Launch(String),
    #[error("cdp error: {0}")]
    Cdp(String),
    #[error("browser session unusable: {0}")]
    SessionDead(String),
    #[error("timeout waiting for {0}")]
    Timeout(String),
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("payload decode error: {0}")]
    Payload(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl CrawlError {
    /// Session-fatal errors escalate to the recovery coordinator; everything
    /// else is handled locally by whichever component hit it.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, CrawlError::SessionDead(_) | CrawlError::Launch(_))
    }
}

impl From<chromiumoxide::error::CdpError> for CrawlError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        use chromiumoxide::error::CdpError;

        let text = err.to_string();
        match err {
            // Transport gone or the browser process never came up: nothing
            // addressed at this session can succeed anymore.
            CdpError::Ws(_)
            | CdpError::ChannelSendError(_)
            | CdpError::NoResponse
            | CdpError::LaunchExit(..) => CrawlError::SessionDead(text),
            CdpError::Timeout => CrawlError::Timeout(text),
            _ => CrawlError::Cdp(text),
        }
    }
}

impl From<tokio::task::JoinError> for CrawlError {
    fn from(err: tokio::task::JoinError) -> Self {
        CrawlError::Unexpected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_split() {
        assert!(CrawlError::SessionDead("gone".into()).is_session_fatal());
        assert!(CrawlError::Launch("no binary".into()).is_session_fatal());
        assert!(!CrawlError::Timeout("review list".into()).is_session_fatal());
        assert!(!CrawlError::ElementNotFound("pager".into()).is_session_fatal());
    }

    #[test]
    fn cdp_errors_classify_by_variant() {
        let dead: CrawlError = chromiumoxide::error::CdpError::NoResponse.into();
        assert!(dead.is_session_fatal());

        let timeout: CrawlError = chromiumoxide::error::CdpError::Timeout.into();
        assert!(!timeout.is_session_fatal());
        assert!(matches!(timeout, CrawlError::Timeout(_)));
    }
}
