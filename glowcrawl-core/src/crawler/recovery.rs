use std::future::Future;

use tracing::{info, warn};

use super::error::{CrawlError, CrawlResult};
use super::session::{CrawlSession, SessionFactory};

/// Result of running one crawl unit through the recovery layer. A `Failed`
/// outcome is data, not an error; the crawl moves on to the next unit.
#[derive(Debug)]
pub enum UnitOutcome<T> {
    Completed { value: T, attempts: u32 },
    Failed { error: CrawlError, attempts: u32 },
}

impl<T> UnitOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            UnitOutcome::Completed { attempts, .. } => *attempts,
            UnitOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Owns the live browser session and replays a failed unit exactly once on
/// a fresh session when the failure was session-fatal. Non-fatal unit
/// errors keep the session and are reported without a retry.
pub struct FaultRecoveryCoordinator {
    factory: Box<dyn SessionFactory>,
    session: Option<Box<dyn CrawlSession>>,
    sessions_created: u32,
}

impl FaultRecoveryCoordinator {
    pub fn new(factory: Box<dyn SessionFactory>) -> Self {
        Self {
            factory,
            session: None,
            sessions_created: 0,
        }
    }

    pub fn sessions_created(&self) -> u32 {
        self.sessions_created
    }

    /// Runs one unit of work. The closure takes ownership of the session
    /// for the duration of the attempt and hands it back with the result.
    pub async fn run_unit<T, F, Fut>(&mut self, unit: &str, mut attempt: F) -> CrawlResult<UnitOutcome<T>>
    where
        F: FnMut(Box<dyn CrawlSession>) -> Fut,
        Fut: Future<Output = (Box<dyn CrawlSession>, CrawlResult<T>)>,
    {
        let session = self.checkout().await?;
        let (session, result) = attempt(session).await;
        let error = match result {
            Ok(value) => {
                self.session = Some(session);
                return Ok(UnitOutcome::Completed { value, attempts: 1 });
            }
            Err(error) if error.is_session_fatal() => error,
            Err(error) => {
                self.session = Some(session);
                return Ok(UnitOutcome::Failed { error, attempts: 1 });
            }
        };

        warn!(unit, %error, "session fault, relaunching browser");
        Self::discard(session).await;
        let fresh = self.checkout().await?;
        info!(unit, "retrying unit on fresh session");

        let (fresh, retry) = attempt(fresh).await;
        match retry {
            Ok(value) => {
                self.session = Some(fresh);
                Ok(UnitOutcome::Completed { value, attempts: 2 })
            }
            Err(error) => {
                if error.is_session_fatal() {
                    Self::discard(fresh).await;
                } else {
                    self.session = Some(fresh);
                }
                Ok(UnitOutcome::Failed { error, attempts: 2 })
            }
        }
    }

    /// Shuts down the held session, if any. Called once at the end of a
    /// crawl run.
    pub async fn release(&mut self) {
        if let Some(session) = self.session.take() {
            Self::discard(session).await;
        }
    }

    async fn checkout(&mut self) -> CrawlResult<Box<dyn CrawlSession>> {
        if let Some(session) = self.session.take() {
            return Ok(session);
        }
        let session = self.factory.create().await?;
        self.sessions_created += 1;
        Ok(session)
    }

    async fn discard(mut session: Box<dyn CrawlSession>) {
        if let Err(error) = session.shutdown().await {
            warn!(%error, "session shutdown failed during discard");
        }
    }
}
