//! Service seams used by the engine
//!
//! The engine talks to three collaborators through the traits below. The
//! production implementations call the remote AI functions; the demo backend
//! fabricates plausible data offline.

pub mod analysis_client;
pub mod demo;
pub mod functions;
pub mod match_client;
pub mod progress;
pub mod remix_client;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AnalyzedTrack, RemixResult, RemixSettings, SongMatch, TrackAnalysis, TrackFile};

pub use analysis_client::AnalysisClient;
pub use demo::DemoBackend;
pub use functions::{FunctionsClient, FunctionsConfig, ServiceError};
pub use match_client::MatchClient;
pub use progress::ProgressTicker;
pub use remix_client::RemixClient;

/// Analysis failure
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl AnalysisError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AnalysisError::Service(e) if e.is_rate_limited())
    }
}

/// Match search failure
#[derive(Debug, Clone, Error)]
pub enum MatchError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl MatchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, MatchError::Service(e) if e.is_rate_limited())
    }
}

/// Remix generation failure
#[derive(Debug, Clone, Error)]
pub enum RemixError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl RemixError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RemixError::Service(e) if e.is_rate_limited())
    }
}

/// Produces a [`TrackAnalysis`] for a selected file
#[async_trait]
pub trait TrackAnalyzer: Send + Sync {
    async fn analyze(&self, file: &TrackFile) -> Result<AnalyzedTrack, AnalysisError>;
}

/// Suggests tracks compatible with an analysis, or a discovery pair without one
#[async_trait]
pub trait MatchFinder: Send + Sync {
    async fn find_matches(
        &self,
        analysis: Option<&TrackAnalysis>,
    ) -> Result<Vec<SongMatch>, MatchError>;
}

/// Generates a remix plan from one or two analyses
#[async_trait]
pub trait RemixGenerator: Send + Sync {
    async fn generate_remix(
        &self,
        analysis1: &TrackAnalysis,
        analysis2: Option<&TrackAnalysis>,
        settings: &RemixSettings,
    ) -> Result<RemixResult, RemixError>;
}

/// The three collaborators the engine needs, bundled
#[derive(Clone)]
pub struct Backend {
    pub analyzer: Arc<dyn TrackAnalyzer>,
    pub matcher: Arc<dyn MatchFinder>,
    pub remixer: Arc<dyn RemixGenerator>,
}

impl Backend {
    pub fn new(
        analyzer: Arc<dyn TrackAnalyzer>,
        matcher: Arc<dyn MatchFinder>,
        remixer: Arc<dyn RemixGenerator>,
    ) -> Self {
        Self {
            analyzer,
            matcher,
            remixer,
        }
    }

    /// Clients for the remote AI functions, sharing one connection pool
    pub fn remote(config: &FunctionsConfig) -> Result<Self, ServiceError> {
        let functions = FunctionsClient::new(config)?;

        Ok(Self::new(
            Arc::new(AnalysisClient::new(functions.clone())),
            Arc::new(MatchClient::new(functions.clone())),
            Arc::new(RemixClient::new(functions)),
        ))
    }

    /// Offline backend; every call resolves after `delay`
    pub fn demo(delay: Duration) -> Self {
        let demo = Arc::new(DemoBackend::new(delay));
        Self::new(demo.clone(), demo.clone(), demo)
    }
}
