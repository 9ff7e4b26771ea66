//! Application state management

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cvx_core::config::AppConfig;
use cvx_core::EntityPolicy;
use cvx_dispatch::Dispatcher;
use cvx_extractor::Pipeline;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Extraction pipeline, shared with blocking worker threads
    pub pipeline: Arc<Pipeline>,
    /// Downstream dispatcher
    pub dispatcher: Dispatcher,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create application state, loading the NER model and dispatch settings
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let pipeline = Pipeline::from_config(&config.extraction);
        let dispatcher = Dispatcher::from_config(config.dispatch.clone())?;
        Ok(Self::with_parts(config, pipeline, dispatcher))
    }

    pub fn with_parts(config: AppConfig, pipeline: Pipeline, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            dispatcher,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Whether documents can be processed
    ///
    /// Only a configured-but-unloaded model under the abort policy makes
    /// every document fail.
    pub fn is_ready(&self) -> bool {
        let configured = self.pipeline.recognizer_name().is_some();
        !(configured
            && !self.pipeline.recognizer_ready()
            && self.pipeline.policy() == EntityPolicy::Abort)
    }
}
