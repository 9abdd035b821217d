use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::CompressionPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CompressionPipeline>,
    pub config: AppConfig,
}
