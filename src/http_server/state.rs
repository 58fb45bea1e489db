//! Shared handler state

use crate::core::DataService;

/// State shared by every REST handler
#[derive(Debug, Clone)]
pub struct ApiState {
    pub service: DataService,
}

impl ApiState {
    pub fn new(service: DataService) -> Self {
        Self { service }
    }
}
