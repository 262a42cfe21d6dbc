/// Runtime configuration for unverified token inspection.
#[derive(Debug, Clone, Default)]
pub struct InspectorConfig {
    /// Seconds before `exp` at which a token already counts as expired.
    pub leeway_seconds: u32,
}

impl InspectorConfig {
    /// Construct config with no leeway: a token is expired as soon as `exp` passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the expiry leeway.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }
}
