use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `degraded` while no platform gateway is attached to the bridge.
pub fn health_status(state: &SharedState) -> HealthResponse {
    if state.is_degraded() {
        warn!("no platform gateway attached (degraded mode)");
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::harness;

    #[tokio::test]
    async fn fakes_without_bridge_are_healthy() {
        let h = harness().build();
        assert_eq!(health_status(&h.state).status, "ok");
    }
}
