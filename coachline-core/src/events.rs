use serde::Serialize;
use tracing::{debug, warn};

use crate::repository::EventPublisher;

/// Serializes `event` and hands it to the publisher.
/// Failures are logged and swallowed; the caller's operation already succeeded.
pub async fn emit<E: Serialize + Sync>(publisher: &dyn EventPublisher, topic: &str, key: &str, event: &E) {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to serialize {} event {}: {}", topic, key, e);
            return;
        }
    };

    match publisher.publish(topic, key, &payload).await {
        Ok(()) => debug!("Published {} event {}", topic, key),
        Err(e) => warn!("Failed to publish {} event {}: {}", topic, key, e),
    }
}
