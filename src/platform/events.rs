use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::ElementId;

const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

impl TouchPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Signals pushed by the host into the subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlatformEvent {
    Resize,
    OrientationChange,
    TouchStart { points: Vec<TouchPoint> },
    TouchMove { points: Vec<TouchPoint> },
    TouchEnd,
    Intersection { element: ElementId, intersecting: bool },
    ResourceLoaded { element: ElementId },
    ResourceFailed { element: ElementId, reason: String },
}

/// Fan-out channel carrying [`PlatformEvent`]s from the host to every listener.
///
/// The channel holds the last 256 events. A listener that falls further
/// behind loses the oldest ones: a lost `Intersection` leaves that element's
/// bridge armed and unloaded until the host reports it again, and a lost
/// `ResourceLoaded` leaves it loading. Hosts that emit bursts larger than
/// that should deliver them through `Monitor::dispatch` instead.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    /// Returns how many listeners received the event. Publishing with no
    /// listener attached is not an error: the event is simply dropped.
    pub fn publish(&self, event: PlatformEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_listeners_is_dropped() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(PlatformEvent::Resize), 0);
    }

    #[tokio::test]
    async fn every_subscriber_sees_events_in_order() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.publish(PlatformEvent::Resize), 2);
        assert_eq!(bus.publish(PlatformEvent::TouchEnd), 2);

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap(), PlatformEvent::Resize);
            assert_eq!(rx.recv().await.unwrap(), PlatformEvent::TouchEnd);
        }
    }

    #[tokio::test]
    async fn slow_listener_loses_the_oldest_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let element = ElementId::new();

        bus.publish(PlatformEvent::Intersection {
            element,
            intersecting: true,
        });
        for _ in 0..EVENT_BUS_CAPACITY {
            bus.publish(PlatformEvent::Resize);
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap(), PlatformEvent::Resize);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = PlatformEvent::TouchStart {
            points: vec![TouchPoint::new(1.0, 2.0)],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "touchStart");
        assert_eq!(json["points"][0]["x"], 1.0);
    }
}
