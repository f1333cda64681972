use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, PointsExpiredEvent, TierChangedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub tier_changed_producer: Vec<EventProducer<TierChangedEvent>>,
    pub points_expired_producer: Vec<EventProducer<PointsExpiredEvent>>,
}

pub struct EventHandlers {
    pub on_tier_changed: Option<EventHandler<TierChangedEvent>>,
    pub on_points_expired: Option<EventHandler<PointsExpiredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_tier_changed = hooks.on_tier_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_points_expired = hooks.on_points_expired.map(|f| EventHandler::new(buffer_size, f));
        Self { on_tier_changed, on_points_expired }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_tier_changed {
            result.tier_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_points_expired {
            result.points_expired_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_tier_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_points_expired {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_tier_changed: Option<Handler<TierChangedEvent>>,
    pub on_points_expired: Option<Handler<PointsExpiredEvent>>,
}

impl EventHooks {
    pub fn on_tier_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TierChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_tier_changed = Some(Arc::new(f));
        self
    }

    pub fn on_points_expired<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PointsExpiredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_points_expired = Some(Arc::new(f));
        self
    }
}
