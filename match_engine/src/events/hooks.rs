use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    BatchGeneratedEvent,
    EventHandler,
    EventProducer,
    EventType,
    Handler,
    MatchCreatedEvent,
    MatchStatusChangedEvent,
};

type BoxedHandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub match_created_producer: Vec<EventProducer<MatchCreatedEvent>>,
    pub match_status_changed_producer: Vec<EventProducer<MatchStatusChangedEvent>>,
    pub batch_generated_producer: Vec<EventProducer<BatchGeneratedEvent>>,
}

impl EventProducers {
    /// Sends the event to every subscriber of its kind. Never blocks and never fails.
    pub fn publish(&self, event: EventType) {
        match event {
            EventType::MatchCreated(ev) => publish_to_all(&self.match_created_producer, ev),
            EventType::MatchStatusChanged(ev) => publish_to_all(&self.match_status_changed_producer, ev),
            EventType::BatchGenerated(ev) => publish_to_all(&self.batch_generated_producer, ev),
        }
    }
}

fn publish_to_all<E: Clone + Send + Sync>(producers: &[EventProducer<E>], event: E) {
    for producer in producers {
        producer.publish_event(event.clone());
    }
}

pub struct EventHandlers {
    pub on_match_created: Option<EventHandler<MatchCreatedEvent>>,
    pub on_match_status_changed: Option<EventHandler<MatchStatusChangedEvent>>,
    pub on_batch_generated: Option<EventHandler<BatchGeneratedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_match_created = hooks.on_match_created.map(|f| EventHandler::new(buffer_size, f));
        let on_match_status_changed = hooks.on_match_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_batch_generated = hooks.on_batch_generated.map(|f| EventHandler::new(buffer_size, f));
        Self { on_match_created, on_match_status_changed, on_batch_generated }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_match_created {
            result.match_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_match_status_changed {
            result.match_status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_batch_generated {
            result.batch_generated_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_match_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_match_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_batch_generated {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
    /// Runs every handler on the current task. Returns once all producers have been dropped and every in-flight
    /// event has been handled.
    pub async fn run_to_completion(self) {
        let match_created = async {
            if let Some(handler) = self.on_match_created {
                handler.start_handler().await;
            }
        };
        let match_status_changed = async {
            if let Some(handler) = self.on_match_status_changed {
                handler.start_handler().await;
            }
        };
        let batch_generated = async {
            if let Some(handler) = self.on_batch_generated {
                handler.start_handler().await;
            }
        };
        tokio::join!(match_created, match_status_changed, batch_generated);
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_match_created: Option<Handler<MatchCreatedEvent>>,
    pub on_match_status_changed: Option<Handler<MatchStatusChangedEvent>>,
    pub on_batch_generated: Option<Handler<BatchGeneratedEvent>>,
}

impl EventHooks {
    pub fn on_match_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(MatchCreatedEvent) -> BoxedHandlerFuture) + Send + Sync + 'static {
        self.on_match_created = Some(Arc::new(f));
        self
    }

    pub fn on_match_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(MatchStatusChangedEvent) -> BoxedHandlerFuture) + Send + Sync + 'static {
        self.on_match_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_batch_generated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BatchGeneratedEvent) -> BoxedHandlerFuture) + Send + Sync + 'static {
        self.on_batch_generated = Some(Arc::new(f));
        self
    }
}
