//! Simple stateless pub-sub event handler
//!
//! Components of the engine publish events (a new match, a closed match, a fresh daily batch) and collaborators such
//! as the notification service subscribe to them. Handlers have no access to the internal state of the engine. All
//! that is received is the event itself.
//!
//! Publishing never waits. If a handler falls behind and its buffer fills up, the event is logged and dropped, so
//! that a slow notifier can never stall a like or a queue update.
use std::{
    future::Future,
    pin::Pin,
    sync::{atomic::AtomicI64, Arc},
};

use log::*;
use tokio::sync::mpsc::{self, error::TrySendError};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // dropping the internal sender lets the loop end once the last producer is gone
        drop(self.sender);
        let jobs = Arc::new(AtomicI64::new(0));
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let job = jobs.clone();
            tokio::spawn(async move {
                (handler)(ev).await;
                job.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                trace!("📬️ Event handled");
            });
        }
        while jobs.load(std::sync::atomic::Ordering::SeqCst) > 0 {
            debug!("📬️ Waiting for jobs to complete");
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Hands the event to the handler without waiting. Failures are logged and never returned.
    pub fn publish_event(&self, event: E) {
        match self.sender.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => warn!("📬️ Event buffer is full. The event has been dropped."),
            Err(TrySendError::Closed(_)) => error!("📬️ Event handler has shut down. The event has been dropped."),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicU64;

    use super::*;

    #[tokio::test]
    async fn test_event_handler() {
        let _ = env_logger::try_init();
        let count = Arc::new(AtomicU64::new(0));
        let c2 = count.clone();
        let handler = Arc::new(move |v| {
            let count = count.clone();
            Box::pin(async move {
                debug!("Handler received {v}");
                let _ = count.fetch_add(v, std::sync::atomic::Ordering::SeqCst);
                tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(16, handler);
        let producer_1 = event_handler.subscribe();
        let producer_2 = event_handler.subscribe();
        tokio::spawn(async move {
            for i in 0..5 {
                let v = i * 2 + 1;
                producer_1.publish_event(v);
            }
        });
        tokio::spawn(async move {
            for i in 0..5 {
                let v = i * 2;
                producer_2.publish_event(v);
            }
        });

        event_handler.start_handler().await;
        assert_eq!(c2.load(std::sync::atomic::Ordering::SeqCst), 45);
    }

    #[tokio::test]
    async fn full_buffers_drop_events_without_blocking() {
        let count = Arc::new(AtomicU64::new(0));
        let c2 = count.clone();
        let handler = Arc::new(move |v: u64| {
            let count = count.clone();
            Box::pin(async move {
                let _ = count.fetch_add(v, std::sync::atomic::Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(2, handler);
        let producer = event_handler.subscribe();
        // nothing is consuming yet, so only the first two fit
        for v in [1, 10, 100] {
            producer.publish_event(v);
        }
        drop(producer);
        event_handler.start_handler().await;
        assert_eq!(c2.load(std::sync::atomic::Ordering::SeqCst), 11);
    }
}
