use futures_util::FutureExt;
use log::*;
use match_engine::events::{EventHandlers, EventHooks};

/// Event handlers that log every match and batch event the engine publishes during a command.
pub fn logging_event_handlers(buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_match_created(|ev| {
            info!("📬️ {} matched with {} ({})", ev.user_id, ev.peer_id, ev.match_id);
            async {}.boxed()
        })
        .on_match_status_changed(|ev| {
            info!("📬️ Match {} went from {} to {} by {}", ev.match_id, ev.old_status, ev.new_status, ev.changed_by);
            async {}.boxed()
        })
        .on_batch_generated(|ev| {
            info!("📬️ {} candidates queued for {} on {}", ev.candidate_count, ev.user_id, ev.date);
            async {}.boxed()
        });
    EventHandlers::new(buffer_size, hooks)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_event_kind_is_logged() {
        let handlers = logging_event_handlers(4);
        assert!(handlers.on_match_created.is_some());
        assert!(handlers.on_match_status_changed.is_some());
        assert!(handlers.on_batch_generated.is_some());
        let producers = handlers.producers();
        assert_eq!(producers.match_created_producer.len(), 1);
        assert_eq!(producers.match_status_changed_producer.len(), 1);
        assert_eq!(producers.batch_generated_producer.len(), 1);
    }
}
