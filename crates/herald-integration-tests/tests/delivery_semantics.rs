//! Integration tests for ordering, once-listeners, unsubscription and
//! fault isolation on a single registry.

use herald_events::{ChainEvent, Event, EventRegistry, Listener, names};
use herald_test::{DeliveryRecorder, test_new_block, test_new_transaction, test_registry};

fn height(event: &Event) -> Option<u64> {
    match event.downcast_ref::<ChainEvent>() {
        Some(ChainEvent::NewBlock { height, .. }) => Some(*height),
        _ => None,
    }
}

#[test]
fn test_listeners_fire_in_subscription_order() {
    let registry = EventRegistry::new();
    let recorder = DeliveryRecorder::new();
    for label in ["L0", "L1", "L2", "L3", "L4"] {
        registry.subscribe(names::NEW_BLOCK, recorder.listener(label));
    }

    let report = registry.publish(names::NEW_BLOCK, test_new_block(1));

    assert_eq!(report.delivered, 5);
    assert_eq!(recorder.labels(), vec!["L0", "L1", "L2", "L3", "L4"]);
}

#[test]
fn test_persistent_then_once_listener() {
    let registry = EventRegistry::new();
    let recorder = DeliveryRecorder::new();
    registry.subscribe("block", recorder.listener("A"));
    let once = registry.subscribe_once("block", recorder.listener("B"));

    registry.publish("block", test_new_block(1));
    assert_eq!(recorder.labels(), vec!["A", "B"]);
    assert_eq!(registry.listener_count("block"), 1);
    assert!(!registry.contains(&once));

    registry.publish("block", test_new_block(2));
    assert_eq!(recorder.labels(), vec!["A", "B", "A"]);

    let heights: Vec<_> = recorder
        .deliveries()
        .iter()
        .filter_map(|d| height(&d.event))
        .collect();
    assert_eq!(heights, vec![1, 1, 2]);

    // The once-listener already removed itself.
    assert!(!registry.unsubscribe(&once));
}

#[test]
fn test_unsubscribe_keeps_survivor_order() {
    let registry = EventRegistry::new();
    let recorder = DeliveryRecorder::new();
    let a = registry.subscribe("tx", recorder.listener("A"));
    registry.subscribe("tx", recorder.listener("B"));
    let c = registry.subscribe("tx", recorder.listener("C"));
    registry.subscribe("tx", recorder.listener("D"));

    assert!(registry.unsubscribe(&a));
    assert!(registry.unsubscribe(&c));
    assert!(!registry.unsubscribe(&a));

    registry.publish("tx", test_new_transaction("0x01"));
    assert_eq!(recorder.labels(), vec!["B", "D"]);
}

#[test]
fn test_publish_without_listeners_is_noop() {
    let (registry, faults) = test_registry();

    let report = registry.publish("nobody.listens", test_new_block(1));

    assert_eq!(report.total(), 0);
    assert!(registry.is_empty());
    assert!(registry.event_names().is_empty());
    assert!(faults.is_empty());
}

#[test]
fn test_failing_listener_does_not_stop_delivery() {
    let (registry, faults) = test_registry();
    let recorder = DeliveryRecorder::new();
    registry.subscribe_fallible("x", recorder.failing_listener("A", "rejected"));
    registry.subscribe("x", recorder.listener("B"));

    let report = registry.publish("x", Event::new("v"));

    assert_eq!(recorder.labels(), vec!["A", "B"]);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(faults.len(), 1);
    assert_eq!(faults.faults()[0].event_name.as_str(), "x");
    assert!(!faults.faults()[0].panicked);
}

#[test]
fn test_panicking_listener_is_contained() {
    let (registry, faults) = test_registry();
    let recorder = DeliveryRecorder::new();
    registry.register(
        "x",
        Listener::new(recorder.panicking_listener("A", "kaboom")).with_label("A"),
    );
    registry.subscribe("x", recorder.listener("B"));

    registry.publish("x", Event::empty());
    registry.publish("x", Event::empty());

    // A stays subscribed after panicking.
    assert_eq!(recorder.labels(), vec!["A", "B", "A", "B"]);
    assert_eq!(faults.panic_count(), 2);
    assert_eq!(faults.faults()[0].label, "A");
}

#[test]
fn test_listener_added_during_publish_waits_for_next_call() {
    let registry = EventRegistry::new();
    let recorder = DeliveryRecorder::new();

    let weak = registry.downgrade();
    let late = recorder.clone();
    registry.subscribe_once("x", move |_| {
        if let Some(registry) = weak.upgrade() {
            registry.subscribe("x", late.listener("late"));
        }
    });
    registry.subscribe("x", recorder.listener("early"));

    registry.publish("x", Event::empty());
    assert_eq!(recorder.labels(), vec!["early"]);

    registry.publish("x", Event::empty());
    assert_eq!(recorder.labels(), vec!["early", "early", "late"]);
}

#[test]
fn test_reentrant_publish_cannot_retrigger_once_listener() {
    let registry = EventRegistry::new();
    let recorder = DeliveryRecorder::new();

    let weak = registry.downgrade();
    let record = recorder.listener("once");
    registry.subscribe_once("x", move |event| {
        record(event);
        if let Some(registry) = weak.upgrade() {
            registry.publish("x", Event::empty());
        }
    });

    registry.publish("x", Event::empty());
    assert_eq!(recorder.count("once"), 1);
    assert!(registry.is_empty());
}

#[test]
fn test_same_callback_twice_fires_twice() {
    let registry = EventRegistry::new();
    let recorder = DeliveryRecorder::new();
    let callback = std::sync::Arc::new(recorder.listener("dup"));

    let first = std::sync::Arc::clone(&callback);
    let second = std::sync::Arc::clone(&callback);
    let h1 = registry.subscribe("x", move |e| first(e));
    let h2 = registry.subscribe("x", move |e| second(e));
    assert_ne!(h1, h2);

    registry.publish("x", Event::empty());
    assert_eq!(recorder.count("dup"), 2);
}

#[test]
fn test_chain_event_names_route_payloads() {
    let registry = EventRegistry::new();
    let recorder = DeliveryRecorder::new();
    registry.subscribe(names::NEW_BLOCK, recorder.listener("blocks"));
    registry.subscribe(names::NEW_TRANSACTION, recorder.listener("txs"));

    for event in [test_new_block(5), test_new_transaction("0xaa"), test_new_block(6)] {
        registry.publish(event.event_name(), event);
    }

    assert_eq!(recorder.labels(), vec!["blocks", "txs", "blocks"]);
}
