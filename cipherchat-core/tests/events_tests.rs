// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event Dispatch Tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cipherchat_core::{CallbackHandler, ChatEvent, EventDispatcher, EventHandler, SessionState};

fn state_event(state: SessionState) -> ChatEvent {
    ChatEvent::StateChanged {
        conversation_id: "conv-1".into(),
        state,
    }
}

#[test]
fn test_dispatcher_starts_empty() {
    let dispatcher = EventDispatcher::new();
    assert_eq!(dispatcher.handler_count(), 0);
    // No handlers: nothing to observe, must not panic
    dispatcher.dispatch(state_event(SessionState::Live));
}

#[test]
fn test_every_handler_receives_event() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = EventDispatcher::new();
    for _ in 0..3 {
        let count = Arc::clone(&count);
        dispatcher.add_handler(Arc::new(CallbackHandler::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })));
    }

    dispatcher.dispatch(state_event(SessionState::KeyReady));

    assert_eq!(dispatcher.handler_count(), 3);
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn test_events_arrive_in_dispatch_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut dispatcher = EventDispatcher::new();
    dispatcher.add_handler(Arc::new(CallbackHandler::new(move |event| {
        sink.lock().unwrap().push(event);
    })));

    dispatcher.dispatch(state_event(SessionState::KeyReady));
    dispatcher.dispatch(state_event(SessionState::Loading));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            state_event(SessionState::KeyReady),
            state_event(SessionState::Loading)
        ]
    );
}

#[test]
fn test_clear_handlers() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let mut dispatcher = EventDispatcher::new();
    dispatcher.add_handler(Arc::new(CallbackHandler::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })));

    dispatcher.clear_handlers();
    dispatcher.dispatch(state_event(SessionState::Closed));

    assert_eq!(dispatcher.handler_count(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

struct LiveCounter(AtomicUsize);

impl EventHandler for LiveCounter {
    fn on_event(&self, event: ChatEvent) {
        if matches!(
            event,
            ChatEvent::StateChanged {
                state: SessionState::Live,
                ..
            }
        ) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_custom_handler_and_cloned_dispatcher() {
    let counter = Arc::new(LiveCounter(AtomicUsize::new(0)));
    let mut dispatcher = EventDispatcher::new();
    dispatcher.add_handler(counter.clone());

    let cloned = dispatcher.clone();
    dispatcher.dispatch(state_event(SessionState::Live));
    cloned.dispatch(state_event(SessionState::Live));
    cloned.dispatch(state_event(SessionState::Closed));

    assert_eq!(counter.0.load(Ordering::SeqCst), 2);
}
