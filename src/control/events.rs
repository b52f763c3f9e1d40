//! Event subscriptions.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::protocol::{
    ButtonUpdate, LedUpdate, LoadUpdate, StatusEvent, TaskUpdate, TemperatureUpdate,
};
use crate::subscription::{Notifications, Subscription};

use super::Control;

// ============================================================================
// Control - Events
// ============================================================================

impl Control {
    /// Registers a handler for every typed event.
    ///
    /// Handlers run on the connection's read task, in registration order,
    /// and must not block. No events are delivered after disconnect.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        let inner = &self.inner;
        match inner
            .event_handlers
            .insert_unless(Arc::new(handler), || inner.is_disconnected())
        {
            Ok(id) => inner.event_handlers.subscription(id),
            Err(_) => Subscription::inert(),
        }
    }

    /// Registers a handler for load level changes.
    pub fn on_load_update<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&LoadUpdate) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let StatusEvent::Load(update) = event {
                handler(update);
            }
        })
    }

    /// Registers a handler for LED changes.
    pub fn on_led_update<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&LedUpdate) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let StatusEvent::Led(update) = event {
                handler(update);
            }
        })
    }

    /// Registers a handler for task state changes.
    pub fn on_task_update<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&TaskUpdate) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let StatusEvent::Task(update) = event {
                handler(update);
            }
        })
    }

    /// Registers a handler for button presses and releases.
    pub fn on_button_update<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ButtonUpdate) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let StatusEvent::Button(update) = event {
                handler(update);
            }
        })
    }

    /// Registers a handler for thermostat readings.
    pub fn on_temperature_update<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&TemperatureUpdate) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let StatusEvent::Temperature(update) = event {
                handler(update);
            }
        })
    }

    /// Registers a handler called once when the connection is lost.
    ///
    /// Called immediately if the control is already disconnected.
    pub fn on_disconnected<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = &self.inner;
        match inner
            .disconnect_handlers
            .insert_unless(Arc::new(handler), || inner.is_disconnected())
        {
            Ok(id) => inner.disconnect_handlers.subscription(id),
            Err(handler) => {
                handler();
                Subscription::inert()
            }
        }
    }

    /// Returns a stream of every typed event from now on.
    ///
    /// The stream ends on disconnect.
    pub fn events(&self) -> Notifications<StatusEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |event| {
            let _ = tx.send(*event);
        });
        Notifications::new(rx, subscription)
    }
}

// ============================================================================
// Tests
// ============================================================================
