//! Typed command bus and event bus (§4.1).
//!
//! Rust has no runtime reflection, so the "registry keyed by command/event
//! type" the design calls for is built on `TypeId` + type-erased boxed
//! closures rather than a string-keyed table: each `register`/`subscribe`
//! call captures the caller's concrete `Command`/`Event` type in a closure,
//! boxes it behind `Any`, and `execute`/`publish` downcast back to it. The
//! keying is still exact-type, one handler slot per command type, fan-out
//! per event type, exactly like `AdapterRegistry` keys by `sourceType`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use common::error::AppError;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Marker trait for a command: a single request with a single typed result,
/// dispatched to exactly one handler.
pub trait Command: Send + 'static {
    type Result: Send + 'static;
}

/// Marker trait for an event: a fact broadcast to zero or more subscribers,
/// none of whom can fail the publish.
pub trait Event: Clone + Send + Sync + 'static {}

type CommandHandlerFn<C> =
    Arc<dyn Fn(C) -> BoxFuture<'static, Result<<C as Command>::Result, AppError>> + Send + Sync>;

type EventHandlerFn<E> = Arc<dyn Fn(E) -> BoxFuture<'static, Result<(), AppError>> + Send + Sync>;

/// Routes each command to the single handler registered for its type.
/// Dispatch to an unregistered command type is rejected with
/// [`AppError::NoHandler`] rather than panicking (§4.1, §7).
#[derive(Default)]
pub struct CommandBus {
    handlers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `C`. Registering twice for the same
    /// command type overwrites the previous handler, mirroring
    /// [`common::ports::source_adapter::AdapterRegistry`]'s semantics.
    pub fn register<C, F, Fut>(&mut self, handler: F)
    where
        C: Command,
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C::Result, AppError>> + Send + 'static,
    {
        let boxed: CommandHandlerFn<C> = Arc::new(move |cmd| Box::pin(handler(cmd)));
        self.handlers.insert(TypeId::of::<C>(), Box::new(boxed));
    }

    /// Dispatches `cmd` synchronously (from the caller's point of view: the
    /// future resolves only once the handler has fully run) to its
    /// registered handler, propagating whatever error the handler returns.
    pub async fn execute<C: Command>(&self, cmd: C) -> Result<C::Result, AppError> {
        let handler = self
            .handlers
            .get(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_ref::<CommandHandlerFn<C>>())
            .ok_or_else(|| AppError::NoHandler(std::any::type_name::<C>().to_string()))?
            .clone();
        handler(cmd).await
    }

    pub fn is_registered<C: Command>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<C>())
    }
}

/// Fans an event out to every subscriber registered for its type. A
/// subscriber's failure is logged and isolated; it never fails the publish
/// or blocks sibling subscribers from running (§4.1). Subscribers for a
/// single event run serially, in registration order, awaited one at a time;
/// this is a deliberate choice (over concurrent fan-out) to keep handler
/// side effects on a given event ordered and easy to reason about.
///
/// Unlike [`CommandBus`], the handler table lives behind a `Mutex` rather
/// than requiring `&mut self` to register: pipeline sagas subscribe
/// handlers that themselves publish further events on this same bus, so the
/// bus has to already exist as a shared `Arc` at subscription time — it
/// can't be built mutably and frozen afterwards the way the command table
/// is.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<TypeId, Vec<Box<dyn Any + Send + Sync>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<E, F, Fut>(&self, handler: F)
    where
        E: Event,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let boxed: EventHandlerFn<E> = Arc::new(move |evt| Box::pin(handler(evt)));
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Box::new(boxed));
    }

    pub async fn publish<E: Event>(&self, event: E) {
        let handlers: Vec<EventHandlerFn<E>> = {
            let table = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
            let Some(boxed_handlers) = table.get(&TypeId::of::<E>()) else {
                return;
            };
            boxed_handlers
                .iter()
                .filter_map(|boxed| boxed.downcast_ref::<EventHandlerFn<E>>().cloned())
                .collect()
        };
        for handler in handlers {
            if let Err(err) = handler(event.clone()).await {
                tracing::error!(
                    error = %err,
                    event_type = std::any::type_name::<E>(),
                    "event subscriber failed"
                );
            }
        }
    }

    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Ping;
    impl Command for Ping {
        type Result = &'static str;
    }

    struct Boom;
    impl Command for Boom {
        type Result = ();
    }

    #[tokio::test]
    async fn executes_registered_command() {
        let mut bus = CommandBus::new();
        bus.register::<Ping, _, _>(|_| async { Ok("pong") });

        let result = bus.execute(Ping).await.unwrap();
        assert_eq!(result, "pong");
    }

    #[tokio::test]
    async fn unregistered_command_returns_no_handler() {
        let bus = CommandBus::new();
        let err = bus.execute(Boom).await.unwrap_err();
        assert!(matches!(err, AppError::NoHandler(_)));
    }

    #[tokio::test]
    async fn re_registering_overwrites_the_previous_handler() {
        let mut bus = CommandBus::new();
        bus.register::<Ping, _, _>(|_| async { Ok("v1") });
        bus.register::<Ping, _, _>(|_| async { Ok("v2") });

        assert_eq!(bus.execute(Ping).await.unwrap(), "v2");
    }

    #[derive(Clone)]
    struct Tick(u32);
    impl Event for Tick {}

    #[tokio::test]
    async fn publish_fans_out_to_every_subscriber() {
        let bus = EventBus::new();
        let seen_a = Arc::new(AtomicU32::new(0));
        let seen_b = Arc::new(AtomicU32::new(0));

        let a = seen_a.clone();
        bus.subscribe::<Tick, _, _>(move |tick: Tick| {
            let a = a.clone();
            async move {
                a.fetch_add(tick.0, Ordering::SeqCst);
                Ok(())
            }
        });
        let b = seen_b.clone();
        bus.subscribe::<Tick, _, _>(move |tick: Tick| {
            let b = b.clone();
            async move {
                b.fetch_add(tick.0, Ordering::SeqCst);
                Ok(())
            }
        });

        bus.publish(Tick(7)).await;

        assert_eq!(seen_a.load(Ordering::SeqCst), 7);
        assert_eq!(seen_b.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn a_failing_subscriber_does_not_block_siblings() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicU32::new(0));

        bus.subscribe::<Tick, _, _>(|_| async {
            Err(AppError::Validation("boom".to_string()))
        });
        let s = seen.clone();
        bus.subscribe::<Tick, _, _>(move |tick: Tick| {
            let s = s.clone();
            async move {
                s.fetch_add(tick.0, Ordering::SeqCst);
                Ok(())
            }
        });

        bus.publish(Tick(3)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn publishing_with_no_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.publish(Tick(1)).await;
    }

    #[test]
    fn subscriber_count_reflects_registrations() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count::<Tick>(), 0);
        bus.subscribe::<Tick, _, _>(|_| async { Ok(()) });
        bus.subscribe::<Tick, _, _>(|_| async { Ok(()) });
        assert_eq!(bus.subscriber_count::<Tick>(), 2);
    }
}
