//! Lifecycle notifications for conversions.
//!
//! Register observers with [`crate::ConvertorioClient::on`] to receive events
//! as the workflow moves through its steps:
//!
//! | Kind | Fired |
//! |------|-------|
//! | `Start` | once, before any network call |
//! | `Progress` | before each of the five protocol steps |
//! | `Status` | after every status check |
//! | `Complete` | once, with the [`ConversionResult`] |
//! | `Error` | once, on any failure, before the error is returned |
//!
//! Observers for a kind run synchronously, in registration order. An
//! observer returning `Err` aborts the conversion just like a transport
//! failure would. The registry lives on the client, so several clients in one
//! process never see each other's events.
//!
//! # Example
//!
//! ```rust
//! use convertorio::events::{Event, EventDispatcher, EventKind};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let dispatcher = EventDispatcher::new();
//! let polls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&polls);
//! dispatcher.on(EventKind::Status, move |event| {
//!     if let Event::Status(s) = event {
//!         eprintln!("{} ({}/{})", s.status, s.attempt, s.max_attempts);
//!     }
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! });
//! assert_eq!(dispatcher.observer_count(EventKind::Status), 1);
//! ```

use crate::error::{ConvertError, ErrorKind, ObserverError};
use crate::job::JobStatus;
use crate::output::ConversionResult;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// The five notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Progress,
    Status,
    Complete,
    Error,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Progress => "progress",
            EventKind::Status => "status",
            EventKind::Complete => "complete",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The protocol step a [`ProgressEvent`] announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStep {
    RequestingUploadUrl,
    Uploading,
    Confirming,
    Converting,
    Downloading,
}

impl ProgressStep {
    /// Human-readable description of the step.
    pub fn message(self) -> &'static str {
        match self {
            ProgressStep::RequestingUploadUrl => "Requesting upload URL from server...",
            ProgressStep::Uploading => "Uploading file to cloud storage...",
            ProgressStep::Confirming => "Confirming upload and queuing conversion...",
            ProgressStep::Converting => "Converting file...",
            ProgressStep::Downloading => "Downloading converted file...",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartEvent {
    pub file_name: String,
    pub source_format: String,
    pub target_format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub step: ProgressStep,
    pub message: String,
    /// Known from the `Uploading` step on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Status returned by the confirm call; only set on `Converting`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    pub job_id: String,
    pub status: JobStatus,
    /// 1-based index of this status check.
    pub attempt: u32,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    /// Display text of the error that ended the conversion.
    pub error: String,
    pub kind: ErrorKind,
    pub input_path: PathBuf,
    /// Target format exactly as the caller supplied it.
    pub target_format: String,
}

/// A notification payload. Only valid for the duration of the observer call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum Event {
    Start(StartEvent),
    Progress(ProgressEvent),
    Status(StatusEvent),
    Complete(ConversionResult),
    Error(ErrorEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Start(_) => EventKind::Start,
            Event::Progress(_) => EventKind::Progress,
            Event::Status(_) => EventKind::Status,
            Event::Complete(_) => EventKind::Complete,
            Event::Error(_) => EventKind::Error,
        }
    }
}

/// A registered callback.
pub type Observer = Arc<dyn Fn(&Event) -> Result<(), ObserverError> + Send + Sync>;

/// Event-kind → ordered observer list.
///
/// Registration appends (duplicates allowed, no unregister). Dispatch takes a
/// snapshot of the list first, so observers may register further observers
/// without deadlocking; those take effect from the next event.
#[derive(Default)]
pub struct EventDispatcher {
    observers: RwLock<HashMap<EventKind, Vec<Observer>>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.observers.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&'static str, usize> =
            map.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("EventDispatcher")
            .field("observers", &counts)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer for `kind`.
    pub fn on<F>(&self, kind: EventKind, observer: F)
    where
        F: Fn(&Event) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(Arc::new(observer));
    }

    /// Number of observers registered for `kind`.
    pub fn observer_count(&self, kind: EventKind) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Invoke every observer for the event's kind, in order.
    ///
    /// Stops at the first observer that returns `Err` and reports it as
    /// [`ConvertError::Observer`]; later observers are not called.
    pub fn emit(&self, event: &Event) -> Result<(), ConvertError> {
        let kind = event.kind();
        let snapshot: Vec<Observer> = {
            let map = self.observers.read().unwrap_or_else(PoisonError::into_inner);
            match map.get(&kind) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => return Ok(()),
            }
        };

        for observer in snapshot {
            observer(event).map_err(|source| ConvertError::Observer {
                event: kind.as_str(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn start_event() -> Event {
        Event::Start(StartEvent {
            file_name: "photo.png".into(),
            source_format: "png".into(),
            target_format: "jpg".into(),
        })
    }

    #[test]
    fn emit_without_observers_is_noop() {
        let d = EventDispatcher::new();
        assert!(d.emit(&start_event()).is_ok());
        assert_eq!(d.observer_count(EventKind::Start), 0);
    }

    #[test]
    fn observers_run_in_registration_order_with_duplicates() {
        let d = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "a"] {
            let seen = Arc::clone(&seen);
            d.on(EventKind::Start, move |_| {
                seen.lock().unwrap().push(tag);
                Ok(())
            });
        }
        d.emit(&start_event()).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "a"]);
    }

    #[test]
    fn observers_only_see_their_kind() {
        let d = EventDispatcher::new();
        let hits = Arc::new(Mutex::new(0));
        let h = Arc::clone(&hits);
        d.on(EventKind::Error, move |_| {
            *h.lock().unwrap() += 1;
            Ok(())
        });
        d.emit(&start_event()).unwrap();
        assert_eq!(*hits.lock().unwrap(), 0);
    }

    #[test]
    fn failing_observer_stops_dispatch() {
        let d = EventDispatcher::new();
        let later = Arc::new(Mutex::new(false));
        d.on(EventKind::Start, |_| Err("boom".into()));
        let l = Arc::clone(&later);
        d.on(EventKind::Start, move |_| {
            *l.lock().unwrap() = true;
            Ok(())
        });

        let err = d.emit(&start_event()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Observer);
        assert!(err.to_string().contains("'start'"));
        assert!(!*later.lock().unwrap());
    }

    #[test]
    fn observer_may_register_during_dispatch() {
        let d = Arc::new(EventDispatcher::new());
        let inner = Arc::clone(&d);
        d.on(EventKind::Start, move |_| {
            inner.on(EventKind::Start, |_| Ok(()));
            Ok(())
        });
        d.emit(&start_event()).unwrap();
        assert_eq!(d.observer_count(EventKind::Start), 2);
    }

    #[test]
    fn event_serialises_with_tag() {
        let json = serde_json::to_value(Event::Progress(ProgressEvent {
            step: ProgressStep::RequestingUploadUrl,
            message: ProgressStep::RequestingUploadUrl.message().into(),
            job_id: None,
            status: None,
        }))
        .unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["data"]["step"], "requesting-upload-url");
    }
}
