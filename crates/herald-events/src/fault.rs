//! Side-channel reporting of listener failures.

use std::any::Any;
use std::fmt;

use tracing::{error, warn};

use crate::error::ListenerError;
use crate::event::EventName;
use crate::listener::ListenerId;

/// How a listener invocation went wrong.
#[derive(Debug)]
pub enum FaultKind {
    /// The callback returned an error.
    Failed(ListenerError),
    /// The callback panicked. Holds the panic message when it was a string.
    Panicked(String),
}

/// A failed listener invocation, as handed to a [`FaultReporter`].
#[derive(Debug)]
pub struct ListenerFault {
    /// Channel being published on.
    pub event_name: EventName,
    /// Listener that failed.
    pub listener_id: ListenerId,
    /// Listener label.
    pub label: String,
    /// What happened.
    pub kind: FaultKind,
}

impl ListenerFault {
    pub(crate) fn panicked(
        event_name: &EventName,
        listener_id: ListenerId,
        label: &str,
        payload: &(dyn Any + Send),
    ) -> Self {
        Self {
            event_name: event_name.clone(),
            listener_id,
            label: label.to_owned(),
            kind: FaultKind::Panicked(panic_message(payload)),
        }
    }

    /// Whether the listener panicked rather than returning an error.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self.kind, FaultKind::Panicked(_))
    }
}

impl fmt::Display for ListenerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FaultKind::Failed(e) => write!(
                f,
                "listener '{}' on '{}' failed: {e}",
                self.label, self.event_name
            ),
            FaultKind::Panicked(msg) => write!(
                f,
                "listener '{}' on '{}' panicked: {msg}",
                self.label, self.event_name
            ),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Receives listener failures that the registry swallowed.
pub trait FaultReporter: Send + Sync {
    /// Record one failure.
    ///
    /// Should not panic. If it does, the registry logs the panic at error
    /// level and keeps delivering to the remaining listeners.
    fn report(&self, fault: &ListenerFault);
}

impl<F> FaultReporter for F
where
    F: Fn(&ListenerFault) + Send + Sync,
{
    fn report(&self, fault: &ListenerFault) {
        self(fault);
    }
}

/// Default reporter: writes faults to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFaultReporter;

impl FaultReporter for TracingFaultReporter {
    fn report(&self, fault: &ListenerFault) {
        match &fault.kind {
            FaultKind::Failed(e) => warn!(
                event_name = %fault.event_name,
                listener_id = %fault.listener_id,
                listener = %fault.label,
                error = %e,
                "Listener failed"
            ),
            FaultKind::Panicked(msg) => error!(
                event_name = %fault.event_name,
                listener_id = %fault.listener_id,
                listener = %fault.label,
                panic = %msg,
                "Listener panicked"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn fault(kind: FaultKind) -> ListenerFault {
        ListenerFault {
            event_name: EventName::from("x"),
            listener_id: crate::Listener::new(|_| {}).id(),
            label: "a".to_owned(),
            kind,
        }
    }

    #[test]
    fn test_fault_display() {
        let f = fault(FaultKind::Failed(ListenerError::msg("bad input")));
        assert_eq!(f.to_string(), "listener 'a' on 'x' failed: bad input");
        assert!(!f.is_panic());

        let f = fault(FaultKind::Panicked("index out of bounds".to_owned()));
        assert_eq!(f.to_string(), "listener 'a' on 'x' panicked: index out of bounds");
        assert!(f.is_panic());
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(17_u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_closure_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = |f: &ListenerFault| seen.lock().unwrap().push(f.to_string());

        reporter.report(&fault(FaultKind::Panicked("p".to_owned())));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_tracing_reporter_levels() {
        let logs = crate::test_logs::capture_logs(|| {
            TracingFaultReporter.report(&fault(FaultKind::Failed(ListenerError::msg("e"))));
            TracingFaultReporter.report(&fault(FaultKind::Panicked("p".to_owned())));
        });

        let failed = crate::test_logs::line_with(&logs, "Listener failed").unwrap();
        assert!(failed.contains("WARN"), "{failed}");
        assert!(failed.contains("event_name=x"), "{failed}");
        assert!(failed.contains("listener=a"), "{failed}");
        assert!(failed.contains("error=e"), "{failed}");

        let panicked = crate::test_logs::line_with(&logs, "Listener panicked").unwrap();
        assert!(panicked.contains("ERROR"), "{panicked}");
        assert!(panicked.contains("listener=a"), "{panicked}");
        assert!(panicked.contains("panic=p"), "{panicked}");
    }
}
