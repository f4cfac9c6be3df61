//! Panic trapping
//!
//! While a [`PanicTrap`] is held on a thread, panics raised there are not
//! printed; their location is kept so [`guarded`] can turn the unwind into a
//! `Failure::Panic`. Threads without an active trap keep the previous hook.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use crate::error::{Failure, Outcome};

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Active for the lifetime of a group run on the current thread
pub struct PanicTrap {
    _not_send: PhantomData<*const ()>,
}

impl PanicTrap {
    pub fn install() -> Self {
        INSTALL.call_once(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                if is_active() {
                    let location = info
                        .location()
                        .map(|l| l.to_string())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    LOCATION.with(|slot| *slot.borrow_mut() = Some(location));
                } else {
                    previous(info);
                }
            }));
        });
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for PanicTrap {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Whether a trap is active on this thread
pub fn is_active() -> bool {
    DEPTH.with(|depth| depth.get() > 0)
}

/// Run a body, converting a panic into a failure
pub fn guarded<F>(body: F) -> Outcome
where
    F: FnOnce() -> Outcome,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let location = LOCATION
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_else(|| "<unknown>".to_string());
            Err(Failure::Panic {
                message: payload_message(payload.as_ref()),
                location,
            }
            .into())
        }
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Signal;

    #[test]
    fn test_trap_scope() {
        assert!(!is_active());
        {
            let _outer = PanicTrap::install();
            {
                let _inner = PanicTrap::install();
                assert!(is_active());
            }
            assert!(is_active());
        }
        assert!(!is_active());
    }

    #[test]
    fn test_guarded_captures_panic_with_location() {
        let _trap = PanicTrap::install();
        let outcome = guarded(|| {
            let values: Vec<u32> = Vec::new();
            if values.is_empty() {
                panic!("index {} out of range", 3);
            }
            Ok(())
        });

        match outcome {
            Err(Signal::Failure(Failure::Panic { message, location })) => {
                assert_eq!(message, "index 3 out of range");
                assert!(location.contains("trap.rs"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_guarded_passes_signals_through() {
        assert!(guarded(|| Ok(())).is_ok());
        match guarded(|| Err(Signal::Skipped("later".into()))) {
            Err(Signal::Skipped(msg)) => assert_eq!(msg, "later"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
