use crate::{Event, Notifier};
use herald_core::RawFault;
use scopeguard::defer;
use std::backtrace::Backtrace;
use std::panic::{AssertUnwindSafe, PanicHookInfo, catch_unwind, set_hook, take_hook};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Tag and fault type of reports about panics.
pub const PANIC_TAG: &str = "panic";

static REPORTING: AtomicBool = AtomicBool::new(false);

/// Installs a process-wide panic hook that reports every panic, waiting up to
/// `timeout` for the delivery, then hands over to the previously installed
/// hook.
///
/// A panic raised while another one is being reported is passed on without
/// being reported.
pub fn install(notifier: Notifier, timeout: Duration) {
    let previous_hook = take_hook();

    set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            exclusively(|| report(&notifier, info, timeout))
        }));

        previous_hook(info);
    }));
}

/// Runs `report` unless another report is already running. The flag is
/// released even if `report` unwinds.
fn exclusively(report: impl FnOnce()) {
    if REPORTING.swap(true, Ordering::SeqCst) {
        return;
    }
    defer! { REPORTING.store(false, Ordering::SeqCst) }

    report();
}

fn report(notifier: &Notifier, info: &PanicHookInfo<'_>, timeout: Duration) {
    let backtrace = Backtrace::force_capture().to_string();
    let fault = RawFault::new(PANIC_TAG, payload_message(info)).with_backtrace_text(&backtrace);

    let location = info
        .location()
        .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()))
        .unwrap_or_else(|| "<unknown>".to_string());
    let thread_name = thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string();

    let event = Event::new(&fault)
        .with_tag(PANIC_TAG)
        .with_context_entry("panic.location", location)
        .with_context_entry("panic.thread", thread_name);

    match notifier.ingest_blocking(event, timeout) {
        Ok(result) => debug!(result = %result, "Panic reported"),
        Err(skipped) => debug!(skipped = ?skipped, "Panic not reported"),
    }
}

fn payload_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(message) = info.payload().downcast_ref::<&'static str>() {
        return (*message).to_string();
    }

    if let Some(message) = info.payload().downcast_ref::<String>() {
        return message.clone();
    }

    "Box<dyn Any>".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    fn explode() {
        panic!("report failed halfway");
    }

    #[test]
    fn reporting_flag_survives_unwinding_and_blocks_reentry() {
        // Given
        let runs = AtomicUsize::new(0);

        // When
        let unwound = catch_unwind(|| exclusively(explode));
        exclusively(|| {
            runs.fetch_add(1, Ordering::SeqCst);
            exclusively(|| {
                runs.fetch_add(10, Ordering::SeqCst);
            });
        });

        // Then
        assert!(unwound.is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!REPORTING.load(Ordering::SeqCst));
    }
}
