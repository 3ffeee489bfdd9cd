//! Panic capture
//!
//! Kept in its own test binary because the panic hook is process-global.

use std::panic;

use resilink_reporter::{ErrorKind, ErrorReporter, MemorySink};

#[test]
fn test_panics_are_recorded_as_runtime_errors() {
    let reporter = ErrorReporter::new(MemorySink::new());
    reporter.install_panic_hook();

    let result: std::thread::Result<()> = panic::catch_unwind(|| panic!("render loop exploded"));
    assert!(result.is_err());

    let records = reporter.store().records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.kind, ErrorKind::Runtime);
    assert_eq!(record.message, "render loop exploded");
    assert_eq!(record.context["panic"], true);
    assert!(
        record.context["file"]
            .as_str()
            .is_some_and(|file| file.ends_with("panic_hook.rs"))
    );

    let _ = panic::take_hook();
}
