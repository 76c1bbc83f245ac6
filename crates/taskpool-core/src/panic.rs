use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Invokes `job`, converting a panic into its payload message.
pub(crate) fn catch_task_panic<F>(job: F) -> Result<(), String>
where
    F: FnOnce(),
{
    catch_unwind(AssertUnwindSafe(job)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
