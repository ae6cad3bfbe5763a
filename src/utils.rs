use std::future::Future;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};

use crate::error::GearError;

/// Drive `future` to completion from synchronous code.
///
/// Inside a multi-threaded runtime the current worker is handed over with
/// `block_in_place`; outside any runtime a throwaway current-thread runtime is
/// built. A current-thread runtime cannot be blocked on and is reported as an error.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, GearError> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(future)))
        }
        Ok(_) => Err(GearError::Runtime(String::from(
            "cannot block inside a current-thread runtime",
        ))),
        Err(_) => {
            let runtime = Builder::new_current_thread().enable_all().build()?;
            Ok(runtime.block_on(future))
        }
    }
}
