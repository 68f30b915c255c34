use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{error, info, warn};

use crate::domain::{DeadLetterQueue, Error, ErrorClass, Operation};

/// Logs every failed batch line at the severity its error class deserves.
#[derive(Default, Debug)]
pub struct TracingDeadLetterQueue {
    reported: AtomicUsize,
}

impl TracingDeadLetterQueue {
    pub fn reported(&self) -> usize {
        self.reported.load(Ordering::Relaxed)
    }
}

impl DeadLetterQueue for TracingDeadLetterQueue {
    fn report(&self, operation: Option<&Operation>, error: &Error) {
        self.reported.fetch_add(1, Ordering::Relaxed);
        let operation = operation.map(ToString::to_string).unwrap_or_default();
        match error.class() {
            ErrorClass::Integrity => error!(%operation, %error, "dead letter"),
            ErrorClass::Infrastructure => warn!(%operation, %error, "dead letter"),
            ErrorClass::Validation | ErrorClass::Rejected => {
                info!(%operation, %error, "dead letter")
            }
        }
    }
}
