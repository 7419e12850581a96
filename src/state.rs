use std::sync::Arc;

use opentelemetry::{global, metrics::Counter};

use crate::store::Store;
use crate::telemetry::SERVICE_NAME;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub users_created_counter: Counter<u64>,
    pub items_created_counter: Counter<u64>,
}

impl AppState {
    /// Counters come from the global meter provider, a no-op unless OTLP
    /// export was initialised.
    pub fn new(store: Arc<dyn Store>) -> Self {
        let meter = global::meter(SERVICE_NAME);
        Self {
            store,
            users_created_counter: meter
                .u64_counter("users_created")
                .with_description("Users created")
                .build(),
            items_created_counter: meter
                .u64_counter("items_created")
                .with_description("Items created")
                .build(),
        }
    }
}
