//! Application state shared across handlers.

use std::sync::Arc;

use crate::bling::{BlingClient, ProductSink};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    bling: BlingClient,
    products: Arc<dyn ProductSink>,
}

impl AppState {
    #[must_use]
    pub fn new(bling: BlingClient, products: Arc<dyn ProductSink>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { bling, products }),
        }
    }

    /// Bling ERP client.
    #[must_use]
    pub fn bling(&self) -> &BlingClient {
        &self.inner.bling
    }

    /// Where synchronized products are written.
    #[must_use]
    pub fn products(&self) -> &dyn ProductSink {
        self.inner.products.as_ref()
    }
}
