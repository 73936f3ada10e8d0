pub mod common;
pub mod invoices;
pub mod maintenance_requests;
pub mod products;
pub mod technicians;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        invoices::InvoiceService, maintenance_requests::MaintenanceRequestService,
        numbering::SequenceAllocator, products::ProductService, storage::ImageStore,
        technicians::TechnicianService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub technicians: Arc<TechnicianService>,
    pub requests: Arc<MaintenanceRequestService>,
    pub invoices: Arc<InvoiceService>,
    pub products: Arc<ProductService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig, images: Arc<dyn ImageStore>) -> Self {
        let numbering = SequenceAllocator::new(config.numbering_strategy);

        Self {
            technicians: Arc::new(TechnicianService::new(db_pool.clone())),
            requests: Arc::new(MaintenanceRequestService::new(db_pool.clone(), numbering)),
            invoices: Arc::new(InvoiceService::new(db_pool.clone(), numbering)),
            products: Arc::new(ProductService::new(
                db_pool,
                images,
                config.receipt_prefix.clone(),
            )),
        }
    }
}
