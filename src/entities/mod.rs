pub mod invoice;
pub mod maintenance_request;
pub mod product;
pub mod sequence_counter;
pub mod technician;

pub use invoice::{Entity as Invoice, InvoiceStatus};
pub use maintenance_request::{Entity as MaintenanceRequest, RequestCategory, RequestStatus};
pub use product::{Entity as Product, ProductCategory};
pub use sequence_counter::Entity as SequenceCounter;
pub use technician::Entity as Technician;
