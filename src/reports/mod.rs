//! Printable documents
pub mod invoice_print;

pub use invoice_print::render_invoice;
