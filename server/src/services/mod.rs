pub mod catalog;
pub mod inventory;
pub mod profile;

pub use catalog::{CatalogService, CategoryCache};
pub use inventory::InventoryService;
pub use profile::{Page, ProfileService};
