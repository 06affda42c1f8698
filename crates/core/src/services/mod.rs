mod catalog;
mod profile;

pub use catalog::CatalogService;
pub use profile::ProfileService;
