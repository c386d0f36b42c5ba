mod handler;
mod model;

pub use handler::{create_region, delete_region, get_region, list_regions, update_region};
pub use model::Region;
