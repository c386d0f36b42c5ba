mod handler;
mod model;

pub use handler::{
    check_in,
    check_out,
    emergency_check_out,
    get_status,
    list_records,
    update_location,
    update_verification,
};
