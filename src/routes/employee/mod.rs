mod handler;
mod model;

pub use handler::{
    change_employment_status,
    check_email,
    check_employee_id,
    check_phone,
    create_employee,
    get_assigned_regions,
    get_employee,
    list_employees,
    replace_regions,
    reset_password,
    update_employee,
};
pub use model::{Employee, has_more};
