mod handler;
mod model;

pub use handler::{
    create_dealer, create_farmer, create_retailer,
    delete_dealer, delete_farmer, delete_retailer,
    list_dealers, list_farmers, list_retailers,
    update_dealer, update_farmer, update_retailer,
};
