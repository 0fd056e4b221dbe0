pub mod location;
pub mod requests;
pub mod ride;
pub mod vehicle;
