pub mod rides;
pub mod vehicles;
