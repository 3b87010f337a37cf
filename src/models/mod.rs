pub mod reservation;
pub mod token;
