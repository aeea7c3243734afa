pub mod admin;
pub mod audit;
pub mod dashboard;
pub mod donations;
pub mod materials;
