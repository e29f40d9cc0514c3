pub mod assessment;
pub mod catalog;
