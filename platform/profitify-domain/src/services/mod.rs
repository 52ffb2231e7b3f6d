pub mod calendar;
pub mod generator;
pub mod reference;
