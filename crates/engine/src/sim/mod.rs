pub mod plasma;
pub mod ripple;
