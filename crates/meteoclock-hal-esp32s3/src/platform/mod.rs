pub mod display;
pub mod time;
