pub mod map;
pub mod panels;
