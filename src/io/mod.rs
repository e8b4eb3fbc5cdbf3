pub mod bed;
pub mod xml;
