pub mod capabilities;
pub mod fetch;
pub mod list;
pub mod push;
