pub mod cascade;
pub mod domain;
pub mod infrastructure;
