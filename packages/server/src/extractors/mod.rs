pub mod form;
pub mod path;
pub mod query;
