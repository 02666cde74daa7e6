pub mod fetch;
pub mod market;
pub mod news;
