pub mod fetcher;
pub mod markup;
pub mod parser;
