pub mod gmail;
pub mod newsapi;
pub mod rss;
