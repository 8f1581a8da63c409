//! Scraping of the myrapidbus kiosk pages
pub mod bstp;
pub mod js_literal;
pub mod page_source;
pub mod resolver;
pub mod route_lookup;

pub use page_source::*;
pub use resolver::*;
