pub mod audit;
pub mod config;
pub mod merge;
pub mod model;
pub mod paths;
pub mod sanitize;
pub mod store;
pub mod transform;
pub mod util;
pub mod warn;
