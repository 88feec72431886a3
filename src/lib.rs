pub mod aggregate;
pub mod figure;
pub mod geocode;
pub mod loader;
pub mod output;
pub mod server;
pub mod variant;
