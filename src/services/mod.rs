pub mod decode;
pub mod fetch_service;
pub mod synthesizer;
pub mod ticker;
