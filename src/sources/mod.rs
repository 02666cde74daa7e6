pub mod base;
pub mod llm;
pub mod mock_endpoint;
pub mod news_api;
