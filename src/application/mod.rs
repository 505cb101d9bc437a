// Application layer - Use cases and the repository boundary
pub mod dashboard_service;
pub mod reading_repository;
pub mod streaming_service;
