// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod csv_export;
pub mod flux;
pub mod influx_repository;
pub mod ndjson_stream;
pub mod query_cache;
pub mod retry;
