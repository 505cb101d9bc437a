// Domain layer - Pure values and transformations, no I/O
pub mod category;
pub mod color;
pub mod filter;
pub mod map;
pub mod reading;
pub mod segment;
pub mod stats;
pub mod table;
pub mod thresholds;
pub mod zone;
