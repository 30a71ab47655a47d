// Library root: NBA per-game stats import into SQLite. The CLI and the
// integration tests use the modules below.

pub mod config;
pub mod db;
pub mod importer;
pub mod mapper;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod record;
pub mod report;
pub mod schema;
