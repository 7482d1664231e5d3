pub mod github;
#[cfg(test)]
pub mod memory_source;
#[cfg(test)]
pub mod mock_http;
pub mod sinks;
pub mod snowflake;
