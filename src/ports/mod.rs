pub mod batch_source;
pub mod repository_port;
pub mod sink_writer;
pub mod warehouse_port;
