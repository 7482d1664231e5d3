pub mod result_cursor;
pub mod snowflake_warehouse_adapter;
pub mod sql_api_client;
