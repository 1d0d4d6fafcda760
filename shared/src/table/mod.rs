pub mod bound;
pub mod local_table;
pub mod metric;
pub mod subtable;
