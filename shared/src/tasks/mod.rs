pub mod assigned_work;
pub mod query_subtable_lock;
pub mod task;
pub mod task_generator;
pub mod task_queue;
pub mod task_queue_config;
pub mod work_counters;
