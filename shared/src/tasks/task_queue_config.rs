use std::default::Default;

/// Contains Config properties which will be used by a task queue
#[derive(Clone, Debug)]
pub struct TaskQueueConfig {
    /// Priority penalty per hypercube hop between the computing rank and the
    /// rank owning a reference fragment. Zero disables the preference.
    pub process_rank_favor_factor: f64,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            process_rank_favor_factor: 0.0,
        }
    }
}
