pub mod fragment_builder;
pub mod recording_generator;
pub mod test_group;

pub use fragment_builder::{fragment, line_table};
pub use recording_generator::RecordingTaskGenerator;
pub use test_group::TestGroup;
