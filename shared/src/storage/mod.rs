pub mod allocator;
pub mod arena;
