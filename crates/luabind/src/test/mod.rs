// Test module organization
pub mod test_coroutine;
pub mod test_registry;
pub mod test_stack;
pub mod test_table;
