pub mod tree_tests;
pub mod root_tests;
