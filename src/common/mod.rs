pub mod file_utils;
pub mod git;
