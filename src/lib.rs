//! Personal activity log. Record what you are doing, and the log works out how long each
//! activity lasted, what is going on right now and where the time went per category.
//!

pub mod activity;
pub mod cli;
pub mod fs;
pub mod storage;
pub mod utils;
