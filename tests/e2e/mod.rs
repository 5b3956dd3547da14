#![allow(dead_code)]

mod harness;
pub use harness::*;

mod admin_api_tests;
mod quota_api_tests;
