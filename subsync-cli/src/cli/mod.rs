pub mod args;
pub mod create;
