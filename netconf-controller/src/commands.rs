pub mod builtin;
pub mod configure;
pub mod discover;
pub mod simulate;
pub mod status;
