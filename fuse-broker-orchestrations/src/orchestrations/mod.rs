pub mod deploy;
pub mod last_operation;
pub mod remove;
pub mod role_bindings;
