pub mod setup_guard;

pub use setup_guard::require_setup_complete;
