pub mod startup;

pub use startup::handle_startup;
