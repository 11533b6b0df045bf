/// Main configuration module.
/// 
/// Re-exports submodules for tutorial, server and anti-spam configuration.
pub mod tutorial;
pub mod server;
pub mod anti_spam;
