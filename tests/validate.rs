//! Integration tests for the `validate` command.
use energyhub::cli::handle_validate_command;
use energyhub::log::is_logger_initialised;
use energyhub::settings::Settings;
use std::path::PathBuf;

/// An integration test for the `validate` command.
///
/// We also check that the logger is initialised after it is run.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("ENERGYHUB_LOG_LEVEL", "off") };

    assert!(!is_logger_initialised());

    handle_validate_command(&PathBuf::from("demos/simple"), Some(Settings::default())).unwrap();

    assert!(is_logger_initialised());
}
