/// Common test utilities for integration tests
///
/// This module provides:
/// - A tempdir-rooted device layout (mirror plus live roots)
/// - Tree and manifest assertions
/// - Stand-in hashing and enumeration programs for the subprocess backend

pub mod assertions;
pub mod mock_commands;
pub mod test_helpers;
