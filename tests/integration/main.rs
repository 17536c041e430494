//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a slice of the control
//! plane against the mock board or the host pin map.  All tests run on the
//! host with no real hardware required.

mod control_plane_tests;
mod manager_tests;
mod mock_hw;
