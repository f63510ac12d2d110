//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware required.

#![cfg(not(target_os = "espidf"))]

mod mock_ports;
mod recovery_tests;
mod router_tests;
mod scheduler_tests;
mod sim_node_tests;
