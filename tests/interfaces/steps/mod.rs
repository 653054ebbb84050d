//! Step definitions for interface tests.
