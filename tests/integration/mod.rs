//! Integration tests for patrol
//!
//! Each test builds a throw-away git repository holding a Go module and runs the
//! compiled binary against it.

mod helpers;
mod test_affected;
