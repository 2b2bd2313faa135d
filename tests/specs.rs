//! Behavioral specifications for the `mill` CLI.
//!
//! These tests are black-box: they invoke the compiled `mill` binary and
//! verify stdout, stderr, and exit codes against a scratch `$HOME` (see
//! `specs/prelude.rs`). Fixture runs are seeded directly through
//! `mill-store`/`mill-core` so these specs never depend on an external
//! driver or program-host runtime being installed on the test machine.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cli/status.rs"]
mod cli_status;
#[path = "specs/cli/ls.rs"]
mod cli_ls;
#[path = "specs/cli/wait.rs"]
mod cli_wait;
#[path = "specs/cli/cancel.rs"]
mod cli_cancel;
#[path = "specs/cli/inspect.rs"]
mod cli_inspect;
#[path = "specs/cli/watch.rs"]
mod cli_watch;
#[path = "specs/cli/init.rs"]
mod cli_init;
#[path = "specs/cli/run.rs"]
mod cli_run;
