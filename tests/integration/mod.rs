//! End-to-end tests driving the `librarian` binary against scratch repositories

mod helpers;
mod test_automation;
mod test_generate;
mod test_migrate;
mod test_release;
