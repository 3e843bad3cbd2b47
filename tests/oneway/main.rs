//! One-way messaging integration tests.

mod support;
mod send_receive;
