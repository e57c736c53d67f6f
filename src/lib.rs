//! Workspace root package.
//!
//! Exists so repository-wide tooling (git hooks via `cargo-husky`) has a
//! package to attach to; all functionality lives in the `crates/` members.
