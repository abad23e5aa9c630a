//! # Infrakit
//!
//! Infrakit is a small toolbox for scripting AWS infrastructure from Rust.
//! It does not model infrastructure as a graph or keep any state; each helper
//! performs one platform call (or a short, fixed sequence of calls) and hands
//! back the one value you most likely wanted out of the response.
//!
//! ## Contents
//!
//! - [`cidr`]: finding free `10.N.0.0/16` blocks for new VPCs. This is the only
//!   helper with an algorithm of its own, and it is a pure function so it can
//!   be used against any snapshot of used blocks.
//! - [`aws`]: one module per AWS service (CloudFront, DynamoDB, EC2, ECS,
//!   ELBv2, KMS, Lambda, Route53, S3, STS), each a set of `async` functions
//!   taking an [`aws::SdkConfig`].
//! - [`files`], [`directories`] and [`text`]: local filesystem and string
//!   helpers commonly needed by provisioning scripts.
//! - [`logger`]: installs a timestamped, leveled logger for the [`log`] facade.
//!
//! ## Error Handling
//!
//! The local helpers and the CIDR allocator return [`Error`], an enum with
//! one variant per failure and enough context (paths, patterns, counts) to
//! act on it. The AWS helpers return [`anyhow::Result`], since their errors
//! are SDK errors that callers almost always just propagate.
//!
//! Nothing here retries. A failed call is returned to the caller as-is.

use snafu::prelude::*;

pub mod aws;
pub mod cidr;
pub mod directories;
pub mod files;
pub mod logger;
pub mod text;

pub use cidr::CidrBlock;

/// Top-level error enum that encompasses all errors of the local helpers.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "Could only find {found} of the {requested} requested free CIDR blocks \
         before running past 10.255.0.0/16"
    ))]
    CidrSpaceExhausted { requested: usize, found: usize },

    #[snafu(display("'{block}' is not a CIDR block of the form 10.N.0.0/16"))]
    ParseCidr { block: String },

    #[snafu(display("Could not read file {path:?}: {source}"))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not create file {path:?}: {source}"))]
    CreateFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not write file {path:?}: {source}"))]
    WriteFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not delete file {path:?}: {source}"))]
    DeleteFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not change permissions of {path:?}: {source}"))]
    Permissions {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not create directory {path:?}: {source}"))]
    CreateDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not read directory {path:?}: {source}"))]
    ReadDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not change the working directory to {path:?}: {source}"))]
    ChangeDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not determine the working directory: {source}"))]
    WorkingDir { source: std::io::Error },

    #[snafu(display("Could not determine the home directory of the current user"))]
    HomeDir,

    #[snafu(display("Invalid regular expression '{pattern}': {source}"))]
    Regex {
        pattern: String,
        source: regex::Error,
    },

    #[snafu(display("Unknown log level '{input}', expected one of ERROR, WARNING, INFO, DEBUG, TRACE"))]
    UnknownLogLevel { input: String },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
