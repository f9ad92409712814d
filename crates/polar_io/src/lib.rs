//! I/O utilities for loading polar-code resources.
//!
//! Provides functions for reading external reliability data (explicit
//! channel-order files and error-bound datasets) and packed information
//! frame files (.b8), and for turning a construction method selected on the
//! command line into a ready [`polar_core::Construction`].

/// File loading utilities for packed information frames.
///
/// Reads and writes .b8 files, where every frame of K bits is stored least
/// significant bit first and padded to a whole number of bytes.
pub mod loader;

/// Parsers for reliability resources.
///
/// Parses channel-order files and error-bound datasets into the vectors the
/// core ranker consumes. Unreadable files are reported as
/// `PolarError::MissingResource`, structural problems as
/// `PolarError::MalformedResource`.
pub mod parser;

/// Resolution of a construction method into its input data.
pub mod construction;
