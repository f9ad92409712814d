//! Parsers for reliability resources.
//!
//! Two text formats are understood. A channel-order file lists the code
//! length, a channel label, the noise value it was computed for, and then
//! every bit-channel index from the most to the least reliable:
//!
//! ```text
//! # comment
//! 8
//! awgn
//! 0.700
//! 7 6 5 3 4 2 1 0
//! ```
//!
//! An error-bound dataset holds one `<index> <bound>` pair per line and lives
//! at `<root>/N<n>/<noise>.pb`, the noise being printed with three decimals.
//! Lines starting with `#` and blank lines are ignored in both formats.

use anyhow::{Context, Result};
use nom::IResult;
use nom::character::complete::{digit1, multispace0, not_line_ending, space1};
use nom::combinator::{all_consuming, map_res};
use nom::multi::separated_list1;
use nom::number::complete::double;
use nom::sequence::{preceded, separated_pair, terminated};
use polar_core::PolarError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Header of a channel-order file.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelOrderHeader {
    pub n: usize,
    pub label: String,
    pub noise: f64,
}

fn malformed(msg: String) -> anyhow::Error {
    anyhow::Error::new(PolarError::MalformedResource(msg))
}

/// Reads a resource file, reporting failures as [`PolarError::MissingResource`].
fn read_resource(path: &Path) -> std::result::Result<String, PolarError> {
    fs::read_to_string(path).map_err(|err| PolarError::MissingResource {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

fn index(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

fn index_list(input: &str) -> IResult<&str, Vec<usize>> {
    all_consuming(terminated(
        preceded(multispace0, separated_list1(space1, index)),
        multispace0,
    ))(input)
}

fn bound_line(input: &str) -> IResult<&str, (usize, f64)> {
    all_consuming(terminated(
        preceded(multispace0, separated_pair(index, space1, double)),
        multispace0,
    ))(input)
}

fn label(input: &str) -> IResult<&str, &str> {
    preceded(multispace0, not_line_ending)(input)
}

/// Significant lines: trimmed, neither blank nor comments, with their
/// one-based line numbers.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Parses a channel-order file for a code of length `n`.
///
/// # Arguments
///
/// * `text` - File contents
/// * `n` - Expected code length
///
/// # Returns
///
/// The header and the channel indices, most reliable first. The file must
/// declare `n` and list exactly `n` indices; whether they form a permutation
/// is checked by the ranker.
pub fn parse_channel_order(text: &str, n: usize) -> Result<(ChannelOrderHeader, Vec<usize>)> {
    let mut lines = content_lines(text);
    let mut next = |what: &str| {
        lines
            .next()
            .ok_or_else(|| malformed(format!("channel-order file ends before the {}", what)))
    };

    let (line_no, line) = next("code length")?;
    let (_, declared) = all_consuming(terminated(index, multispace0))(line)
        .map_err(|_| malformed(format!("line {}: expected a code length, found '{}'", line_no, line)))?;
    if declared != n {
        return Err(malformed(format!(
            "channel-order file is for N = {}, requested N = {}",
            declared, n
        )));
    }

    let (_, line) = next("channel label")?;
    let label = label(line)
        .map(|(_, l)| l.trim().to_string())
        .map_err(|_| malformed("unreadable channel label".to_string()))?;

    let (line_no, line) = next("noise value")?;
    let (_, noise) = all_consuming(terminated(double, multispace0))(line)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| {
            malformed(format!("line {}: expected a noise value, found '{}'", line_no, line))
        })?;

    let mut order = Vec::with_capacity(n);
    for (line_no, line) in lines {
        let (_, indices) = index_list(line)
            .map_err(|_| malformed(format!("line {}: expected channel indices", line_no)))?;
        order.extend(indices);
    }
    if order.len() != n {
        return Err(malformed(format!(
            "expected {} channel indices, found {}",
            n,
            order.len()
        )));
    }

    Ok((ChannelOrderHeader { n, label, noise }, order))
}

/// Loads a channel-order file, see [`parse_channel_order`].
pub fn load_channel_order_file<P: AsRef<Path>>(path: P, n: usize) -> Result<Vec<usize>> {
    let path = path.as_ref();
    let text = read_resource(path)
        .with_context(|| format!("Failed to open channel-order file {}", path.display()))?;
    let (header, order) = parse_channel_order(&text, n)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    info!(
        path = %path.display(),
        n = header.n,
        label = %header.label,
        noise = header.noise,
        "loaded channel order"
    );
    Ok(order)
}

/// Parses an error-bound dataset for a code of length `n`.
///
/// # Returns
///
/// One bound per bit-channel, indexed by channel. Every index in `[0, n)`
/// must appear exactly once.
pub fn parse_error_bounds(text: &str, n: usize) -> Result<Vec<f64>> {
    let mut bounds: Vec<Option<f64>> = vec![None; n];

    for (line_no, line) in content_lines(text) {
        let (_, (idx, bound)) = bound_line(line).map_err(|_| {
            malformed(format!("line {}: expected '<index> <bound>', found '{}'", line_no, line))
        })?;
        let slot = bounds.get_mut(idx).ok_or_else(|| {
            malformed(format!("line {}: channel {} out of range for N = {}", line_no, idx, n))
        })?;
        if slot.replace(bound).is_some() {
            return Err(malformed(format!("line {}: channel {} listed twice", line_no, idx)));
        }
    }

    bounds
        .into_iter()
        .enumerate()
        .map(|(idx, b)| b.ok_or_else(|| malformed(format!("channel {} has no error bound", idx))))
        .collect()
}

/// Location of the dataset file for `(n, noise)` under `root`.
pub fn error_bounds_path<P: AsRef<Path>>(root: P, n: usize, noise: f64) -> PathBuf {
    root.as_ref()
        .join(format!("N{}", n))
        .join(format!("{:.3}.pb", noise))
}

/// Loads the error-bound dataset for `(n, noise)` under `root`.
pub fn load_error_bounds<P: AsRef<Path>>(root: P, n: usize, noise: f64) -> Result<Vec<f64>> {
    let path = error_bounds_path(root, n, noise);
    let text = read_resource(&path)
        .with_context(|| format!("Failed to open error-bound dataset {}", path.display()))?;
    let bounds = parse_error_bounds(&text, n)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    info!(path = %path.display(), n, noise, "loaded error bounds");
    Ok(bounds)
}
