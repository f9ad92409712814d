use crate::parser::{load_channel_order_file, load_error_bounds};
use anyhow::{Context, Result, bail};
use polar_common::construction::Method;
use polar_core::Construction;
use std::path::Path;

/// Builds the [`Construction`] for a method selected at run time.
///
/// Noise-driven methods need `noise`: the AWGN standard deviation for the
/// Gaussian approximation and the error-bound datasets, the erasure
/// probability for the erasure channel. File-driven methods need `path`: the
/// channel-order file itself, or the root directory of the error-bound
/// datasets. Files are read here, so the returned construction is ready for
/// the core ranker.
///
/// # Arguments
///
/// * `method` - Selected construction method
/// * `n` - Code length
/// * `noise` - Noise parameter, when the method uses one
/// * `path` - Resource location, when the method uses one
pub fn resolve(method: Method, n: usize, noise: Option<f64>, path: Option<&Path>) -> Result<Construction> {
    let noise = || match noise {
        Some(value) => Ok(value),
        None => bail!("the {} construction needs a noise value", method.name()),
    };
    let path = || match path {
        Some(path) => Ok(path),
        None => bail!("the {} construction needs a resource path", method.name()),
    };

    let construction = match method {
        Method::GaussianApproximation => Construction::GaussianApproximation { sigma: noise()? },
        Method::ReliabilityTable => Construction::ReliabilityTable,
        Method::ErrorBounds => {
            let bounds = load_error_bounds(path()?, n, noise()?)
                .context("Failed to load error bounds")?;
            Construction::ErrorBounds(bounds)
        }
        Method::ErasureChannel => Construction::ErasureChannel {
            erasure_probability: noise()?,
        },
        Method::ChannelOrder => {
            let order = load_channel_order_file(path()?, n).context("Failed to load channel order")?;
            Construction::ChannelOrder(order)
        }
    };

    Ok(construction)
}
