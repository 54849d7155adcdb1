//! JSON files produced by the offline training/quantization step.
//!
//! Every number is an already-quantized raw fixed-point value.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use svm_core::reference::{kernel_score, linear_score};
use svm_core::{
    Accelerator, CoreConfig, KernelLut, KernelModel, KernelOperands, Lane, LinearModel,
    LinearOperands, QFormat, Score,
};
use tracing::info;

/// `{"weights": [..], "bias": b}`
#[derive(Debug, Clone, Deserialize)]
pub struct LinearParams {
    pub weights: Vec<i32>,
    pub bias: i32,
}

/// `{"support_vectors": [[..]], "dual_coef": [[..]], "bias": b, "gamma": g}`
#[derive(Debug, Clone, Deserialize)]
pub struct KernelParams {
    pub support_vectors: Vec<Vec<i32>>,
    /// One row per binary problem; only the first is used.
    pub dual_coef: Vec<Vec<i32>>,
    pub bias: i32,
    /// Same Q format as the operands.
    pub gamma: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModelParams {
    Kernel(KernelParams),
    Linear(LinearParams),
}

/// `{"X_test": [[..]], "y_test": [..]}`
#[derive(Debug, Clone, Deserialize)]
pub struct TestData {
    #[serde(rename = "X_test")]
    pub x_test: Vec<Vec<i32>>,
    #[serde(rename = "y_test")]
    pub y_test: Vec<i32>,
}

/// Table geometry chosen at build time.
#[derive(Debug, Clone, Copy)]
pub struct LutShape {
    pub addr_bits: u32,
    pub dist_shift: u32,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn load_params(path: &Path) -> Result<ModelParams> {
    let params: ModelParams = read_json(path)?;
    info!("{}: {}", path.display(), params.describe());
    Ok(params)
}

pub fn load_data(path: &Path) -> Result<TestData> {
    let data: TestData = read_json(path)?;
    if data.x_test.len() != data.y_test.len() {
        bail!(
            "{}: {} samples but {} labels",
            path.display(),
            data.x_test.len(),
            data.y_test.len()
        );
    }
    Ok(data)
}

/// Narrow a raw value to a lane of `format`, refusing anything that does not fit.
pub fn to_lane(format: &QFormat, value: i32, what: &str) -> Result<Lane> {
    if i64::from(value) < format.min() || i64::from(value) > format.max() {
        bail!("{what} value {value} outside {format} range");
    }
    Lane::try_from(value).with_context(|| format!("{what} value {value}"))
}

pub fn to_lanes(format: &QFormat, values: &[i32], what: &str) -> Result<Vec<Lane>> {
    values.iter().map(|&v| to_lane(format, v, what)).collect()
}

impl TestData {
    pub fn samples(&self, format: &QFormat) -> Result<Vec<Vec<Lane>>> {
        self.x_test
            .iter()
            .map(|x| to_lanes(format, x, "feature"))
            .collect()
    }

    pub fn labels(&self) -> Vec<bool> {
        self.y_test.iter().map(|&y| y > 0).collect()
    }
}

impl KernelParams {
    fn coefficients(&self) -> Result<&[i32]> {
        match self.dual_coef.first() {
            Some(row) => Ok(row),
            None => bail!("dual_coef has no rows"),
        }
    }
}

impl ModelParams {
    /// Feature count implied by the parameters.
    pub fn features(&self) -> usize {
        match self {
            Self::Linear(p) => p.weights.len(),
            Self::Kernel(p) => p.support_vectors.first().map_or(0, Vec::len),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Linear(p) => format!("linear model, N={}", p.weights.len()),
            Self::Kernel(p) => format!(
                "kernel model, N={} M={}",
                self.features(),
                p.support_vectors.len()
            ),
        }
    }

    /// Build configuration that fits these parameters.
    pub fn config(&self, format: QFormat, lut: LutShape) -> Result<CoreConfig> {
        let config = match self {
            Self::Linear(p) => CoreConfig::linear(p.weights.len()),
            Self::Kernel(p) => {
                let gamma = format.to_f64(i64::from(p.gamma));
                let table = KernelLut::rbf(gamma, format, lut.addr_bits, lut.dist_shift)?;
                CoreConfig::kernel(self.features(), p.support_vectors.len(), table)
            }
        };
        Ok(config.with_format(format))
    }

    /// Program the parameters through the bus.
    pub fn load(&self, acc: &mut Accelerator) -> Result<()> {
        let format = acc.core().format();
        match self {
            Self::Linear(p) => acc.load_linear(&LinearModel {
                weights: to_lanes(&format, &p.weights, "weight")?,
                bias: to_lane(&format, p.bias, "bias")?,
            })?,
            Self::Kernel(p) => acc.load_kernel(&KernelModel {
                support_vectors: p
                    .support_vectors
                    .iter()
                    .map(|sv| to_lanes(&format, sv, "support vector"))
                    .collect::<Result<_>>()?,
                coefficients: to_lanes(&format, p.coefficients()?, "dual coefficient")?,
                bias: to_lane(&format, p.bias, "bias")?,
            })?,
        }
        Ok(())
    }

    /// Score `x` with the golden model.
    pub fn reference_score(&self, format: &QFormat, lut: &KernelLut, x: &[Lane]) -> Result<Score> {
        let score = match self {
            Self::Linear(p) => linear_score(
                format,
                &LinearOperands {
                    features: x.to_vec(),
                    weights: to_lanes(format, &p.weights, "weight")?,
                    bias: to_lane(format, p.bias, "bias")?,
                },
            ),
            Self::Kernel(p) => kernel_score(
                format,
                lut,
                &KernelOperands {
                    features: x.to_vec(),
                    support_vectors: p
                        .support_vectors
                        .iter()
                        .map(|sv| to_lanes(format, sv, "support vector"))
                        .collect::<Result<_>>()?,
                    coefficients: to_lanes(format, p.coefficients()?, "dual coefficient")?,
                    bias: to_lane(format, p.bias, "bias")?,
                },
            ),
        };
        Ok(score)
    }
}
