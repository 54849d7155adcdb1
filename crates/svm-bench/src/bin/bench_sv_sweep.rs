//! Kernel accuracy against the number of support vectors.
//!
//! A synthetic problem of well-separated clusters with random binary labels
//! is scored by kernel builds carrying the first M cluster centres as
//! support vectors (coefficient ±1). Test points are jittered copies of
//! every centre. Clusters with no support vector in range contribute
//! nothing, so their points fall to the bias and accuracy decays toward
//! chance as M shrinks.
//!
//! Usage:
//!   cargo run --release --bin bench_sv_sweep
//!   cargo run --release --bin bench_sv_sweep -- --clusters 64 --points 8

use anyhow::Result;
use svm_bench::{parse_arg, OperandRng};
use svm_core::{Accelerator, Core, CoreConfig, KernelLut, KernelModel, Lane, QFormat};
use tracing_subscriber::EnvFilter;

const DEFAULT_CLUSTERS: usize = 32;
const DEFAULT_POINTS: usize = 4;
const FEATURES: usize = 2;
/// Centres sit on a grid this far apart, well past the table's reach.
const SPACING: f64 = 6.0;
const JITTER: f64 = 0.4;

// ── Synthetic problem ────────────────────────────────────────────────────────

struct Problem {
    centres: Vec<Vec<f64>>,
    labels: Vec<bool>,
    samples: Vec<Vec<Lane>>,
    sample_labels: Vec<bool>,
}

impl Problem {
    fn new(clusters: usize, points: usize, format: &QFormat, rng: &mut OperandRng) -> Self {
        let side = (clusters as f64).sqrt().ceil() as usize;
        let offset = (side as f64 - 1.0) * SPACING / 2.0;
        let centres: Vec<Vec<f64>> = (0..clusters)
            .map(|i| {
                vec![
                    (i % side) as f64 * SPACING - offset,
                    (i / side) as f64 * SPACING - offset,
                ]
            })
            .collect();
        // balanced labels, shuffled order
        let mut labels: Vec<bool> = (0..clusters).map(|i| i % 2 == 0).collect();
        rng.shuffle(&mut labels);

        let mut samples = Vec::new();
        let mut sample_labels = Vec::new();
        for (c, &label) in centres.iter().zip(&labels) {
            for _ in 0..points {
                let x = c
                    .iter()
                    .map(|&v| format.quantize(v + (rng.unit() * 2.0 - 1.0) * JITTER))
                    .collect();
                samples.push(x);
                sample_labels.push(label);
            }
        }
        Self {
            centres,
            labels,
            samples,
            sample_labels,
        }
    }

    fn model(&self, format: &QFormat, m: usize) -> KernelModel {
        let coefs: Vec<f64> = self.labels[..m]
            .iter()
            .map(|&l| if l { 1.0 } else { -1.0 })
            .collect();
        KernelModel::quantize(format, &self.centres[..m], &coefs, 0.0)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let clusters = parse_arg(&args, "--clusters", DEFAULT_CLUSTERS).max(2);
    let points = parse_arg(&args, "--points", DEFAULT_POINTS).max(1);

    let format = QFormat::Q8_8;
    let lut = KernelLut::rbf(1.0, format, 8, 4)?;
    let mut rng = OperandRng::new(0x5eed ^ clusters as u64);
    let problem = Problem::new(clusters, points, &format, &mut rng);

    println!("Support-vector sweep");
    println!("====================");
    println!(
        "Problem : {clusters} clusters × {points} points, {FEATURES} features, spacing {SPACING}"
    );
    println!("Table   : {} entries, gamma 1.0", lut.len());
    println!();
    println!("  {:>4}  {:>8}  {:>8}  {:>12}", "M", "latency", "accuracy", "confusion");

    let mut m = 1;
    while m <= clusters {
        let config = CoreConfig::kernel(FEATURES, m, lut.clone()).with_format(format);
        let mut acc = Accelerator::new(Core::new(config)?);
        acc.load_kernel(&problem.model(&format, m))?;
        let eval = acc.evaluate(&problem.samples, &problem.sample_labels)?;
        let c = eval.confusion;
        println!(
            "  {:>4}  {:>8.0}  {:>8.3}  [{} {} / {} {}]",
            m,
            eval.mean_latency(),
            eval.accuracy(),
            c[0][0],
            c[0][1],
            c[1][0],
            c[1][1]
        );
        m = if m == clusters { m + 1 } else { (m * 2).min(clusters) };
    }

    println!();
    println!("Chance level is 0.5; the full set separates every cluster.");

    Ok(())
}
