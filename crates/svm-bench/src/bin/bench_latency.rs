//! Latency determinism and simulation rate across build geometries.
//!
//! For each build, random operands are programmed through the bus and every
//! inference is checked against two invariants: the latency register equals
//! the engine latency, and re-running the same input reproduces the same
//! decision. Host-side cost (bus writes, start pulse, status polling) and the
//! simulator's own clock rate are reported alongside.
//!
//! Expected engine latency:
//!   linear  ⌈log2 N⌉ + 2   (N=16 → 6)
//!   kernel  ⌈log2 M⌉ + 4   (M=16 → 8)
//!
//! Usage:
//!   cargo run --release --bin bench_latency
//!   cargo run --release --bin bench_latency -- --iterations 500

use anyhow::{bail, Result};
use std::time::Instant;
use svm_bench::{parse_arg, OperandRng};
use svm_core::{Accelerator, Core, CoreConfig, KernelLut, KernelModel, LinearModel, QFormat};
use tracing_subscriber::EnvFilter;

const DEFAULT_ITERATIONS: usize = 200;
const KERNEL_FEATURES: usize = 16;

// ── Measurement ──────────────────────────────────────────────────────────────

struct Row {
    label: String,
    latency: u32,
    host_cycles: f64,
    sim_mhz: f64,
}

fn measure(
    label: String,
    mut acc: Accelerator,
    rng: &mut OperandRng,
    iterations: usize,
) -> Result<Row> {
    let expected = acc.core().latency();
    let n = acc.core().geometry().features;
    let mut host_cycles = 0u64;

    let start_cycle = acc.core().cycle();
    let t0 = Instant::now();
    for i in 0..iterations {
        let x = rng.lanes(n, 512);
        let first = acc.predict(&x)?;
        let again = acc.predict(&x)?;
        if first.latency_cycles != expected || again.latency_cycles != expected {
            bail!(
                "{label}: iteration {i} latency {} / {} (expected {expected})",
                first.latency_cycles,
                again.latency_cycles
            );
        }
        if first.decision != again.decision || first.class != again.class {
            bail!("{label}: iteration {i} not reproducible");
        }
        host_cycles += first.host_cycles;
    }
    let elapsed = t0.elapsed().as_secs_f64();
    let simulated = acc.core().cycle() - start_cycle;

    Ok(Row {
        label,
        latency: expected,
        host_cycles: host_cycles as f64 / iterations as f64,
        sim_mhz: simulated as f64 / elapsed.max(1e-9) / 1e6,
    })
}

fn linear(n: usize, rng: &mut OperandRng) -> Result<Accelerator> {
    let mut acc = Accelerator::new(Core::new(CoreConfig::linear(n))?);
    acc.load_linear(&LinearModel {
        weights: rng.lanes(n, 512),
        bias: rng.lane(256),
    })?;
    Ok(acc)
}

fn kernel(m: usize, rng: &mut OperandRng) -> Result<Accelerator> {
    let lut = KernelLut::rbf(0.25, QFormat::Q8_8, 8, 4)?;
    let mut acc = Accelerator::new(Core::new(CoreConfig::kernel(KERNEL_FEATURES, m, lut))?);
    acc.load_kernel(&KernelModel {
        support_vectors: (0..m).map(|_| rng.lanes(KERNEL_FEATURES, 512)).collect(),
        coefficients: rng.lanes(m, 256),
        bias: rng.lane(256),
    })?;
    Ok(acc)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let iterations = parse_arg(&args, "--iterations", DEFAULT_ITERATIONS).max(1);
    let mut rng = OperandRng::new(0x5eed);

    println!("Latency determinism benchmark");
    println!("=============================");
    println!("Iterations : {iterations} (each run twice)");
    println!();
    println!(
        "  {:<18}  {:>8}  {:>12}  {:>10}",
        "build", "latency", "host cyc/inf", "sim MHz"
    );

    let mut rows = Vec::new();
    for n in [1usize, 2, 3, 4, 8, 16, 32, 64] {
        let acc = linear(n, &mut rng)?;
        rows.push(measure(format!("linear N={n}"), acc, &mut rng, iterations)?);
    }
    for m in [1usize, 2, 4, 8, 16, 32] {
        let acc = kernel(m, &mut rng)?;
        rows.push(measure(
            format!("kernel N={KERNEL_FEATURES} M={m}"),
            acc,
            &mut rng,
            iterations,
        )?);
    }

    for row in &rows {
        println!(
            "  {:<18}  {:>8}  {:>12.1}  {:>10.2}",
            row.label, row.latency, row.host_cycles, row.sim_mhz
        );
    }

    println!();
    println!("All latencies matched the engine formula; every rerun reproduced its result.");

    Ok(())
}
