//! `svmctl`: inspect, drive and evaluate the fixed-point SVM classifier core.
//!
//! ```text
//! USAGE:
//!   svmctl info [build options]                   Geometry, register map, latency
//!   svmctl predict <params.json> -x <raw,...>     One inference through the bus
//!   svmctl eval <params.json> <data.json>         Accuracy, confusion, latency, throughput
//! ```
//!
//! Parameter and data files hold already-quantized raw fixed-point integers.

mod params;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use params::{LutShape, ModelParams};
use std::path::{Path, PathBuf};
use svm_chip::{Engine, Geometry, Register};
use svm_core::{Accelerator, Core, CoreConfig, KernelLut, OpCounts, OperandLatch, QFormat};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "svmctl", about = "Fixed-point SVM classifier core", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print geometry, register map, latency and per-inference op counts.
    Info {
        /// Engine to describe.
        #[arg(long, value_enum, default_value_t = EngineArg::Linear)]
        engine: EngineArg,
        /// Feature lanes (N).
        #[arg(short = 'n', long, default_value_t = 16)]
        features: usize,
        /// Support vectors (M), kernel engine only.
        #[arg(short = 'm', long, default_value_t = 16)]
        support_vectors: usize,
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Run one inference on raw feature values.
    Predict {
        /// Model parameters (linear or kernel JSON).
        params: PathBuf,
        /// Raw feature values, comma separated.
        #[arg(short = 'x', long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        features: Vec<i32>,
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Run a labelled test set and report accuracy and timing.
    Eval {
        /// Model parameters (linear or kernel JSON).
        params: PathBuf,
        /// Test data (`X_test`, `y_test`).
        data: PathBuf,
        /// Clock used for the throughput figure, in MHz.
        #[arg(long, default_value_t = 100.0)]
        clock_mhz: f64,
        /// Evaluate at most this many samples.
        #[arg(long)]
        limit: Option<usize>,
        /// Also score every sample with the golden model and count mismatches.
        #[arg(long)]
        reference: bool,
        #[command(flatten)]
        build: BuildArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineArg {
    Linear,
    Kernel,
}

#[derive(Clone, Copy, ValueEnum)]
enum LatchArg {
    /// Capture every operand at the start edge.
    OnStart,
    /// Late stages read bias and coefficients from the registers.
    Live,
}

/// Build-time options shared by every subcommand.
#[derive(Args, Clone, Copy)]
struct BuildArgs {
    /// Operand word width in bits.
    #[arg(long, default_value_t = 16)]
    word_bits: u32,
    /// Fractional bits.
    #[arg(long, default_value_t = 8)]
    frac_bits: u32,
    /// Kernel table address width.
    #[arg(long, default_value_t = 8)]
    lut_bits: u32,
    /// Squared-distance bits dropped before the table address.
    #[arg(long, default_value_t = 4)]
    dist_shift: u32,
    /// Operand latch policy.
    #[arg(long, value_enum, default_value_t = LatchArg::OnStart)]
    latch: LatchArg,
    /// Answer SLVERR to unmapped and read-only accesses.
    #[arg(long)]
    decode_errors: bool,
}

impl BuildArgs {
    fn format(&self) -> Result<QFormat> {
        Ok(QFormat::new(self.word_bits, self.frac_bits)?)
    }

    fn lut(&self) -> LutShape {
        LutShape {
            addr_bits: self.lut_bits,
            dist_shift: self.dist_shift,
        }
    }

    fn apply(&self, config: CoreConfig) -> CoreConfig {
        let latch = match self.latch {
            LatchArg::OnStart => OperandLatch::OnStart,
            LatchArg::Live => OperandLatch::Live,
        };
        config.with_latch(latch).with_decode_errors(self.decode_errors)
    }

    fn accelerator(&self, params: &ModelParams) -> Result<Accelerator> {
        let config = self.apply(params.config(self.format()?, self.lut())?);
        let mut acc = Accelerator::new(Core::new(config)?);
        params.load(&mut acc)?;
        Ok(acc)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Info {
            engine,
            features,
            support_vectors,
            build,
        } => cmd_info(engine, features, support_vectors, &build)?,
        Cmd::Predict {
            params,
            features,
            build,
        } => cmd_predict(&params, &features, &build)?,
        Cmd::Eval {
            params,
            data,
            clock_mhz,
            limit,
            reference,
            build,
        } => cmd_eval(&params, &data, clock_mhz, limit, reference, &build)?,
    }

    Ok(())
}

fn cmd_info(engine: EngineArg, n: usize, m: usize, build: &BuildArgs) -> Result<()> {
    let format = build.format()?;
    let config = match engine {
        EngineArg::Linear => CoreConfig::linear(n),
        EngineArg::Kernel => {
            // any table of the right shape will do for layout and timing
            let lut = KernelLut::rbf(1.0, format, build.lut_bits, build.dist_shift)?;
            CoreConfig::kernel(n, m, lut)
        }
    };
    let config = build.apply(config.with_format(format));
    config.validate()?;

    let g: Geometry = config.geometry;
    let map = config.register_map();
    let ops = OpCounts::for_geometry(&g);

    println!("Engine       : {}", g.engine);
    println!("Features (N) : {}", g.features);
    if g.engine == Engine::Kernel {
        println!("SVs (M)      : {}", g.support_vectors);
        println!(
            "Kernel table : {} entries, distance shift {}",
            config.lut.len(),
            config.lut.dist_shift()
        );
    }
    println!("Format       : {} ({} bits)", config.format, config.format.word_bits());
    println!("Accumulator  : {} bits", config.accumulator_bits());
    println!("Latency      : {} cycles", config.latency());
    println!(
        "Ops/inference: {} mul, {} add, {} lookup, {} cmp ({} total)",
        ops.multiplies,
        ops.additions,
        ops.lookups,
        ops.comparisons,
        ops.total()
    );
    println!();
    println!("Register map:");
    println!("  0x000  control   R/W  bit0 start, bit1 soft_reset");
    println!("  0x004  status    RO   bit0 done, bit1 busy, bit2 prediction");
    println!("  0x008  result    RO");
    println!("  0x00c  latency   RO");
    println!("  0x010  bias      R/W");
    let block = match g.engine {
        Engine::Linear => "weights",
        Engine::Kernel => "dual_coef",
    };
    println!(
        "  {:#05x}  {block:<9} R/W  [{}]",
        map.operand_base(),
        g.operand_words()
    );
    println!("  {:#05x}  features  R/W  [{}]", map.feature_base(), g.features);
    if let Some(base) = map.support_base() {
        println!(
            "  {base:#05x}  sv[m][k]  R/W  [{}×{}], sv[1][0] at {:#05x}",
            g.support_vectors,
            g.features,
            map.offset(Register::SupportVector { vector: 1, lane: 0 })
        );
    }
    println!("  end    {:#05x}", map.end());

    Ok(())
}

fn cmd_predict(path: &Path, features: &[i32], build: &BuildArgs) -> Result<()> {
    let params = params::load_params(path)?;
    let mut acc = build.accelerator(&params)?;
    let format = acc.core().format();
    let x = params::to_lanes(&format, features, "feature")?;
    let out = acc.predict(&x)?;
    let golden = params.reference_score(&format, &acc.core().config().lut, &x)?;

    println!("Class        : {}", u8::from(out.class));
    println!(
        "Decision     : {} ({:.4})",
        out.decision,
        format.to_f64(i64::from(out.decision))
    );
    if golden.saturated(&format) {
        println!("Saturated    : yes (full-width sum {})", golden.sum);
    } else {
        println!("Saturated    : no");
    }
    println!("Latency      : {} cycles", out.latency_cycles);
    println!("Host cycles  : {}", out.host_cycles);

    Ok(())
}

fn cmd_eval(
    params_path: &Path,
    data_path: &Path,
    clock_mhz: f64,
    limit: Option<usize>,
    reference: bool,
    build: &BuildArgs,
) -> Result<()> {
    if clock_mhz <= 0.0 {
        bail!("clock must be positive, got {clock_mhz} MHz");
    }
    let params = params::load_params(params_path)?;
    let data = params::load_data(data_path)?;
    let mut acc = build.accelerator(&params)?;
    let format = acc.core().format();

    let take = limit.unwrap_or(data.x_test.len()).min(data.x_test.len());
    let samples = data.samples(&format)?;
    let labels = data.labels();
    let (samples, labels) = (&samples[..take], &labels[..take]);

    let eval = acc.evaluate(samples, labels)?;

    println!("Model        : {}", params.describe());
    println!("Samples      : {}", eval.samples());
    println!(
        "Accuracy     : {:.4} ({}/{})",
        eval.accuracy(),
        eval.correct(),
        eval.samples()
    );
    println!("Confusion    :        pred 0  pred 1");
    println!(
        "  label 0    : {:>10} {:>7}",
        eval.confusion[0][0], eval.confusion[0][1]
    );
    println!(
        "  label 1    : {:>10} {:>7}",
        eval.confusion[1][0], eval.confusion[1][1]
    );
    println!("Mean latency : {:.1} cycles", eval.mean_latency());
    println!(
        "Throughput   : {:.0} inferences/s at {clock_mhz} MHz (host bus included)",
        eval.throughput(clock_mhz * 1e6)
    );

    if reference {
        let lut = acc.core().config().lut.clone();
        let mut mismatches = 0usize;
        let mut saturated = 0usize;
        for x in samples {
            let golden = params.reference_score(&format, &lut, x)?;
            saturated += usize::from(golden.saturated(&format));
            let hw = acc.predict(x)?;
            if hw.decision != i32::from(golden.decision) || hw.class != golden.class {
                warn!(
                    "mismatch: pipeline {} / {} vs reference {} / {}",
                    hw.decision,
                    u8::from(hw.class),
                    golden.decision,
                    u8::from(golden.class)
                );
                mismatches += 1;
            }
        }
        println!("Reference    : {mismatches} mismatches over {take} samples");
        println!("Saturated    : {saturated} decisions clamped");
        if mismatches > 0 {
            bail!("pipeline disagrees with the reference model on {mismatches} samples");
        }
    }

    Ok(())
}
