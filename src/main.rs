use std::f32::consts::PI;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::info;
use rand::Rng;

use neuroflow::signal::{FlowPipeline, FlowStateConfig, FlowTransition, CHANNEL_COUNT};

const SAMPLE_RATE_HZ: f32 = 256.0;
const BATCH_LEN: usize = 64;
const TICK_MS: u64 = 250;
const SESSION_TICKS: u64 = 240;

/// Simulated headband session: a 10 Hz alpha rhythm with a weaker 20 Hz beta
/// component and broadband noise on all four channels, streamed through the
/// full pipeline faster than real time. Pass a JSON `FlowStateConfig` path as
/// the first argument to override the default thresholds.
fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str::<FlowStateConfig>(&text)
                .with_context(|| format!("parsing flow config from {path}"))?
        }
        None => FlowStateConfig::default(),
    };

    let mut pipeline = FlowPipeline::new().context("building pipeline")?;
    pipeline.set_config(config);
    pipeline.set_contact_codes([1, 1, 1, 1]);

    let mut rng = rand::thread_rng();
    let start = Instant::now();

    info!("starting simulated session: {SESSION_TICKS} ticks of {TICK_MS} ms");
    let mut last = None;
    for tick in 0..SESSION_TICKS {
        for channel in 0..CHANNEL_COUNT {
            let batch: Vec<f32> = (0..BATCH_LEN)
                .map(|i| {
                    let t = (tick as usize * BATCH_LEN + i) as f32 / SAMPLE_RATE_HZ;
                    (2.0 * PI * 10.0 * t).sin()
                        + 0.55 * (2.0 * PI * 20.0 * t).sin()
                        + rng.gen_range(-0.2..0.2)
                })
                .collect();
            pipeline
                .push_samples(channel, &batch)
                .context("pushing simulated samples")?;
        }
        pipeline.set_motion(
            rng.gen_range(-0.02..0.02),
            rng.gen_range(-0.02..0.02),
            rng.gen_range(-0.02..0.02),
        );

        let now = start + Duration::from_millis(tick * TICK_MS);
        let output = pipeline.update(now);
        match output.transition {
            FlowTransition::Entered => info!(
                "flow entered after {} ms sustained",
                output.flow.sustained_ms
            ),
            FlowTransition::Exited => info!("flow exited"),
            FlowTransition::None => {}
        }
        if tick % 8 == 0 {
            info!(
                "tick {tick:3}  coherence {:.2} ({:?})  alpha {:.2}  ratio {:.2}  variance {:.4}",
                output.coherence,
                output.zone,
                output.snapshot.smoothed_bands.alpha,
                output.flow.beta_alpha_ratio,
                output.flow.signal_variance,
            );
        }
        last = Some(output);
    }

    if let Some(output) = last {
        println!(
            "session done: coherence {:.2} ({:?}), flow active: {}",
            output.coherence, output.zone, output.flow.is_active
        );
    }
    Ok(())
}
