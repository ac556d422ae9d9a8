//! Offline renderer: runs a WAV file through the effect using a directory
//! of wavetables.
//!
//! Usage: `wavefir-render <wavetable-dir> <input.wav> <output.wav> [config.json]`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use wavetable_fir::audio_engine::{self, LoadStatus};
use wavetable_fir::config::EngineConfig;
use wavetable_fir::layout::{channel_param_id, ChannelParam, MAX_CHANNELS, NUM_BUSES};
use wavetable_fir::wavetable::WavDirectorySource;

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// Silence appended so the longest kernel can ring out.
const TAIL_FRAMES: usize = 512;

struct Args {
    wavetables: PathBuf,
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let (Some(wavetables), Some(input), Some(output)) = (args.next(), args.next(), args.next())
    else {
        bail!("usage: wavefir-render <wavetable-dir> <input.wav> <output.wav> [config.json]");
    };
    Ok(Args {
        wavetables,
        input,
        output,
        config: args.next(),
    })
}

fn read_input(path: &Path) -> anyhow::Result<(WavSpec, Vec<f32>)> {
    let reader =
        WavReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok((spec, samples))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let (spec, samples) = read_input(&args.input)?;
    let file_channels = spec.channels as usize;
    if file_channels == 0 {
        bail!("{} has no channels", args.input.display());
    }
    let num_channels = file_channels.min(MAX_CHANNELS);
    if num_channels < file_channels {
        log::warn!(
            "input has {} channels, processing the first {}",
            file_channels,
            num_channels
        );
    }
    config.sample_rate = spec.sample_rate as f32;

    let (mut controller, mut processor) = audio_engine::build(num_channels, &config)
        .context("failed to construct the effect")?;

    let source = WavDirectorySource::scan(&args.wavetables, config.frame_size)
        .with_context(|| format!("failed to scan {}", args.wavetables.display()))?;
    controller
        .attach_source(Box::new(source))
        .context("failed to start the wavetable loader")?;
    match controller.wait_for_load(LOAD_TIMEOUT) {
        LoadStatus::Loaded(info) => log::info!(
            "rendering with {} waves (mipmaps: {})",
            info.num_waves,
            info.using_mipmaps
        ),
        status => log::warn!("no wavetable active ({:?}), output will be dry", status),
    }

    let out_spec = WavSpec {
        channels: num_channels as u16,
        sample_rate: spec.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&args.output, out_spec)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    // 0-based bus indices as configured
    let bus_of = |ch: usize, param: ChannelParam| {
        controller
            .parameter(channel_param_id(ch, param))
            .map_or(0, |bus| (bus - 1).max(0) as usize)
    };
    let inputs: Vec<usize> = (0..num_channels).map(|ch| bus_of(ch, ChannelParam::Input)).collect();
    let outputs: Vec<usize> = (0..num_channels).map(|ch| bus_of(ch, ChannelParam::Output)).collect();

    let block = config.block_size.max(1);
    let total_frames = samples.len() / file_channels + TAIL_FRAMES;
    let mut buses = vec![0.0f32; NUM_BUSES as usize * block];

    let mut start = 0;
    while start < total_frames {
        let frames = block.min(total_frames - start);
        let buses = &mut buses[..NUM_BUSES as usize * frames];
        buses.fill(0.0);

        for i in 0..frames {
            let frame = start + i;
            for ch in 0..num_channels {
                let sample = samples.get(frame * file_channels + ch).copied().unwrap_or(0.0);
                buses[inputs[ch] * frames + i] += sample;
            }
        }

        controller.poll();
        processor.process(buses, frames);

        for i in 0..frames {
            for &bus in &outputs {
                writer.write_sample(buses[bus * frames + i])?;
            }
        }
        start += frames;
    }

    writer.finalize()?;
    log::info!(
        "wrote {} frames to {}",
        total_frames,
        args.output.display()
    );
    Ok(())
}
