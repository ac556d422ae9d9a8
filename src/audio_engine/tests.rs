use std::time::Duration;

use super::*;
use crate::error::LoadError;
use crate::kernel::build_kernel;
use crate::layout::{
    channel_param_id, ChannelParam, PARAM_DEPTH, PARAM_GAIN, PARAM_KERNEL_SIZE, PARAM_POSITION,
    PARAM_SATURATION, PARAM_WAVETABLE,
};
use crate::wavetable::{write_mipmaps, MemorySource, WavetableInfo, WavetableSource};

const FRAMES: usize = 64;
const BUSES: usize = 28;
const TIMEOUT: Duration = Duration::from_secs(5);

fn frames_for(seed: usize, waves: usize) -> Vec<Vec<f32>> {
    (0..waves)
        .map(|w| {
            (0..64)
                .map(|i| {
                    let phase = i as f32 / 64.0 * std::f32::consts::TAU;
                    (phase * (1 + (w + seed) % 5) as f32).sin() * 0.5 + 0.1 * w as f32
                })
                .collect()
        })
        .collect()
}

fn source() -> Box<dyn WavetableSource> {
    Box::new(
        MemorySource::new()
            .with_table("four", frames_for(0, 4))
            .with_table("two", frames_for(3, 2))
            .with_table("broken", Vec::new()),
    )
}

fn engine(num_channels: usize, config: &EngineConfig) -> (Controller, Processor) {
    build(num_channels, config).unwrap()
}

fn loaded_engine(num_channels: usize, config: &EngineConfig) -> (Controller, Processor) {
    let (mut controller, processor) = engine(num_channels, config);
    controller.attach_source(source()).unwrap();
    assert!(matches!(
        controller.wait_for_load(TIMEOUT),
        LoadStatus::Loaded(_)
    ));
    (controller, processor)
}

fn bus_block(frames: usize) -> Vec<f32> {
    vec![0.0; BUSES * frames]
}

fn bus(buses: &[f32], number: usize, frames: usize) -> &[f32] {
    &buses[(number - 1) * frames..number * frames]
}

fn bus_mut(buses: &mut [f32], number: usize, frames: usize) -> &mut [f32] {
    &mut buses[(number - 1) * frames..number * frames]
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-6, "frame {}: {} vs {}", i, a, e);
    }
}

fn impulse_response(processor: &mut Processor, frames: usize) -> Vec<f32> {
    let mut buses = bus_block(frames);
    bus_mut(&mut buses, 1, frames)[0] = 1.0;
    processor.process(&mut buses, frames);
    bus(&buses, 13, frames).to_vec()
}

#[test]
fn test_dry_pass_through_without_table() {
    let (_controller, mut processor) = engine(2, &EngineConfig::default());
    let mut buses = bus_block(FRAMES);
    for (i, s) in bus_mut(&mut buses, 2, FRAMES).iter_mut().enumerate() {
        *s = (i as f32 * 0.1).sin();
    }
    let input = bus(&buses, 2, FRAMES).to_vec();

    processor.process(&mut buses, FRAMES);

    assert!(!processor.has_kernel());
    // channel 1 reads bus 2 and adds into bus 14
    assert_eq!(bus(&buses, 14, FRAMES), &input[..]);
}

#[test]
fn test_zero_depth_passes_impulse_unchanged() {
    let (mut controller, mut processor) = loaded_engine(1, &EngineConfig::default());
    controller.set_parameter(PARAM_DEPTH, 0);
    controller.set_parameter(PARAM_GAIN, 0);
    controller.set_parameter(PARAM_SATURATION, 0);

    let out = impulse_response(&mut processor, FRAMES);

    assert!(processor.has_kernel());
    assert_eq!(out[0], 1.0);
    assert!(out[1..].iter().all(|&s| s == 0.0));
}

#[test]
fn test_full_depth_output_is_the_kernel() {
    let (mut controller, mut processor) = loaded_engine(1, &EngineConfig::default());
    controller.set_parameter(PARAM_DEPTH, 100);

    let out = impulse_response(&mut processor, FRAMES);
    let kernel = processor.active_kernel(0).unwrap();

    for (i, (&y, &k)) in out.iter().zip(kernel).enumerate() {
        assert!((y - k).abs() < 1e-6, "sample {}: {} vs {}", i, y, k);
    }
}

#[test]
fn test_unity_dc_gain_for_positive_kernel() {
    let (mut controller, mut processor) = engine(1, &EngineConfig::default());
    let flat = MemorySource::new().with_table("flat", vec![vec![0.4; 64]; 2]);
    controller.attach_source(Box::new(flat)).unwrap();
    controller.wait_for_load(TIMEOUT);
    controller.set_parameter(PARAM_DEPTH, 100);

    let frames = 256;
    let mut buses = bus_block(frames);
    bus_mut(&mut buses, 1, frames).fill(1.0);
    processor.process(&mut buses, frames);

    // settled once the 64 tap window is full
    for &y in &bus(&buses, 13, frames)[64..] {
        assert!((y - 1.0).abs() < 1e-4, "dc gain {}", y);
    }
}

#[test]
fn test_first_load_installs_without_crossfade() {
    let (mut controller, mut processor) = engine(2, &EngineConfig::default());
    assert_eq!(controller.status(), LoadStatus::NoTable);

    controller.attach_source(source()).unwrap();
    assert_eq!(controller.status(), LoadStatus::Loading);
    controller.wait_for_load(TIMEOUT);

    let mut buses = bus_block(FRAMES);
    processor.process(&mut buses, FRAMES);
    assert!(processor.has_kernel());
    assert!(!processor.is_crossfading());
}

#[test]
fn test_reload_engages_crossfade() {
    let (mut controller, mut processor) = loaded_engine(2, &EngineConfig::default());
    let mut buses = bus_block(FRAMES);
    processor.process(&mut buses, FRAMES);

    controller.set_parameter(PARAM_WAVETABLE, 1);
    assert_eq!(
        controller.wait_for_load(TIMEOUT),
        LoadStatus::Loaded(WavetableInfo {
            num_waves: 2,
            using_mipmaps: true
        })
    );

    processor.process(&mut buses, FRAMES);
    assert!(processor.is_crossfading());
    assert!(processor.crossfade_mix() > 0.0);
}

#[test]
fn test_crossfade_lands_on_new_kernels() {
    let config = EngineConfig {
        crossfade_ms: 1.0,
        ..Default::default()
    };
    let (mut controller, mut processor) = loaded_engine(1, &config);
    let mut buses = bus_block(32);
    processor.process(&mut buses, 32);
    let before = processor.active_kernel(0).unwrap().to_vec();

    controller.set_parameter(PARAM_WAVETABLE, 1);
    controller.wait_for_load(TIMEOUT);

    processor.process(&mut buses, 32);
    assert!(processor.is_crossfading());
    // 48 samples at 48 kHz
    processor.process(&mut buses, 32);
    assert!(!processor.is_crossfading());

    let mut table = WaveTableBuffer::zeroed();
    write_mipmaps(&frames_for(3, 2), &mut table).unwrap();
    let mut expected = vec![0.0; 64];
    build_kernel(&table, 0.5, &mut expected);

    let after = processor.active_kernel(0).unwrap();
    assert_ne!(after, &before[..]);
    for (a, b) in after.iter().zip(&expected) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_position_change_rebuilds_immediately() {
    let (mut controller, mut processor) = loaded_engine(1, &EngineConfig::default());
    let mut buses = bus_block(FRAMES);
    processor.process(&mut buses, FRAMES);
    let before = processor.active_kernel(0).unwrap().to_vec();

    controller.set_parameter(PARAM_POSITION, 0);
    processor.process(&mut buses, FRAMES);

    assert!(!processor.is_crossfading());
    assert_ne!(processor.active_kernel(0).unwrap(), &before[..]);
}

#[test]
fn test_kernel_size_follows_parameter() {
    let (mut controller, mut processor) = loaded_engine(1, &EngineConfig::default());
    let mut buses = bus_block(FRAMES);
    processor.process(&mut buses, FRAMES);
    assert_eq!(processor.kernel_size(), 64);

    controller.set_parameter(PARAM_KERNEL_SIZE, 3);
    processor.process(&mut buses, FRAMES);
    assert_eq!(processor.kernel_size(), 512);
    assert_eq!(processor.active_kernel(0).unwrap().len(), 512);

    controller.set_parameter(PARAM_KERNEL_SIZE, 42);
    assert_eq!(controller.parameter(PARAM_KERNEL_SIZE), Some(3));
}

#[test]
fn test_output_modes() {
    let (mut controller, mut processor) = engine(1, &EngineConfig::default());
    let mut buses = bus_block(4);
    bus_mut(&mut buses, 1, 4).copy_from_slice(&[0.1, 0.2, 0.3, 0.4]);
    bus_mut(&mut buses, 13, 4).fill(1.0);

    processor.process(&mut buses, 4);
    assert_close(bus(&buses, 13, 4), &[1.1, 1.2, 1.3, 1.4]);

    controller.set_parameter(channel_param_id(0, ChannelParam::Mode), 1);
    bus_mut(&mut buses, 13, 4).fill(1.0);
    processor.process(&mut buses, 4);
    assert_eq!(bus(&buses, 13, 4), &[0.1, 0.2, 0.3, 0.4]);
}

#[test]
fn test_channels_accumulate_on_shared_bus() {
    let (mut controller, mut processor) = engine(2, &EngineConfig::default());
    controller.set_parameter(channel_param_id(1, ChannelParam::Output), 13);

    let mut buses = bus_block(4);
    bus_mut(&mut buses, 1, 4).copy_from_slice(&[0.1, 0.2, 0.3, 0.4]);
    bus_mut(&mut buses, 2, 4).copy_from_slice(&[0.01, -0.02, 0.03, -0.04]);
    processor.process(&mut buses, 4);
    assert_close(bus(&buses, 13, 4), &[0.11, 0.18, 0.33, 0.36]);
    assert!(bus(&buses, 14, 4).iter().all(|&s| s == 0.0));

    // a second pass adds on top of the first
    processor.process(&mut buses, 4);
    assert_close(bus(&buses, 13, 4), &[0.22, 0.36, 0.66, 0.72]);
}

#[test]
fn test_zero_depth_skips_filter_but_not_saturation() {
    let (mut controller, mut processor) = loaded_engine(2, &EngineConfig::default());
    controller.set_parameter(PARAM_DEPTH, 0);
    controller.set_parameter(PARAM_SATURATION, 40);
    for ch in 0..2 {
        controller.set_parameter(channel_param_id(ch, ChannelParam::Mode), 1);
    }
    let clip = crate::nodes::SoftClip::new(0.4).unwrap();

    let mut buses = bus_block(FRAMES);
    for (i, s) in bus_mut(&mut buses, 1, FRAMES).iter_mut().enumerate() {
        *s = (i as f32 * 0.3).sin() * 0.8;
    }
    for (i, s) in bus_mut(&mut buses, 2, FRAMES).iter_mut().enumerate() {
        *s = (i as f32 * 0.7).cos() * 0.5;
    }
    let dry: Vec<Vec<f32>> = (1..=2).map(|b| bus(&buses, b, FRAMES).to_vec()).collect();

    processor.process(&mut buses, FRAMES);
    assert!(processor.has_kernel());
    for (ch, dry) in dry.iter().enumerate() {
        let expected: Vec<f32> = dry.iter().map(|&x| clip.apply(x)).collect();
        assert_close(bus(&buses, 13 + ch, FRAMES), &expected);
    }
}

#[test]
fn test_in_place_routing() {
    let (mut controller, mut processor) = engine(1, &EngineConfig::default());
    controller.set_parameter(channel_param_id(0, ChannelParam::Output), 1);
    controller.set_parameter(channel_param_id(0, ChannelParam::Mode), 1);
    controller.set_parameter(PARAM_GAIN, -60);

    let mut buses = bus_block(4);
    bus_mut(&mut buses, 1, 4).fill(1.0);
    processor.process(&mut buses, 4);

    let expected = crate::utils::db_to_linear(-6.0);
    assert!(bus(&buses, 1, 4).iter().all(|&s| (s - expected).abs() < 1e-6));
}

#[test]
fn test_route_past_supplied_buses_is_skipped() {
    let (_controller, mut processor) = engine(2, &EngineConfig::default());
    // only 13 buses: channel 0 writes bus 13, channel 1 would write bus 14
    let mut buses = vec![0.5; 13 * 4];
    processor.process(&mut buses, 4);
    assert_eq!(bus(&buses, 13, 4), &[1.0, 1.0, 1.0, 1.0]);
    assert!(buses[..12 * 4].iter().all(|&s| s == 0.5));
}

#[test]
fn test_saturation_and_gain_apply_in_bypass() {
    let (mut controller, mut processor) = engine(1, &EngineConfig::default());
    controller.set_parameter(PARAM_SATURATION, 50);
    controller.set_parameter(channel_param_id(0, ChannelParam::Mode), 1);

    let mut buses = bus_block(1);
    buses[0] = 0.2;
    processor.process(&mut buses, 1);

    let expected = 0.6f32.tanh() / 3.0f32.tanh();
    assert!((bus(&buses, 13, 1)[0] - expected).abs() < 1e-6);
}

#[test]
fn test_failed_load_keeps_previous_kernels() {
    let (mut controller, mut processor) = loaded_engine(1, &EngineConfig::default());
    let mut buses = bus_block(FRAMES);
    processor.process(&mut buses, FRAMES);
    let before = processor.active_kernel(0).unwrap().to_vec();

    controller.set_parameter(PARAM_WAVETABLE, 2);
    assert_eq!(controller.wait_for_load(TIMEOUT), LoadStatus::Failed);
    assert!(controller.load_error());

    // no rebuilds from a buffer the failed load scribbled over
    controller.set_parameter(PARAM_POSITION, 900);
    processor.process(&mut buses, FRAMES);
    assert!(processor.has_kernel());
    assert!(!processor.is_crossfading());
    assert_eq!(processor.active_kernel(0).unwrap(), &before[..]);

    controller.set_parameter(PARAM_WAVETABLE, 0);
    assert!(matches!(controller.wait_for_load(TIMEOUT), LoadStatus::Loaded(_)));
    assert!(!controller.load_error());
}

struct RawSource;

impl WavetableSource for RawSource {
    fn count(&self) -> usize {
        1
    }

    fn name(&self, _index: usize) -> Option<&str> {
        Some("raw")
    }

    fn load(&self, _index: usize, buffer: &mut WaveTableBuffer) -> Result<WavetableInfo, LoadError> {
        buffer.clear();
        let info = WavetableInfo {
            num_waves: 3,
            using_mipmaps: false,
        };
        buffer.set_info(info);
        Ok(info)
    }
}

#[test]
fn test_unusable_table_bypasses() {
    let (mut controller, mut processor) = loaded_engine(1, &EngineConfig::default());
    let mut buses = bus_block(FRAMES);
    processor.process(&mut buses, FRAMES);
    assert!(processor.has_kernel());

    controller.attach_source(Box::new(RawSource)).unwrap();
    let status = controller.wait_for_load(TIMEOUT);
    assert!(matches!(status, LoadStatus::Loaded(info) if !info.is_usable()));

    let out = impulse_response(&mut processor, FRAMES);
    assert!(!processor.has_kernel());
    assert_eq!(out[0], 1.0);

    // position edits have nothing to build from
    controller.set_parameter(PARAM_POSITION, 10);
    processor.process(&mut buses, FRAMES);
    assert!(!processor.has_kernel());
}

#[test]
fn test_selection_during_load_is_followed_up() {
    let (mut controller, _processor) = engine(1, &EngineConfig::default());
    controller.attach_source(source()).unwrap();
    controller.set_parameter(PARAM_WAVETABLE, 1);
    assert!(!controller.request_wavetable_load());

    let status = controller.wait_for_load(TIMEOUT);
    assert_eq!(
        status,
        LoadStatus::Loaded(WavetableInfo {
            num_waves: 2,
            using_mipmaps: true
        })
    );
}

#[test]
fn test_attach_narrows_wavetable_range() {
    let (mut controller, _processor) = engine(1, &EngineConfig::default());
    controller.set_parameter(PARAM_WAVETABLE, 9);
    assert_eq!(controller.parameter(PARAM_WAVETABLE), Some(9));

    controller.attach_source(source()).unwrap();
    assert_eq!(controller.parameter(PARAM_WAVETABLE), Some(2));
    assert_eq!(controller.layout().descriptor(PARAM_WAVETABLE).unwrap().max, 2);
    assert_eq!(controller.wavetable_count(), 3);
    assert_eq!(controller.wavetable_name(1), Some("two"));
}

#[test]
fn test_config_sets_initial_parameters() {
    let mut config = EngineConfig::default();
    config.parameters.insert("Depth".into(), 100);
    config.parameters.insert("Out 1 Mode".into(), 1);
    config.parameters.insert("Nonexistent".into(), 3);

    let (controller, _processor) = engine(1, &config);
    assert_eq!(controller.parameter(PARAM_DEPTH), Some(100));
    assert_eq!(
        controller.parameter(channel_param_id(0, ChannelParam::Mode)),
        Some(1)
    );
}

#[test]
fn test_construct_rejects_small_regions() {
    let req = crate::layout::size_requirements(2).unwrap();
    let mut regions = MemoryRegions::allocate(&req);
    regions.working = vec![0.0; 16].into_boxed_slice();
    let err = construct(regions, 2, &EngineConfig::default()).err();
    assert!(matches!(
        err,
        Some(LayoutError::RegionTooSmall { region: "working", .. })
    ));
}

#[test]
fn test_parameter_values_are_clamped() {
    let (mut controller, _processor) = engine(1, &EngineConfig::default());
    controller.set_parameter(PARAM_GAIN, 1000);
    assert_eq!(controller.parameter(PARAM_GAIN), Some(240));
    controller.set_parameter(channel_param_id(0, ChannelParam::Input), 0);
    assert_eq!(
        controller.parameter(channel_param_id(0, ChannelParam::Input)),
        Some(1)
    );
    assert_eq!(controller.parameter(500), None);
}
