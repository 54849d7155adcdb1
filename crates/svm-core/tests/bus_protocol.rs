//! Register-file and control-FSM behaviour as seen from the bus
//!
//! Every test drives the core cycle by cycle through `Core::tick`, exactly
//! like a bus master would.

use svm_chip::regs::{self, control, status};
use svm_chip::Register;
use svm_core::{BusRequest, Core, CoreConfig, Lane, OperandLatch, Phase, Response, Scorer};

fn linear_core(n: usize) -> Core {
    Core::new(CoreConfig::linear(n)).expect("linear build")
}

/// Tick once, returning whether the scorer output was valid during that cycle
fn tick_counting(core: &mut Core, request: &BusRequest) -> usize {
    let pulse = usize::from(core.scorer().output().is_some());
    core.tick(request);
    pulse
}

/// Full write transaction; returns output pulses observed meanwhile
fn write(core: &mut Core, addr: u32, data: u32) -> usize {
    let pulses = tick_counting(core, &BusRequest::write(addr, data));
    pulses + tick_counting(core, &BusRequest::idle())
}

fn read(core: &mut Core, addr: u32) -> u32 {
    core.tick(&BusRequest::read(addr));
    core.tick(&BusRequest::idle())
        .read_data
        .expect("read response one cycle after accept")
        .data
}

fn idle(core: &mut Core, cycles: usize) -> usize {
    (0..cycles)
        .map(|_| tick_counting(core, &BusRequest::idle()))
        .sum()
}

#[allow(clippy::cast_sign_loss)]
fn word(v: Lane) -> u32 {
    i32::from(v) as u32
}

fn load_ones(core: &mut Core) {
    let map = *core.map();
    for i in 0..core.geometry().features {
        write(core, map.offset(Register::Weight(i)), word(256));
        write(core, map.offset(Register::Feature(i)), word(256));
    }
}

#[test]
fn test_held_start_triggers_one_inference() {
    let mut core = linear_core(16);
    load_ones(&mut core);
    let mut pulses = write(&mut core, regs::CONTROL, control::START);
    pulses += idle(&mut core, 100);
    assert_eq!(pulses, 1, "held start must fire exactly once");

    // rewriting 1 without an intervening 0 does not retrigger
    pulses += write(&mut core, regs::CONTROL, control::START);
    pulses += idle(&mut core, 40);
    assert_eq!(pulses, 1);
}

#[test]
fn test_toggled_start_triggers_two_inferences() {
    let mut core = linear_core(16);
    load_ones(&mut core);
    let mut pulses = write(&mut core, regs::CONTROL, control::START);
    pulses += idle(&mut core, 20);
    pulses += write(&mut core, regs::CONTROL, 0);
    pulses += write(&mut core, regs::CONTROL, control::START);
    pulses += idle(&mut core, 20);
    assert_eq!(pulses, 2);
}

#[test]
fn test_reference_example_all_ones() {
    let mut core = linear_core(16);
    load_ones(&mut core);
    write(&mut core, regs::CONTROL, control::START);
    idle(&mut core, 10);
    assert_eq!(read(&mut core, regs::RESULT), 16 * 256);
    assert_eq!(read(&mut core, regs::STATUS), status::DONE | status::PREDICTION);
    assert_eq!(read(&mut core, regs::LATENCY), 6);
}

#[test]
fn test_status_busy_during_flight_then_done() {
    let mut core = linear_core(16);
    write(&mut core, regs::CONTROL, control::START);
    // edge is seen in the ack cycle, so the first read is already busy
    assert_eq!(read(&mut core, regs::STATUS) & status::BUSY, status::BUSY);
    idle(&mut core, 10);
    let s = read(&mut core, regs::STATUS);
    assert_eq!(s & (status::BUSY | status::DONE), status::DONE);
}

#[test]
fn test_results_stable_between_starts() {
    let mut core = linear_core(4);
    load_ones(&mut core);
    write(&mut core, regs::CONTROL, control::START);
    idle(&mut core, 10);
    let first: Vec<u32> = [regs::RESULT, regs::STATUS, regs::LATENCY]
        .iter()
        .map(|&a| read(&mut core, a))
        .collect();
    for _ in 0..5 {
        idle(&mut core, 3);
        let again: Vec<u32> = [regs::RESULT, regs::STATUS, regs::LATENCY]
            .iter()
            .map(|&a| read(&mut core, a))
            .collect();
        assert_eq!(first, again);
    }
    // operand changes do not touch captured results
    write(&mut core, regs::BIAS, word(-2048));
    assert_eq!(read(&mut core, regs::RESULT), first[0]);
}

#[test]
fn test_latency_register_matches_engine_latency() {
    for n in [1, 2, 3, 5, 8, 9, 16, 17, 64] {
        let mut core = linear_core(n);
        write(&mut core, regs::CONTROL, control::START);
        idle(&mut core, 20);
        assert_eq!(
            read(&mut core, regs::LATENCY),
            core.latency(),
            "latency register for N={n}"
        );
    }
}

#[test]
fn test_repeated_runs_are_identical() {
    let run = || {
        let mut core = linear_core(7);
        load_ones(&mut core);
        write(&mut core, regs::BIAS, word(-300));
        let mut seen = Vec::new();
        for _ in 0..3 {
            write(&mut core, regs::CONTROL, control::START);
            idle(&mut core, 10);
            seen.push((read(&mut core, regs::RESULT), read(&mut core, regs::LATENCY)));
            write(&mut core, regs::CONTROL, 0);
        }
        seen
    };
    let a = run();
    assert!(a.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(a, run());
}

#[test]
fn test_feature_write_at_start_edge_misses_that_inference() {
    for latch in [OperandLatch::OnStart, OperandLatch::Live] {
        let mut core =
            Core::new(CoreConfig::linear(4).with_latch(latch)).expect("linear build");
        load_ones(&mut core);
        let feature0 = core.map().offset(Register::Feature(0));

        // start commits on this edge; the FSM still saw control = 0
        core.tick(&BusRequest::write(regs::CONTROL, control::START));
        assert_eq!(core.status().phase, Phase::Idle);

        // edge cycle: FSM goes busy and the scorer takes its operands, while
        // the feature write issued alongside stalls behind the start's ack
        let edge = core.tick(&BusRequest::write(feature0, word(-256)));
        assert_eq!(edge.write_ack, Some(Response::Okay));
        assert!(!edge.write_ready, "{latch:?}");
        assert_eq!(core.status().phase, Phase::Busy);

        let next = core.tick(&BusRequest::write(feature0, word(-256)));
        assert!(next.write_ready, "held write accepted once the ack clears");
        idle(&mut core, 10);
        assert_eq!(read(&mut core, feature0), word(-256));
        assert_eq!(read(&mut core, regs::RESULT), 4 * 256, "{latch:?}");

        // the following inference picks the new value up
        write(&mut core, regs::CONTROL, 0);
        write(&mut core, regs::CONTROL, control::START);
        idle(&mut core, 10);
        assert_eq!(read(&mut core, regs::RESULT), 2 * 256, "{latch:?}");
    }
}

#[test]
fn test_handshake_timing() {
    let mut core = linear_core(4);
    // accept cycle: ready high, no response yet
    let out = core.tick(&BusRequest::write(regs::BIAS, 3));
    assert!(out.write_ready);
    assert_eq!(out.write_ack, None);
    // response cycle: ack pulse, channel busy
    let out = core.tick(&BusRequest::write(regs::BIAS, 4));
    assert_eq!(out.write_ack, Some(Response::Okay));
    assert!(!out.write_ready, "second write must stall behind the ack");
    // stalled write is accepted now
    let out = core.tick(&BusRequest::write(regs::BIAS, 4));
    assert!(out.write_ready);
    assert_eq!(out.write_ack, None);
    let out = core.tick(&BusRequest::idle());
    assert_eq!(out.write_ack, Some(Response::Okay));
    // ack lasts exactly one cycle
    assert_eq!(core.tick(&BusRequest::idle()).write_ack, None);
    assert_eq!(read(&mut core, regs::BIAS), 4);
}

#[test]
fn test_read_and_write_channels_are_independent() {
    let mut core = linear_core(4);
    let both = BusRequest {
        write: Some(svm_core::WriteRequest::word(regs::BIAS, 11)),
        read: Some(svm_core::ReadRequest {
            addr: regs::LATENCY,
        }),
    };
    let out = core.tick(&both);
    assert!(out.write_ready && out.read_ready);
    let out = core.tick(&BusRequest::idle());
    assert_eq!(out.write_ack, Some(Response::Okay));
    assert_eq!(out.read_data.map(|d| d.data), Some(0));
}

#[test]
fn test_unmapped_access_absorbed() {
    let mut core = linear_core(4);
    let end = core.map().end();
    let out_of_map = [end, end + 0x100, 0x14, 0x1C, 0x7C, 0xFFFF_FFFC];
    for &addr in &out_of_map {
        write(&mut core, addr, 0xFFFF_FFFF);
        assert_eq!(read(&mut core, addr), 0, "read of {addr:#x}");
    }
    // read-only registers ignore writes, status stays clean
    write(&mut core, regs::STATUS, 0xFFFF_FFFF);
    write(&mut core, regs::RESULT, 0xFFFF_FFFF);
    write(&mut core, regs::LATENCY, 0xFFFF_FFFF);
    assert_eq!(read(&mut core, regs::STATUS), 0);
    assert_eq!(read(&mut core, regs::RESULT), 0);
    assert_eq!(read(&mut core, regs::LATENCY), 0);
    assert_eq!(core.status().phase, Phase::Idle);
}

#[test]
fn test_byte_lane_bits_ignored() {
    let mut core = linear_core(4);
    write(&mut core, regs::BIAS | 0b10, 0x1234);
    assert_eq!(read(&mut core, regs::BIAS | 0b01), 0x1234);
}

#[test]
fn test_decode_errors_keep_timing() {
    let mut core = Core::new(CoreConfig::linear(4).with_decode_errors(true)).expect("build");
    let out = core.tick(&BusRequest::write(0xF00, 1));
    assert!(out.write_ready);
    let out = core.tick(&BusRequest::read(0xF00));
    assert_eq!(out.write_ack, Some(Response::SlvErr));
    let out = core.tick(&BusRequest::idle());
    let data = out.read_data.expect("read response");
    assert_eq!(data.resp, Response::SlvErr);
    assert_eq!(data.data, 0);
}

#[test]
fn test_soft_reset_aborts_inflight_and_keeps_registers() {
    let mut core = linear_core(16);
    load_ones(&mut core);
    write(&mut core, regs::BIAS, word(128));
    write(&mut core, regs::CONTROL, control::START);
    // cut the inference short
    let pulses = write(&mut core, regs::CONTROL, control::SOFT_RESET)
        + idle(&mut core, 20);
    assert_eq!(pulses, 0, "flushed pipeline must not deliver a result");
    assert_eq!(core.scorer().occupancy(), 0);
    assert_eq!(read(&mut core, regs::STATUS), 0);
    assert_eq!(read(&mut core, regs::BIAS), word(128));
    assert_eq!(read(&mut core, regs::CONTROL), control::SOFT_RESET);

    // release and restart
    write(&mut core, regs::CONTROL, 0);
    write(&mut core, regs::CONTROL, control::START);
    idle(&mut core, 10);
    assert_eq!(read(&mut core, regs::RESULT), 16 * 256 + 128);
}

#[test]
fn test_full_reset_clears_everything() {
    let mut core = linear_core(4);
    load_ones(&mut core);
    write(&mut core, regs::CONTROL, control::START);
    idle(&mut core, 10);
    core.reset();
    for addr in [regs::CONTROL, regs::STATUS, regs::RESULT, regs::LATENCY, regs::BIAS] {
        assert_eq!(read(&mut core, addr), 0);
    }
    let feature = core.map().offset(Register::Feature(0));
    assert_eq!(read(&mut core, feature), 0);
}
