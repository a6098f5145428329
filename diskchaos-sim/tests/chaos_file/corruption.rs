//! Bit-flip injection on writes.

use futures::FutureExt;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use diskchaos_sim::{
    ChaosContext, ChaosFile, FixedStorageFaults, MemoryStorageFile, RandomProvider,
    SimRandomProvider, SimWorld,
};

use crate::harness::{differing_bits, fixed_chaos_file, run_local, run_sim, Call, FailingFile};

/// Replays the draws a 100% corrupting write of `len` bytes makes on a fresh
/// provider seeded with `seed`: the trigger ratio, the byte, then the bit.
fn replay_draws(seed: u64, len: usize) -> (usize, u32) {
    let random = SimRandomProvider::new(seed);
    let _trigger = random.random_ratio();
    let byte = random.random_range(0..len);
    let bit = random.random_range(0..8u32);
    (byte, bit)
}

fn written_payloads(calls: Vec<Call>) -> Vec<(u64, Vec<u8>)> {
    calls
        .into_iter()
        .filter_map(|call| match call {
            Call::Write { offset, data } => Some((offset, data)),
            _ => None,
        })
        .collect()
}

#[test]
fn byte_three_bit_five_at_offset_1000() {
    let seed = (0..10_000u64)
        .find(|seed| replay_draws(*seed, 8) == (3, 5))
        .expect("some seed draws byte 3, bit 5");

    let sim = SimWorld::new_with_seed(seed);
    let (file, _faults, recording) =
        fixed_chaos_file(&sim, "scenario.db", Duration::ZERO, 100.0, true);

    let original = *b"ABCDEFGH";
    let caller_buffer = original;
    file.write(&caller_buffer, 1000)
        .now_or_never()
        .expect("no delay configured")
        .expect("corrupted writes still succeed");

    assert_eq!(sim.corrupted_bytes().positions("scenario.db"), vec![1003]);

    let writes = written_payloads(recording.calls());
    assert_eq!(writes.len(), 1);
    let (offset, delivered) = &writes[0];
    assert_eq!(*offset, 1000);
    assert_eq!(delivered[3], original[3] ^ (1 << 5));
    assert_eq!(differing_bits(delivered, &original), 1);

    // The caller's buffer is never touched
    assert_eq!(caller_buffer, original);
    assert_eq!(sim.metrics().bit_flips(), 1);
}

#[test]
fn every_corrupted_write_differs_by_exactly_one_bit() {
    let sim = SimWorld::new_with_seed(21);
    let (file, _faults, recording) =
        fixed_chaos_file(&sim, "many.db", Duration::ZERO, 100.0, true);

    let mut expected_positions = Vec::new();
    for i in 0..50u64 {
        let len = (i as usize % 13) + 1;
        let data: Vec<u8> = (0..len).map(|b| (b as u8).wrapping_mul(31)).collect();
        let offset = i * 100;
        file.write(&data, offset)
            .now_or_never()
            .expect("no delay configured")
            .expect("write");

        let writes = written_payloads(recording.calls());
        let (written_offset, delivered) = writes.last().expect("write recorded");
        assert_eq!(*written_offset, offset);
        assert_eq!(differing_bits(delivered, &data), 1);

        let byte = delivered
            .iter()
            .zip(&data)
            .position(|(a, b)| a != b)
            .expect("one byte differs");
        expected_positions.push(offset + byte as u64);
    }

    assert_eq!(sim.corrupted_bytes().positions("many.db"), expected_positions);
    assert_eq!(sim.metrics().bit_flips(), 50);
}

#[test]
fn zero_percentage_never_corrupts() {
    let sim = SimWorld::new_with_seed(8);
    let (file, _faults, recording) =
        fixed_chaos_file(&sim, "clean.db", Duration::ZERO, 0.0, true);

    for i in 0..200u64 {
        let data = [i as u8; 16];
        file.write(&data, i * 16)
            .now_or_never()
            .expect("no delay configured")
            .expect("write");
    }

    for (offset, delivered) in written_payloads(recording.calls()) {
        assert_eq!(delivered, vec![(offset / 16) as u8; 16]);
    }
    assert_eq!(sim.metrics().bit_flips(), 0);
    assert_eq!(sim.corrupted_bytes().total(), 0);
}

#[test]
fn out_of_range_percentages_fail_open() {
    let sim = SimWorld::new_with_seed(8);
    let (file, faults, _recording) =
        fixed_chaos_file(&sim, "bad-config.db", Duration::ZERO, 0.0, true);

    for percentage in [-1.0, 100.01, 1e9, f64::NAN, f64::INFINITY] {
        faults.set_bit_flip_percentage(percentage);
        file.write(b"payload", 0)
            .now_or_never()
            .expect("no delay configured")
            .expect("write");
    }

    assert_eq!(sim.metrics().bit_flips(), 0);
}

#[test]
fn empty_write_is_never_corrupted() {
    let sim = SimWorld::new();
    let (file, _faults, recording) =
        fixed_chaos_file(&sim, "empty.db", Duration::ZERO, 100.0, true);

    file.write(&[], 42)
        .now_or_never()
        .expect("no delay configured")
        .expect("write");

    assert_eq!(
        recording.calls(),
        vec![Call::Write {
            offset: 42,
            data: Vec::new()
        }]
    );
    assert_eq!(sim.metrics().bit_flips(), 0);
}

#[test]
fn partial_percentage_corrupts_some_writes() {
    let sim = SimWorld::new_with_seed(1234);
    let (file, _faults, _recording) =
        fixed_chaos_file(&sim, "sometimes.db", Duration::ZERO, 50.0, true);

    for i in 0..400u64 {
        file.write(&[0u8; 32], i * 32)
            .now_or_never()
            .expect("no delay configured")
            .expect("write");
    }

    let flips = sim.metrics().bit_flips();
    assert!((100..300).contains(&flips), "{flips} of 400 writes corrupted");
    assert_eq!(sim.corrupted_bytes().total() as u64, flips);
}

#[test]
fn failed_corrupted_write_is_not_recorded() {
    let sim = SimWorld::new();
    let faults = Rc::new(FixedStorageFaults::new(Duration::ZERO, 100.0));
    let ctx = ChaosContext::new(sim.time_provider(), sim.random_provider(), sim.metrics())
        .with_faults(faults)
        .with_corrupted_bytes(sim.corrupted_bytes());
    let file = ChaosFile::new(FailingFile::new(io::ErrorKind::WriteZero), true, ctx);

    let err = file
        .write(b"doomed", 0)
        .now_or_never()
        .expect("no delay configured")
        .expect_err("file rejects writes");

    assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    assert_eq!(sim.corrupted_bytes().total(), 0);
    // The flip itself happened before submission
    assert_eq!(sim.metrics().bit_flips(), 1);
}

#[test]
fn corruption_outside_simulation_is_not_tracked() {
    let sim = SimWorld::new();
    let faults = Rc::new(FixedStorageFaults::new(Duration::ZERO, 100.0));
    let ctx = ChaosContext::new(sim.time_provider(), sim.random_provider(), sim.metrics())
        .with_faults(faults);
    let file = ChaosFile::new(MemoryStorageFile::new("prod.db"), true, ctx);

    file.write(&[0u8; 8], 0)
        .now_or_never()
        .expect("no delay configured")
        .expect("write");

    assert_eq!(sim.metrics().bit_flips(), 1);
    assert_eq!(sim.corrupted_bytes().total(), 0);
    assert_eq!(differing_bits(&file.inner().contents(), &[0u8; 8]), 1);
}

#[test]
fn corrupted_write_after_delay_is_recorded_once_written() {
    run_local(async {
        let mut sim = SimWorld::new_with_seed(77);
        let (file, _faults, recording) =
            fixed_chaos_file(&sim, "delayed.db", Duration::from_millis(40), 100.0, true);
        let tracker = sim.corrupted_bytes();

        let pending_tracked = run_sim(&mut sim, {
            let tracker = tracker.clone();
            async move {
                let write = file.write(&[0xFFu8; 16], 512);
                // Decided at call time, recorded only after the write lands
                let before = tracker.total();
                write.await.expect("write");
                before
            }
        })
        .await;

        assert_eq!(pending_tracked, 0);
        assert_eq!(sim.metrics().bit_flips(), 1);
        assert_eq!(sim.metrics().disk_delays(), 1);
        let positions = tracker.positions("delayed.db");
        assert_eq!(positions.len(), 1);
        assert!((512..528).contains(&positions[0]));
        assert_eq!(differing_bits(&recording.contents()[512..], &[0xFFu8; 16]), 1);
    });
}
