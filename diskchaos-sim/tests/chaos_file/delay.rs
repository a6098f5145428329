//! Injected latency.

use futures::future::join_all;
use std::time::Duration;

use diskchaos_sim::{
    ChaosConfiguration, DiskFailureConfiguration, OpenOptions, SimWorld, StorageFile,
    StorageProvider, TimeProvider,
};

use crate::harness::{fixed_chaos_file, run_local, run_sim, run_sim_stepwise, Call};

#[test]
fn ten_concurrent_reads_each_wait_their_own_delay() {
    run_local(async {
        let mut sim = SimWorld::new();
        let (file, _faults, recording) =
            fixed_chaos_file(&sim, "reads.db", Duration::from_secs(2), 0.0, true);
        recording.write_at(&[7u8; 100], 0).await.expect("seed data");

        let results = run_sim(&mut sim, async move {
            let reads = (0..10u64).map(|i| {
                let file = &file;
                async move {
                    let mut buf = vec![0u8; 4];
                    let n = file.read(&mut buf, i * 10).await.expect("read");
                    (n, buf)
                }
            });
            join_all(reads).await
        })
        .await;

        assert_eq!(results.len(), 10);
        for (n, buf) in results {
            assert_eq!(n, 4);
            assert_eq!(buf, vec![7u8; 4]);
        }

        // All ten slept concurrently from time zero
        assert_eq!(sim.now(), Duration::from_secs(2));
        assert_eq!(sim.metrics().disk_delays(), 10);

        let mut offsets: Vec<u64> = recording
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Read { offset, len: 4 } => Some(offset),
                _ => None,
            })
            .collect();
        offsets.sort_unstable();
        assert_eq!(offsets, (0..10u64).map(|i| i * 10).collect::<Vec<_>>());
    });
}

#[test]
fn delay_is_applied_before_the_io_is_submitted() {
    run_local(async {
        let mut sim = SimWorld::new();
        let (file, _faults, recording) =
            fixed_chaos_file(&sim, "order.db", Duration::from_millis(50), 0.0, true);
        let time = sim.time_provider();

        let observed = run_sim_stepwise(&mut sim, {
            let recording = recording.clone();
            async move {
                let observer = async {
                    time.sleep(Duration::from_millis(25)).await.expect("sleep");
                    recording.calls().len()
                };
                let (synced, seen_midway) = futures::join!(file.sync(), observer);
                synced.expect("sync");
                (seen_midway, time.now())
            }
        })
        .await;

        // Nothing reached the file halfway through the delay
        assert_eq!(observed, (0, Duration::from_millis(50)));
        assert_eq!(recording.calls(), vec![Call::Sync]);
    });
}

#[test]
fn concurrent_writes_complete_in_delay_order() {
    run_local(async {
        let mut sim = SimWorld::new();
        let (file, faults, recording) =
            fixed_chaos_file(&sim, "ordered.db", Duration::from_millis(30), 0.0, true);
        let time = sim.time_provider();

        let finished = run_sim_stepwise(&mut sim, async move {
            let slow = file.write(b"slow", 0);
            faults.set_disk_delay(Duration::from_millis(10));
            let fast = file.write(b"fast", 8);

            let slow = async {
                slow.await.expect("slow write");
                time.now()
            };
            let fast = async {
                fast.await.expect("fast write");
                time.now()
            };
            futures::join!(slow, fast)
        })
        .await;

        // Each write waited only its own delay, so the later call landed first
        assert_eq!(finished, (Duration::from_millis(30), Duration::from_millis(10)));
        assert_eq!(sim.now(), Duration::from_millis(30));

        let offsets: Vec<u64> = recording
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Write { offset, .. } => Some(offset),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, vec![8, 0]);
        assert_eq!(&recording.contents()[..4], b"slow");
        assert_eq!(&recording.contents()[8..], b"fast");
    });
}

#[test]
fn delay_is_recomputed_for_every_operation() {
    run_local(async {
        let mut sim = SimWorld::new();
        let (file, faults, _recording) =
            fixed_chaos_file(&sim, "varying.db", Duration::from_millis(10), 0.0, true);

        run_sim(&mut sim, async move {
            file.size().await.expect("size");
            faults.set_disk_delay(Duration::ZERO);
            file.size().await.expect("size");
            faults.set_disk_delay(Duration::from_millis(30));
            file.size().await.expect("size");
        })
        .await;

        assert_eq!(sim.now(), Duration::from_millis(40));
        assert_eq!(sim.metrics().disk_delays(), 2);
    });
}

#[test]
fn write_counts_one_delay() {
    run_local(async {
        let mut sim = SimWorld::new();
        let (file, _faults, recording) =
            fixed_chaos_file(&sim, "write.db", Duration::from_millis(3), 0.0, true);

        run_sim(&mut sim, async move {
            file.write(b"payload", 0).await.expect("write");
        })
        .await;

        assert_eq!(sim.metrics().disk_delays(), 1);
        assert_eq!(sim.now(), Duration::from_millis(3));
        assert_eq!(recording.contents(), b"payload");
    });
}

#[test]
fn stalled_disk_waits_for_interval_boundary() {
    run_local(async {
        let config = ChaosConfiguration::disk_failure_only(DiskFailureConfiguration {
            stall_interval: Duration::from_millis(10),
            stall_duration: Duration::from_secs(1),
            throttle_duration: Duration::ZERO,
        });
        let mut sim = SimWorld::new_with_chaos_config(config, 5);
        let storage = sim.chaos_storage_provider();

        run_sim(&mut sim, async move {
            let file = storage
                .open("stalled.db", OpenOptions::read_write_create())
                .await
                .expect("open");
            file.write(b"a", 0).await.expect("write");
            file.write(b"b", 1).await.expect("write");
        })
        .await;

        assert_eq!(sim.now(), Duration::from_millis(20));
        assert_eq!(sim.metrics().disk_delays(), 2);
    });
}

#[test]
fn throttled_disk_adds_small_latency() {
    run_local(async {
        let config = ChaosConfiguration::disk_failure_only(DiskFailureConfiguration {
            stall_interval: Duration::ZERO,
            stall_duration: Duration::ZERO,
            throttle_duration: Duration::from_secs(10),
        });
        let mut sim = SimWorld::new_with_chaos_config(config, 5);
        let storage = sim.chaos_storage_provider();

        run_sim(&mut sim, async move {
            let file = storage
                .open("throttled.db", OpenOptions::read_write_create())
                .await
                .expect("open");
            for _ in 0..5 {
                file.sync().await.expect("sync");
            }
        })
        .await;

        let now = sim.now();
        assert!(now >= Duration::from_millis(5), "elapsed {now:?}");
        assert!(now < Duration::from_millis(10), "elapsed {now:?}");
        assert_eq!(sim.metrics().disk_delays(), 5);
    });
}
