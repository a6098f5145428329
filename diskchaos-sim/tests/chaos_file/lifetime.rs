//! In-flight operations outlive the wrapper that issued them.

use std::rc::Rc;
use std::time::Duration;

use diskchaos_sim::SimWorld;

use crate::harness::{fixed_chaos_file, run_local, run_sim, Call};

#[test]
fn dropping_the_wrapper_does_not_cancel_a_delayed_write() {
    run_local(async {
        let mut sim = SimWorld::new();
        let (file, _faults, recording) =
            fixed_chaos_file(&sim, "orphan.db", Duration::from_secs(1), 0.0, true);

        run_sim(&mut sim, async move {
            let inner = Rc::clone(file.inner());
            let write = file.write(b"survives", 0);
            drop(file);
            // The operation holds the only other reference
            assert_eq!(Rc::strong_count(&inner), 2);
            write.await.expect("write completes");
            assert_eq!(Rc::strong_count(&inner), 1);
        })
        .await;

        assert_eq!(sim.now(), Duration::from_secs(1));
        assert_eq!(recording.contents(), b"survives");
    });
}

#[test]
fn dropping_the_wrapper_does_not_cancel_delayed_reads_or_truncates() {
    run_local(async {
        let mut sim = SimWorld::new();
        let (file, _faults, recording) =
            fixed_chaos_file(&sim, "orphan2.db", Duration::from_millis(300), 0.0, true);

        let read = run_sim(&mut sim, async move {
            file.write(b"0123456789", 0).await.expect("write");

            let mut buf = [0u8; 4];
            let read = file.read(&mut buf, 2);
            let truncate = file.truncate(8);
            let size = file.size();
            let sync = file.sync();
            drop(file);

            let n = read.await.expect("read");
            truncate.await.expect("truncate");
            sync.await.expect("sync");
            let size = size.await.expect("size");
            (n, buf, size)
        })
        .await;

        assert_eq!(read, (4, *b"2345", 8));
        assert_eq!(
            recording.calls(),
            vec![
                Call::Write {
                    offset: 0,
                    data: b"0123456789".to_vec()
                },
                Call::Read { offset: 2, len: 4 },
                Call::SetLen(8),
                Call::Sync,
                Call::Size,
            ]
        );
    });
}

#[test]
fn dead_clock_still_issues_the_io() {
    run_local(async {
        let sim = SimWorld::new();
        let (file, _faults, recording) =
            fixed_chaos_file(&sim, "late.db", Duration::from_secs(5), 0.0, true);

        let write = file.write(b"after shutdown", 0);
        drop(sim);

        write.await.expect("write goes ahead without a clock");
        assert_eq!(recording.contents(), b"after shutdown");
    });
}

#[test]
fn shutdown_wakes_delayed_operations() {
    run_local(async {
        let mut sim = SimWorld::new();
        let (file, _faults, recording) =
            fixed_chaos_file(&sim, "drain.db", Duration::from_secs(3600), 0.0, true);

        let handle = tokio::task::spawn_local(async move {
            file.write(b"drained", 0).await
        });

        // Let the write register its hour-long sleep
        while sim.pending_event_count() == 0 {
            tokio::task::yield_now().await;
        }

        // Process only the shutdown, not the timer an hour out
        sim.shutdown();
        sim.step();
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }

        handle.await.expect("task panicked").expect("write");
        assert_eq!(recording.contents(), b"drained");
        assert_eq!(sim.now(), Duration::ZERO);
        assert_eq!(sim.pending_event_count(), 1);
    });
}
