// ==============================================
// CONCURRENCY TESTS (integration)
// ==============================================
//
// Several threads share one handle. Pins taken by one thread must keep the
// item resident while other threads drive the cache through eviction, and the
// bookkeeping must stay consistent once every thread has joined.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use gencache::{CacheBuilder, CacheError, InsertOptions};

fn key(thread: usize, i: usize) -> [u8; 8] {
    ((thread as u64) << 32 | i as u64).to_le_bytes()
}

// ==============================================
// Producers and consumers
// ==============================================

mod producers_consumers {
    use super::*;

    #[test]
    fn concurrent_inserts_and_reads_stay_consistent() {
        let released = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&released);
        let cache = CacheBuilder::new(8)
            .max_items(64)
            .max_storage(1_000)
            .build_with_releaser(move |_ctx: (), _payload: Arc<u64>| {
                sink.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();

        let threads = 4;
        let per_thread = 200;
        let barrier = Arc::new(Barrier::new(threads * 2));
        let mut handles = Vec::new();

        for t in 0..threads {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for i in 0..per_thread {
                    let payload = Arc::new((t * per_thread + i) as u64);
                    cache
                        .insert(&key(t, i), (), payload, InsertOptions::new(10))
                        .unwrap();
                }
            }));
        }
        for t in 0..threads {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for i in 0..per_thread {
                    if let Some(payload) = cache.acquire(&key(t, i)) {
                        assert_eq!(*payload, (t * per_thread + i) as u64);
                        cache.release(&key(t, i)).unwrap();
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        cache.check_invariants().unwrap();
        let stats = cache.stats();
        assert!(stats.slots_used <= 64);
        assert!(stats.total_storage <= 1_000);
        assert_eq!(stats.inserts, (threads * per_thread) as u64);
        assert_eq!(
            released.load(Ordering::Relaxed) + stats.slots_used,
            threads * per_thread
        );
        assert_eq!(stats.evicted_items as usize, released.load(Ordering::Relaxed));
    }

    #[test]
    fn racing_inserts_of_one_signature_admit_exactly_one() {
        let cache = CacheBuilder::new(8).build::<usize, ()>().unwrap();
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let cache = cache.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.insert(b"shared!!", (), t, InsertOptions::new(1)).is_ok()
                })
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(cache.len(), 1);
    }
}

// ==============================================
// Pins across threads
// ==============================================

mod pins {
    use super::*;

    #[test]
    fn pinned_item_survives_eviction_storm() {
        let cache = CacheBuilder::new(8)
            .max_items(16)
            .max_storage(100)
            .build::<Arc<String>, ()>()
            .unwrap();
        cache
            .insert(b"keep-me!", (), Arc::new("kept".into()), InsertOptions::new(10))
            .unwrap();
        let held = cache.acquire(b"keep-me!").unwrap();

        let threads = 4;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let cache = cache.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..500 {
                        let _ = cache.insert(&key(t + 1, i), (), Arc::new(String::new()), InsertOptions::new(15));
                        assert!(cache.check_exists(b"keep-me!", false));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(held.as_str(), "kept");
        assert_eq!(cache.lock_count(b"keep-me!"), Some(1));
        assert_eq!(cache.remove(b"keep-me!"), Err(CacheError::Locked));
        cache.release(b"keep-me!").unwrap();
        assert_eq!(cache.remove(b"keep-me!"), Ok(()));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn balanced_pins_from_many_threads_return_to_zero() {
        let cache = CacheBuilder::new(8).build::<u32, ()>().unwrap();
        cache.insert(b"counter!", (), 7, InsertOptions::new(1)).unwrap();

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = cache.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..100 {
                        assert_eq!(cache.acquire(b"counter!"), Some(7));
                        cache.release(b"counter!").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.lock_count(b"counter!"), Some(0));
        let stats = cache.stats();
        assert_eq!(stats.reads, 800);
        assert_eq!(stats.successful_reads, 800);
    }
}
