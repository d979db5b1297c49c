use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use contiguous_allocator::{AllocationError, Memory, Owner, SharedMemory, Strategy};

use rand::distributions::Distribution;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use test_log::test;

const TOTAL_SIZE: usize = 4096;

fn validate(memory: &Memory, allocated_size: usize) {
    let (validity, stats) = memory.stats();
    log::trace!(
        "Allocated: {}; Validity: {:?}, Stats: {:?}",
        allocated_size,
        validity,
        stats,
    );
    log::trace!("Blocks: {}", memory.blocks());
    assert!(validity.is_valid(), "{}: {:?}", memory.blocks(), validity);

    assert_eq!(stats.allocated_size, allocated_size);
    assert_eq!(stats.free_size, memory.total_size() - allocated_size);

    // The status report never skips an address.
    let mut expected_start = 0;
    for entry in memory.status() {
        assert_eq!(entry.start(), expected_start);
        expected_start = entry.end();
    }
    assert_eq!(expected_start, memory.total_size());
}

#[test]
fn test_stress() {
    let mut memory = Memory::new(NonZeroUsize::new(TOTAL_SIZE).unwrap());

    // Each slot is an owner name and the size it holds, if any.
    let mut slots: Vec<(Owner, Option<usize>)> = (0..64)
        .map(|i| (Owner::new(&format!("P{}", i)).unwrap(), None))
        .collect();
    let mut allocated_size: usize = 0;

    let seed: u64 = rand::thread_rng().next_u64();
    log::info!("Using seed {}", seed);
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let range = rand::distributions::Uniform::new_inclusive(1usize, 16);
    let percent = rand::distributions::Uniform::new(0, 100);

    for _ in 0..1024 * 10 {
        if percent.sample(&mut rng) < 2 {
            let before = memory.len();
            memory.compact().unwrap();
            log::info!("Compacted {} blocks into {}", before, memory.len());
            assert!(memory.len() <= before);
            assert!(memory.stats().1.free_blocks <= 1);
            validate(&memory, allocated_size);
            continue;
        }

        let chosen = slots.choose_mut(&mut rng).unwrap();
        let (owner, held) = *chosen;
        match held {
            None => {
                // Let's try allocating
                let size = range.sample(&mut rng) * range.sample(&mut rng);
                let &strategy = Strategy::ALL.choose(&mut rng).unwrap();
                let largest_free = memory.stats().1.largest_free;
                let len = memory.len();

                match memory.allocate(owner, NonZeroUsize::new(size).unwrap(), strategy) {
                    Ok(placed) => {
                        log::info!("Allocated {:?} to {} using {:?}", placed, owner, strategy);
                        assert_eq!(placed.len(), size);
                        assert!(size <= largest_free);
                        assert!(memory.len() == len || memory.len() == len + 1);
                        *chosen = (owner, Some(size));
                        allocated_size += size;
                    }
                    Err(AllocationError::NoSuitableBlock { requested }) => {
                        log::info!("No room for {} bytes for {}", requested, owner);
                        assert_eq!(requested, size);
                        assert!(size > largest_free);
                        assert_eq!(memory.len(), len);
                    }
                    Err(e) => panic!("Unexpected error allocating for {}: {}", owner, e),
                }
            }
            Some(size) => {
                // Let's try freeing
                let released = memory.release(&owner).unwrap();
                log::info!("Released {:?} from {}", released, owner);
                assert_eq!(released.len(), size);
                assert!(!memory.owns(&owner));
                *chosen = (owner, None);
                allocated_size -= size;
            }
        }

        // And validate that everything is ok
        validate(&memory, allocated_size);
    }

    // Give everything back, and we should be left with one free block.
    for (owner, held) in slots.iter_mut() {
        if let Some(size) = held.take() {
            memory.release(owner).unwrap();
            allocated_size -= size;
            validate(&memory, allocated_size);
        }
    }
    assert_eq!(memory, Memory::new(NonZeroUsize::new(TOTAL_SIZE).unwrap()));
}

#[test]
fn test_shared_between_threads() {
    let shared = Arc::new(SharedMemory::new(Memory::new(
        NonZeroUsize::new(TOTAL_SIZE).unwrap(),
    )));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for round in 0..100 {
                    let owner = Owner::new(&format!("T{}R{}", t, round % 8)).unwrap();
                    let size = NonZeroUsize::new(1 + (round * 7 + t) % 32).unwrap();
                    let strategy = Strategy::ALL[round % 3];

                    if shared.release(&owner).is_err() {
                        shared.allocate(owner, size, strategy).unwrap();
                    }
                    if round % 25 == 0 {
                        shared.compact().unwrap();
                    }
                    let (validity, _) = shared.stats();
                    assert!(validity.is_valid());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let memory = Arc::try_unwrap(shared)
        .ok()
        .expect("all threads have finished")
        .into_inner();
    let (validity, stats) = memory.stats();
    assert!(validity.is_valid());
    log::info!("Final blocks: {} ({:?})", memory.blocks(), stats);
}
