// End-to-end arena scenarios through the public API.

use regio_mem::{Arena, ArenaConfig, ArenaError, ArenaFactory, Growth};

#[test]
fn growth_on_overflow() {
    let mut arena = Arena::new(100);

    let first = arena.alloc(50).unwrap();
    assert_eq!(arena.used(), 50);

    let second = arena.alloc(60).unwrap();
    assert_eq!(arena.block_count(), 2);
    assert!(arena.used() >= 110);
    assert!(arena.capacity() >= 100 + 200);

    // The new head has room for at least another 140 bytes.
    assert!(arena.remaining() >= 140);
    assert_ne!(first, second);
}

#[test]
fn default_alignment_inserts_padding() {
    let mut arena = Arena::new(1024);
    assert_eq!(arena.alignment(), 8);

    let a = arena.alloc(10).unwrap();
    let b = arena.alloc(10).unwrap();

    assert_eq!(a.as_ptr().addr() % 8, 0);
    assert_eq!(b.as_ptr().addr() - a.as_ptr().addr(), 16);
    assert_eq!(arena.used(), 26);
}

#[test]
fn reset_then_reuse() {
    let mut arena = Arena::new(1024);
    let before = arena.alloc(100).unwrap();

    arena.reset();
    assert_eq!(arena.used(), 0);

    let after = arena.alloc(200).unwrap();
    assert_eq!(arena.used(), 200);
    assert_eq!(before, after);
}

#[test]
fn temporary_scope_rolls_back() {
    let mut arena = Arena::new(1024);
    arena.alloc(100).unwrap();
    let used_before = arena.used();

    let scope = arena.temp_begin();
    arena.alloc(200).unwrap();
    arena.temp_end(scope);

    assert_eq!(arena.used(), used_before);
}

#[test]
fn fixed_and_growing_modes_differ() {
    let fixed = ArenaConfig::new()
        .with_capacity(100)
        .with_alignment(1)
        .with_growth(Growth::Fixed);

    let mut arena = Arena::with_config(fixed);
    arena.alloc(50).unwrap();
    arena.alloc(30).unwrap();
    assert_eq!(
        arena.alloc(30),
        Err(ArenaError::CapacityExceeded {
            requested: 30,
            available: 20
        })
    );
    assert_eq!(arena.used(), 80);

    let mut arena = Arena::with_config(fixed.with_growth(Growth::Grow));
    arena.alloc(50).unwrap();
    arena.alloc(30).unwrap();
    arena.alloc(30).unwrap();
    assert_eq!(arena.used(), 110);
    assert_eq!(arena.block_count(), 2);
}

#[test]
fn calloc_rejects_every_overflowing_product() {
    let mut arena = Arena::new(1024);

    let sizes = [2usize, 3, 16, 1 << 20, usize::MAX / 2, usize::MAX];
    for &count in &sizes {
        for &size in &sizes {
            if count.checked_mul(size).is_none() {
                assert_eq!(
                    arena.calloc(count, size),
                    Err(ArenaError::SizeOverflow { count, size })
                );
            }
        }
    }
    assert_eq!(arena.used(), 0);
    assert_eq!(arena.block_count(), 1);
}

#[test]
fn external_buffer_arena() {
    let mut storage = vec![0u8; 256];
    {
        let config = ArenaConfig::new()
            .with_alignment(1)
            .with_growth(Growth::Fixed);
        let mut arena = Arena::from_buffer_with_config(&mut storage, config).unwrap();
        let text = arena.strdup(c"borrowed").unwrap();
        let copy = unsafe { std::ffi::CStr::from_ptr(text.as_ptr().cast()) };
        assert_eq!(copy.to_bytes(), b"borrowed");
        arena.destroy();
    }
    assert_eq!(&storage[..9], b"borrowed\0");
}

#[test]
fn per_request_arenas_from_factory() {
    let factory = ArenaFactory::new(512);

    let totals: Vec<usize> = (1..=3)
        .map(|n| {
            factory.with_arena(|arena| {
                for _ in 0..n {
                    arena.alloc(64).unwrap();
                }
                arena.used()
            })
        })
        .collect();

    assert_eq!(totals, vec![64, 128, 192]);
}

#[test]
fn arenas_move_across_threads() {
    let handles: Vec<_> = (0..4usize)
        .map(|i| {
            std::thread::spawn(move || {
                let mut arena = Arena::new(256);
                for _ in 0..=i {
                    arena.alloc(32).unwrap();
                }
                arena.used()
            })
        })
        .collect();

    let used: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(used, vec![32, 64, 96, 128]);
}
