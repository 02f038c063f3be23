//! Core Data Structure Tests
//!
//! Tests for:
//! - StableIndexArray: index stability under append/remove, defragmenting sort
//! - VariableRecordStore: handles, sizes, typed reads
//! - BoundedStack: capacity limit

use std::ops::ControlFlow;

use thirty::core::{BoundedStack, StableIndexArray, VariableRecordStore};

// ============================================================================
// StableIndexArray
// ============================================================================

#[test]
fn surviving_indices_keep_their_elements() {
    let mut arr = StableIndexArray::new();
    let mut expected: Vec<Option<u32>> = Vec::new();

    // deterministic pseudo-random append/remove mix
    let mut seed: u32 = 0x2545_F491;
    for step in 0..500u32 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let live: Vec<usize> = (0..expected.len()).filter(|&i| expected[i].is_some()).collect();
        if seed % 3 == 0 && !live.is_empty() {
            let victim = live[(seed as usize / 3) % live.len()];
            assert_eq!(arr.remove(victim), expected[victim].take().unwrap());
        } else {
            let index = arr.append(step);
            assert_eq!(index, expected.len());
            expected.push(Some(step));
        }
    }

    for (i, value) in expected.iter().enumerate() {
        assert_eq!(arr.get(i).copied(), *value, "index {i}");
    }
    let live = expected.iter().filter(|v| v.is_some()).count();
    assert_eq!(arr.live_len(), live);
    assert_eq!(arr.tombstone_count(), expected.len() - live);
}

#[test]
fn append_never_reuses_tombstones() {
    let mut arr = StableIndexArray::new();
    let a = arr.append("a");
    arr.append("b");
    arr.remove(a);
    let c = arr.append("c");
    assert_eq!(c, 2);
    assert!(arr.get(a).is_none());
}

#[test]
fn sort_defragments() {
    let mut arr = StableIndexArray::new();
    for v in [5, 3, 9, 1, 7, 4] {
        arr.append(v);
    }
    arr.remove(2);
    arr.remove(4);

    arr.sort_by(|a: &i32, b: &i32| a.cmp(b));
    assert_eq!(arr.len(), 4);
    assert_eq!(arr.tombstone_count(), 0);
    assert_eq!(arr.values().copied().collect::<Vec<_>>(), vec![1, 3, 4, 5]);
    assert_eq!(arr.binary_search_by(|v| v.cmp(&4)), Ok(2));
    assert_eq!(arr.binary_search_by(|v| v.cmp(&2)), Err(1));
}

#[test]
fn sort_with_remap_reports_moves() {
    let mut arr = StableIndexArray::new();
    arr.append('c');
    arr.append('x');
    arr.append('a');
    arr.remove(1);

    let remap = arr.sort_by_with_remap(|a, b| a.cmp(b));
    assert_eq!(remap, vec![Some(1), None, Some(0)]);
    assert_eq!(arr[0], 'a');
    assert_eq!(arr[1], 'c');
}

#[test]
fn iteration_skips_tombstones() {
    let mut arr = StableIndexArray::new();
    for v in 0..5 {
        arr.append(v * 10);
    }
    arr.remove(1);
    arr.remove(3);

    let seen: Vec<(usize, i32)> = arr.iter().map(|(i, v)| (i, *v)).collect();
    assert_eq!(seen, vec![(0, 0), (2, 20), (4, 40)]);

    let mut visited = 0;
    let flow = arr.for_each(|_, v| {
        visited += 1;
        if *v == 20 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    assert_eq!(flow, ControlFlow::Break(()));
    assert_eq!(visited, 2);
}

#[test]
fn pop_in_append_pop_style() {
    let mut arr = StableIndexArray::new();
    arr.append(1);
    arr.append(2);
    assert_eq!(arr.pop(), Some(2));
    assert_eq!(arr.pop(), Some(1));
    assert_eq!(arr.pop(), None);
}

// ============================================================================
// VariableRecordStore
// ============================================================================

#[test]
fn record_handles_count_appends() {
    let mut store = VariableRecordStore::new(8, 16);
    let a = store.append_bytes(&[1, 2, 3]);
    let b = store.push(&[7u32, 8u32]);
    let c = store.append_bytes(&[0; 40]);
    assert_eq!((a, b, c), (0, 1, 2));

    assert_eq!(store.get(a), Some(&[1u8, 2, 3][..]));
    assert_eq!(store.read::<[u32; 2]>(b), Some(&[7, 8]));
    assert_eq!(store.size_of(c), Some(40));
    assert!(store.get(3).is_none());
}

#[test]
fn records_survive_growth() {
    let mut store = VariableRecordStore::new(16, 16);
    let handles: Vec<usize> = (0..100u32).map(|i| store.push(&[i; 4])).collect();
    for (i, h) in handles.into_iter().enumerate() {
        assert_eq!(store.read::<[u32; 4]>(h), Some(&[i as u32; 4]));
    }
    assert!(store.capacity() >= 100 * 16);
}

// ============================================================================
// BoundedStack
// ============================================================================

#[test]
fn bounded_stack_is_lifo_and_bounded() {
    let mut stack = BoundedStack::new(2);
    assert!(stack.push(1).is_ok());
    assert!(stack.push(2).is_ok());
    assert!(stack.push(3).is_err());
    assert_eq!(stack.peek(), Some(&2));
    assert_eq!(stack.pop(), Some(2));
    assert_eq!(stack.pop(), Some(1));
    assert_eq!(stack.pop(), None);
}
