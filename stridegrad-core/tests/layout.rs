use std::collections::BTreeSet;

use stridegrad_core::{
    iterators::{PtrIter, StrideLoopDescriptor},
    Order, Shape, StrideLayout,
};

/// Every multi-index of `dims`, last axis fastest.
fn c_indices(dims: &[usize]) -> Vec<Vec<usize>> {
    let size: usize = dims.iter().product();
    let mut out = Vec::with_capacity(size);
    let mut index = vec![0; dims.len()];
    for _ in 0..size {
        out.push(index.clone());
        for k in (0..dims.len()).rev() {
            index[k] += 1;
            if index[k] < dims[k] {
                break;
            }
            index[k] = 0;
        }
    }
    out
}

fn pointers_in_c_order(layout: &StrideLayout) -> Vec<usize> {
    c_indices(layout.dims())
        .iter()
        .map(|i| layout.pointer(i).unwrap())
        .collect()
}

fn sample_layouts() -> Vec<StrideLayout> {
    let base = StrideLayout::of_order([4, 3, 5], 2, Order::C);
    vec![
        base.clone(),
        StrideLayout::of_order([4, 3, 5], 0, Order::F),
        base.narrow(2, 1, 4).unwrap(),
        base.permute(&[2, 0, 1]).unwrap(),
        base.step(0, 2).unwrap().narrow(1, 1, 3).unwrap(),
        base.narrow(1, 1, 2).unwrap().unsqueeze(1).unwrap(),
        StrideLayout::of_order([3, 1], 0, Order::C)
            .expand(1, 4)
            .unwrap(),
        StrideLayout::of_order([12], 0, Order::C)
            .unfold(0, 4, 2, 2)
            .unwrap(),
    ]
}

#[test]
fn c_order_traversal_matches_pointer() {
    for layout in sample_layouts() {
        let visited: Vec<usize> = PtrIter::new(&layout, Order::C).collect();
        assert_eq!(visited, pointers_in_c_order(&layout), "{layout:?}");
    }
}

#[test]
fn f_order_traversal_is_c_order_of_reverted_layout() {
    for layout in sample_layouts() {
        let visited: Vec<usize> = PtrIter::new(&layout, Order::F).collect();
        // reverting the axes turns an F walk into a C walk
        let reverted = layout.revert();
        assert_eq!(visited, pointers_in_c_order(&reverted), "{layout:?}");
    }
}

#[test]
fn storage_order_visits_the_same_offsets() {
    for layout in sample_layouts() {
        let mut visited: Vec<usize> = PtrIter::new(&layout, Order::Storage).collect();
        let mut expected = pointers_in_c_order(&layout);
        visited.sort_unstable();
        expected.sort_unstable();
        assert_eq!(visited, expected, "{layout:?}");
    }
}

#[test]
fn iterators_report_exact_size() {
    for layout in sample_layouts() {
        let it = PtrIter::new(&layout, Order::C);
        assert_eq!(it.len(), layout.size());
    }
}

#[test]
fn loop_descriptor_rows_cover_layout() {
    for layout in sample_layouts() {
        for order in [Order::C, Order::F, Order::Storage] {
            let desc = StrideLoopDescriptor::of(&layout, order, 4);
            assert_eq!(desc.size(), layout.size());
            assert_eq!(desc.simd_bound % desc.simd_len, 0);
            assert!(desc.simd_bound <= desc.bound);

            let from_rows: BTreeSet<usize> = desc
                .offsets
                .iter()
                .flat_map(|&o| (0..desc.bound).map(move |i| o + i * desc.step))
                .collect();
            let expected: BTreeSet<usize> = pointers_in_c_order(&layout).into_iter().collect();
            assert_eq!(from_rows, expected, "{layout:?} {order:?}");
        }
    }
}

#[test]
fn dense_layout_is_a_single_row() {
    let layout = StrideLayout::of_order([2, 3, 4], 0, Order::C);
    let desc = StrideLoopDescriptor::of(&layout, Order::C, 8);
    assert_eq!(desc.bound, 24);
    assert_eq!(desc.step, 1);
    assert_eq!(desc.offsets, vec![0]);
    assert_eq!(desc.simd_bound, 24);
}

#[test]
fn empty_layout_has_no_rows() {
    let layout = StrideLayout::of_order([3, 0, 2], 0, Order::C);
    let desc = StrideLoopDescriptor::of(&layout, Order::C, 8);
    assert_eq!(desc.size(), 0);
    assert_eq!(PtrIter::new(&layout, Order::C).count(), 0);
    assert!(layout.is_c_dense());
    assert_eq!(layout.max_pointer(), None);
}

#[test]
fn auto_order_resolution() {
    let c = StrideLayout::of_order([2, 3], 0, Order::C);
    assert_eq!(c.resolve(Order::Auto), Order::C);
    assert_eq!(c.revert().resolve(Order::Auto), Order::F);
    let strided = c.step(1, 2).unwrap();
    assert_eq!(strided.resolve(Order::Auto), Order::C);
    assert_eq!(strided.resolve(Order::F), Order::F);
}

#[test]
fn view_operations_keep_pointers() {
    let l = StrideLayout::of_order([2, 3, 4], 0, Order::C);

    let moved = l.move_axis(0, 2).unwrap();
    assert_eq!(moved.dims(), &[3, 4, 2]);
    assert_eq!(moved.pointer(&[1, 2, 1]).unwrap(), l.pointer(&[1, 1, 2]).unwrap());

    let swapped = l.swap_axes(0, 1).unwrap();
    assert_eq!(swapped.dims(), &[3, 2, 4]);
    assert_eq!(swapped.pointer(&[2, 1, 3]).unwrap(), l.pointer(&[1, 2, 3]).unwrap());

    let unsqueezed = l.unsqueeze(3).unwrap();
    assert_eq!(unsqueezed.dims(), &[2, 3, 4, 1]);
    assert_eq!(unsqueezed.squeeze_axis(3).unwrap(), l);
    assert!(l.unsqueeze(4).is_err());

    assert!(l.permute(&[0, 0, 1]).is_err());
    assert!(l.permute(&[0, 1]).is_err());
    assert!(l.expand(0, 5).is_err());
}

#[test]
fn reshape_adds_and_removes_unit_axes() {
    let l = StrideLayout::of_order([3, 4], 0, Order::C)
        .narrow(1, 0, 2)
        .unwrap();
    // rows are no longer contiguous with each other
    assert!(l.attempt_reshape(&Shape::from([6]), Order::C).is_none());
    let r = l
        .attempt_reshape(&Shape::from([3, 1, 2]), Order::C)
        .unwrap();
    assert_eq!(r.pointer(&[2, 0, 1]).unwrap(), l.pointer(&[2, 1]).unwrap());
}

#[test]
fn layout_rank_must_match_strides() {
    let err = StrideLayout::new([2, 3], 0, vec![1]).unwrap_err();
    assert!(matches!(
        err.inner(),
        stridegrad_core::Error::IllegalLayout { .. }
    ));
}
