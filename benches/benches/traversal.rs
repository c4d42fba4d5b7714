// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use canopy_path::{Path, PathList};
use canopy_scene::{Node, NodeClass, NodeClassFlags, NodeRef};
use canopy_traverse::{group_method, Action, Runtime, SharedRuntime};
use canopy_types::TypeKey;

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u32() as usize) % upper_exclusive
    }
}

struct World {
    runtime: SharedRuntime,
    group: NodeClass,
    shape: NodeClass,
    count: TypeKey,
}

fn count_group(action: &mut Action, node: &NodeRef) {
    *action.payload_mut::<u64>().unwrap() += 1;
    group_method(action, node);
}

fn count_shape(action: &mut Action, _node: &NodeRef) {
    *action.payload_mut::<u64>().unwrap() += 1;
}

fn world() -> World {
    let mut runtime = Runtime::new();
    let node = runtime.node_base();
    let group = runtime.register_node_class(
        "group",
        node.type_key(),
        NodeClassFlags::GROUP | NodeClassFlags::AFFECTS_STATE,
    );
    let shape = runtime.register_node_class("shape", node.type_key(), NodeClassFlags::empty());
    let count = runtime.register_action_class("count", runtime.action_base());
    runtime.add_method(count, group.type_key(), count_group);
    runtime.add_method(count, shape.type_key(), count_shape);
    World {
        runtime: runtime.into_shared(),
        group,
        shape,
        count,
    }
}

/// Builds a tree of `depth` levels with `fanout` children per group; leaves
/// are shapes.
fn build_tree(world: &World, depth: usize, fanout: usize) -> NodeRef {
    let root = Node::new(world.group);
    if depth == 0 {
        return root;
    }
    for _ in 0..fanout {
        let child = if depth == 1 {
            Node::new(world.shape)
        } else {
            build_tree(world, depth - 1, fanout)
        };
        root.add_child(&child);
    }
    root
}

/// Collects a random root-to-leaf path.
fn random_leaf_path(root: &NodeRef, rng: &mut Lcg) -> Path {
    let mut path = Path::from_head(root);
    let mut cur = root.clone();
    while cur.child_count() > 0 {
        let index = rng.gen_range_usize(cur.child_count());
        path.append_index(index);
        cur = path.tail().expect("path is non-empty").clone();
    }
    path
}

fn bench_node_apply(c: &mut Criterion) {
    let world = world();
    // 4^5 leaves plus interior groups: ~1.4k nodes.
    let root = build_tree(&world, 5, 4);
    let mut action = Action::with_payload(&world.runtime, world.count, Box::new(0_u64));

    c.bench_function("apply/node/depth5_fanout4", |b| {
        b.iter(|| {
            *action.payload_mut::<u64>().unwrap() = 0;
            action.apply(black_box(&root));
            black_box(action.payload::<u64>().copied())
        });
    });
}

fn bench_path_apply(c: &mut Criterion) {
    let world = world();
    let root = build_tree(&world, 6, 4);
    let mut rng = Lcg::new(7);
    let path = random_leaf_path(&root, &mut rng);
    let mut action = Action::with_payload(&world.runtime, world.count, Box::new(0_u64));

    c.bench_function("apply/path/depth6_fanout4", |b| {
        b.iter(|| {
            *action.payload_mut::<u64>().unwrap() = 0;
            action.apply_path(black_box(&path));
            black_box(action.payload::<u64>().copied())
        });
    });
}

fn bench_path_list_apply(c: &mut Criterion) {
    let world = world();
    let root = build_tree(&world, 6, 4);
    let mut rng = Lcg::new(11);
    let mut list = PathList::new();
    for _ in 0..32 {
        list.append(random_leaf_path(&root, &mut rng));
    }
    let mut action = Action::with_payload(&world.runtime, world.count, Box::new(0_u64));

    c.bench_function("apply/path_list/32_random_leaves", |b| {
        b.iter(|| {
            *action.payload_mut::<u64>().unwrap() = 0;
            action.apply_path_list(black_box(&list), false);
            black_box(action.payload::<u64>().copied())
        });
    });
}

fn bench_path_list_normalise(c: &mut Criterion) {
    let world = world();
    let root = build_tree(&world, 6, 4);
    let mut rng = Lcg::new(13);
    let mut list = PathList::new();
    for _ in 0..256 {
        let path = random_leaf_path(&root, &mut rng);
        // Mix in prefixes so uniquify has real work to do.
        if rng.gen_range_usize(4) == 0 {
            let mut prefix = path.clone();
            prefix.truncate(1 + rng.gen_range_usize(5));
            list.append(prefix);
        }
        list.append(path);
    }

    c.bench_function("path_list/sort_uniquify/256", |b| {
        b.iter_batched(
            || list.clone(),
            |mut list| {
                list.sort();
                list.uniquify();
                black_box(list.len())
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_node_apply,
    bench_path_apply,
    bench_path_list_apply,
    bench_path_list_normalise
);
criterion_main!(benches);
