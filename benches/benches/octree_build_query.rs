// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cmp::Ordering;
use std::thread;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_octree::{
    Aabb, Blocking, Octree, OctreeConfig, OctreeObject, Sphere, Spinning, SyncStrategy,
    Unsynchronized,
};

#[derive(Clone, Debug)]
struct Particle {
    id: u32,
    at: [f64; 3],
}

impl PartialEq for Particle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Particle {}

impl PartialOrd for Particle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Particle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl OctreeObject<f64, 3> for Particle {
    fn overlaps(&self, region: &Aabb<f64, 3>) -> bool {
        region.contains_point(&self.at)
    }
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
    fn next_point(&mut self) -> [f64; 3] {
        [(); 3].map(|()| self.next_f64() * 2.0 - 1.0)
    }
}

fn gen_uniform(count: usize, seed: u64) -> Vec<Particle> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|i| Particle {
            id: i as u32,
            at: rng.next_point(),
        })
        .collect()
}

fn gen_clustered(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<Particle> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let centers: Vec<[f64; 3]> = (0..n_clusters)
        .map(|_| rng.next_point().map(|c| c * 0.8))
        .collect();
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    for center in centers {
        for _ in 0..per_cluster {
            let at = center.map(|c| c + (rng.next_f64() - 0.5) * spread);
            out.push(Particle {
                id: out.len() as u32,
                at,
            });
        }
    }
    out
}

fn empty_tree<S: SyncStrategy>(height: usize) -> Octree<Particle, f64, 3, S> {
    let config = OctreeConfig::default().with_initial_height(height);
    Octree::with_config(Aabb::new([-1.0; 3], [1.0; 3]), config).unwrap()
}

fn built_tree(particles: &[Particle]) -> Octree<Particle, f64, 3> {
    let tree = empty_tree(2);
    tree.insert_many(particles.iter().cloned());
    tree.optimize();
    tree
}

fn bench_insert_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_optimize");
    for &n in &[1_000usize, 10_000, 100_000] {
        let particles = gen_uniform(n, 0xCAFE_F00D_DEAD_BEEF);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("uniform_n{}", n), |b| {
            b.iter_batched(
                || empty_tree::<Blocking>(0),
                |tree| {
                    tree.insert_many(particles.iter().cloned());
                    tree.optimize();
                    black_box(tree.node_count());
                },
                BatchSize::LargeInput,
            )
        });
    }
    let clustered = gen_clustered(16, 2_000, 0.05);
    group.bench_function("clustered", |b| {
        b.iter_batched(
            || empty_tree::<Blocking>(0),
            |tree| {
                tree.insert_many(clustered.iter().cloned());
                tree.optimize();
                black_box(tree.node_count());
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    fn run<S: SyncStrategy>(particles: &[Particle]) -> usize {
        let tree = empty_tree::<S>(2);
        tree.insert_many(particles.iter().cloned());
        tree.optimize();
        tree.node_count()
    }

    let mut group = c.benchmark_group("sync_strategy");
    let particles = gen_uniform(20_000, 0xFACE_FEED_CAFE_BABE);
    group.throughput(Throughput::Elements(particles.len() as u64));
    group.bench_function("blocking", |b| b.iter(|| black_box(run::<Blocking>(&particles))));
    group.bench_function("spinning", |b| b.iter(|| black_box(run::<Spinning>(&particles))));
    group.bench_function("unsynchronized", |b| {
        b.iter(|| black_box(run::<Unsynchronized>(&particles)))
    });
    group.finish();
}

fn bench_threaded_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("threaded_insert");
    let particles = gen_uniform(80_000, 0xBADC_F00D_1234_5678);
    group.throughput(Throughput::Elements(particles.len() as u64));
    for &threads in &[1usize, 2, 4, 8] {
        group.bench_function(format!("threads{}", threads), |b| {
            b.iter_batched(
                || empty_tree::<Blocking>(3),
                |tree| {
                    let chunk = particles.len().div_ceil(threads);
                    thread::scope(|s| {
                        for part in particles.chunks(chunk) {
                            let tree = &tree;
                            s.spawn(move || {
                                tree.insert_many(part.iter().cloned());
                                tree.optimize();
                            });
                        }
                    });
                    black_box(tree.object_count());
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let particles = gen_uniform(50_000, 0x0123_4567_89AB_CDEF);
    let tree = built_tree(&particles);
    let mut rng = Rng::new(0x5EED_5EED_5EED_5EED);
    let probes: Vec<[f64; 3]> = (0..256).map(|_| rng.next_point()).collect();
    group.throughput(Throughput::Elements(probes.len() as u64));

    group.bench_function("find_exact", |b| {
        b.iter(|| {
            let hits: usize = probes.iter().map(|p| tree.find_exact(p).len()).sum();
            black_box(hits);
        })
    });
    group.bench_function("find_nearest", |b| {
        b.iter(|| {
            let hits: usize = probes.iter().map(|p| tree.find_nearest(p).len()).sum();
            black_box(hits);
        })
    });
    group.bench_function("find_nearest_leaves", |b| {
        b.iter(|| {
            let hits: usize = probes
                .iter()
                .map(|p| tree.find_nearest_leaves(p).len())
                .sum();
            black_box(hits);
        })
    });
    group.bench_function("find_in_sphere", |b| {
        b.iter(|| {
            let hits: usize = probes
                .iter()
                .map(|p| tree.find_in_sphere(&Sphere::new(*p, 0.01)).len())
                .sum();
            black_box(hits);
        })
    });
    group.bench_function("find_intersecting", |b| {
        b.iter(|| {
            let hits: usize = probes
                .iter()
                .map(|p| {
                    let region = Aabb::new(p.map(|c| c - 0.05), p.map(|c| c + 0.05));
                    tree.find_intersecting(&region).len()
                })
                .sum();
            black_box(hits);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_optimize,
    bench_strategies,
    bench_threaded_insert,
    bench_queries
);
criterion_main!(benches);
