//! Built-in graph partitioner: greedy graph growing plus boundary refinement.
//!
//! 1. Pick `k` well separated seeds: the first one at random (seeded), each
//!    further one the vertex farthest (in hops) from the seeds so far.
//! 2. Grow the parts breadth-first in round-robin order, one vertex per part
//!    per round, until each part reaches its target size. A part whose
//!    frontier dries up (disconnected graph) restarts from the lowest
//!    unassigned vertex.
//! 3. Run `refine_passes` sweeps moving boundary vertices to the neighbouring
//!    part holding most of their neighbours, as long as that lowers the cut,
//!    keeps the load within tolerance and never empties a part.
//!
//! The result is deterministic for a given graph, part count and seed.

use super::graph_traits::PartitionableGraph;
use super::{PartitionId, PartitionerConfig};
use hashbrown::HashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Allowed overload of a part relative to the ideal size during refinement.
const IMBALANCE_TOLERANCE: f64 = 0.05;

const UNASSIGNED: usize = usize::MAX;

/// Partition `graph` into `k` non-empty parts. Requires `1 <= k <= n`.
pub fn partition_graph<G: PartitionableGraph>(
    graph: &G,
    k: usize,
    cfg: &PartitionerConfig,
) -> Vec<PartitionId> {
    let n = graph.vertex_count();
    if n == 0 || k == 0 {
        return Vec::new();
    }
    let k = k.min(n);

    let seeds = pick_seeds(graph, k, cfg.rng_seed);
    let targets: Vec<usize> = (0..k).map(|p| n / k + usize::from(p < n % k)).collect();
    let mut parts = grow(graph, &seeds, &targets);

    let max_load = ((n as f64 / k as f64) * (1.0 + IMBALANCE_TOLERANCE)).ceil() as usize;
    for pass in 0..cfg.refine_passes {
        let moved = refine(graph, &mut parts, k, max_load);
        log::trace!("refinement pass {pass}: {moved} moves");
        if moved == 0 {
            break;
        }
    }
    parts
}

/// Farthest-point seed selection. Unreachable vertices count as infinitely far.
fn pick_seeds<G: PartitionableGraph>(graph: &G, k: usize, rng_seed: u64) -> Vec<usize> {
    let n = graph.vertex_count();
    let mut rng = SmallRng::seed_from_u64(rng_seed);
    let mut dist = vec![usize::MAX; n];
    let mut seeds = Vec::with_capacity(k);
    let mut next = rng.gen_range(0..n);

    let mut queue = VecDeque::new();
    while seeds.len() < k {
        seeds.push(next);
        dist[next] = 0;
        queue.push_back(next);
        while let Some(u) = queue.pop_front() {
            let du = dist[u] + 1;
            for &v in graph.neighbors(u) {
                if du < dist[v] {
                    dist[v] = du;
                    queue.push_back(v);
                }
            }
        }
        // ties resolved towards the lowest vertex id
        let mut best = None;
        for (v, &d) in dist.iter().enumerate() {
            if d > 0 && best.is_none_or(|(_, bd)| d > bd) {
                best = Some((v, d));
            }
        }
        match best {
            Some((v, _)) => next = v,
            None => break,
        }
    }
    seeds
}

fn grow<G: PartitionableGraph>(graph: &G, seeds: &[usize], targets: &[usize]) -> Vec<PartitionId> {
    let n = graph.vertex_count();
    let k = seeds.len();
    let mut parts = vec![UNASSIGNED; n];
    let mut sizes = vec![0usize; k];
    let mut frontiers: Vec<VecDeque<usize>> = seeds.iter().map(|&s| VecDeque::from([s])).collect();
    let mut assigned = 0;
    let mut cursor = 0;

    while assigned < n {
        for p in 0..k {
            if sizes[p] >= targets[p] {
                continue;
            }
            let mut picked = None;
            while let Some(v) = frontiers[p].pop_front() {
                if parts[v] == UNASSIGNED {
                    picked = Some(v);
                    break;
                }
            }
            let v = match picked {
                Some(v) => v,
                None => {
                    while cursor < n && parts[cursor] != UNASSIGNED {
                        cursor += 1;
                    }
                    if cursor == n {
                        break;
                    }
                    cursor
                }
            };
            parts[v] = p;
            sizes[p] += 1;
            assigned += 1;
            frontiers[p].extend(
                graph
                    .neighbors(v)
                    .iter()
                    .copied()
                    .filter(|&w| parts[w] == UNASSIGNED),
            );
        }
    }
    parts
}

/// One sweep of greedy boundary moves. Returns how many vertices moved.
fn refine<G: PartitionableGraph>(
    graph: &G,
    parts: &mut [PartitionId],
    k: usize,
    max_load: usize,
) -> usize {
    let mut sizes = vec![0usize; k];
    for &p in parts.iter() {
        sizes[p] += 1;
    }
    let mut links: HashMap<PartitionId, usize> = HashMap::new();
    let mut moved = 0;

    for v in 0..graph.vertex_count() {
        let home = parts[v];
        if sizes[home] <= 1 {
            continue;
        }
        links.clear();
        for &w in graph.neighbors(v) {
            *links.entry(parts[w]).or_insert(0) += 1;
        }
        let internal = links.get(&home).copied().unwrap_or(0);
        let best = links
            .iter()
            .filter(|&(&q, _)| q != home && sizes[q] < max_load)
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&q, &c)| (q, c));
        if let Some((q, external)) = best {
            if external > internal {
                parts[v] = q;
                sizes[home] -= 1;
                sizes[q] += 1;
                moved += 1;
            }
        }
    }
    moved
}
