//! Clustering algorithms
//!
//! ### K-means
//!
//! Lloyd iterations from several starts: the first start is deterministic
//! (farthest-first traversal from the first point), the others use
//! k-means++ seeding. The run with the lowest within-cluster sum of squares
//! wins; ties keep the earlier run.
//!
//! ### DBSCAN
//!
//! Density-based: points with at least `min_samples` neighbours within `eps`
//! (itself included) are core points, clusters are grown from core points
//! and everything unreachable is noise.
//!
//! ### Agglomerative (complete and Ward linkage)
//!
//! Built with the nearest-neighbour chain algorithm over a full distance
//! matrix with Lance-Williams updates, then cut at `k` clusters by replaying
//! the `n - k` cheapest merges.

use crate::embedding::{squared_euclidean, DistanceMetric};
use anyhow::Result;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const KMEANS_MAX_ITERATIONS: usize = 300;

/// Linkage criterion of agglomerative clustering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Maximum distance between members, under the given metric
    Complete(DistanceMetric),
    /// Minimum increase of within-cluster variance (Euclidean)
    Ward,
}

fn check_input(data: ArrayView2<f32>, k: usize) -> Result<()> {
    let n = data.nrows();
    if n == 0 {
        anyhow::bail!("Cannot cluster an empty dataset");
    }
    if k == 0 {
        anyhow::bail!("Number of clusters must be positive");
    }
    if n < k {
        anyhow::bail!("n_samples={} should be >= n_clusters={}", n, k);
    }
    check_finite(data)
}

fn check_finite(data: ArrayView2<f32>) -> Result<()> {
    if data.iter().any(|v| !v.is_finite()) {
        anyhow::bail!("Input contains NaN or infinity");
    }
    Ok(())
}

fn to_points(data: ArrayView2<f32>) -> Vec<Vec<f64>> {
    data.rows()
        .into_iter()
        .map(|row| row.iter().map(|&v| v as f64).collect())
        .collect()
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// K-means with `n_init` starts; returns one label per row
pub fn kmeans(data: ArrayView2<f32>, k: usize, n_init: usize, seed: u64) -> Result<Vec<usize>> {
    check_input(data, k)?;

    let points = to_points(data);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut best: Option<(f64, Vec<usize>)> = None;

    for run in 0..n_init.max(1) {
        let centroids = if run == 0 {
            farthest_first(&points, k)
        } else {
            kmeans_plus_plus(&points, k, &mut rng)
        };

        let (labels, inertia) = lloyd(&points, centroids);
        tracing::trace!("k-means start {} inertia {:.6}", run, inertia);

        let improves = match &best {
            Some((best_inertia, _)) => inertia < *best_inertia,
            None => true,
        };
        if improves {
            best = Some((inertia, labels));
        }
    }

    match best {
        Some((_, labels)) => Ok(labels),
        None => anyhow::bail!("k-means produced no clustering"),
    }
}

fn farthest_first(points: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mut centroids = vec![points[0].clone()];
    let mut nearest: Vec<f64> = points.iter().map(|p| sq_dist(p, &points[0])).collect();

    while centroids.len() < k {
        let mut far = 0;
        for (i, d) in nearest.iter().enumerate() {
            if *d > nearest[far] {
                far = i;
            }
        }
        centroids.push(points[far].clone());
        for (i, p) in points.iter().enumerate() {
            nearest[i] = nearest[i].min(sq_dist(p, &points[far]));
        }
    }

    centroids
}

fn kmeans_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let first = rng.gen_range(0..points.len());
    let mut centroids = vec![points[first].clone()];
    let mut nearest: Vec<f64> = points.iter().map(|p| sq_dist(p, &points[first])).collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, d) in nearest.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            rng.gen_range(0..points.len())
        };

        centroids.push(points[chosen].clone());
        for (i, p) in points.iter().enumerate() {
            nearest[i] = nearest[i].min(sq_dist(p, &points[chosen]));
        }
    }

    centroids
}

/// Lloyd iterations until assignments stop changing; returns (labels, inertia)
fn lloyd(points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>) -> (Vec<usize>, f64) {
    let dim = points[0].len();
    let k = centroids.len();
    let mut labels = vec![usize::MAX; points.len()];

    for _iteration in 0..KMEANS_MAX_ITERATIONS {
        let mut changed = false;

        // Assign points to nearest centroid, ties to the lowest cluster id
        for (i, point) in points.iter().enumerate() {
            let mut best_cluster = 0;
            let mut min_distance = f64::INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let distance = sq_dist(point, centroid);
                if distance < min_distance {
                    min_distance = distance;
                    best_cluster = c;
                }
            }
            if labels[i] != best_cluster {
                labels[i] = best_cluster;
                changed = true;
            }
        }

        if !changed {
            break;
        }

        // Update centroids; an emptied cluster keeps its old centroid
        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in points.iter().zip(labels.iter()) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(point.iter()) {
                *s += v;
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            }
        }
    }

    let inertia = points
        .iter()
        .zip(labels.iter())
        .map(|(p, &label)| sq_dist(p, &centroids[label]))
        .sum();

    (labels, inertia)
}

/// DBSCAN; `None` marks noise
pub fn dbscan(
    data: ArrayView2<f32>,
    eps: f64,
    min_samples: usize,
    metric: DistanceMetric,
) -> Result<Vec<Option<usize>>> {
    if data.nrows() == 0 {
        anyhow::bail!("Cannot cluster an empty dataset");
    }
    if !(eps > 0.0) {
        anyhow::bail!("eps must be positive, got {}", eps);
    }
    if min_samples == 0 {
        anyhow::bail!("min_samples must be positive");
    }
    check_finite(data)?;

    let n = data.nrows();
    let neighbours: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| metric.distance(data.row(i), data.row(j)) <= eps)
                .collect()
        })
        .collect();
    let is_core: Vec<bool> = neighbours.iter().map(|nb| nb.len() >= min_samples).collect();

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut next_cluster = 0;

    for start in 0..n {
        if labels[start].is_some() || !is_core[start] {
            continue;
        }

        labels[start] = Some(next_cluster);
        let mut stack = vec![start];
        while let Some(point) = stack.pop() {
            if !is_core[point] {
                continue;
            }
            for &nb in &neighbours[point] {
                if labels[nb].is_none() {
                    labels[nb] = Some(next_cluster);
                    stack.push(nb);
                }
            }
        }
        next_cluster += 1;
    }

    Ok(labels)
}

/// Agglomerative clustering cut at `k` clusters
pub fn agglomerative(data: ArrayView2<f32>, k: usize, linkage: Linkage) -> Result<Vec<usize>> {
    check_input(data, k)?;

    let n = data.nrows();
    let mut dist = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = match linkage {
                Linkage::Complete(metric) => metric.distance(data.row(i), data.row(j)),
                Linkage::Ward => squared_euclidean(data.row(i), data.row(j)),
            };
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    let merges = nn_chain(&mut dist, n, linkage)?;
    Ok(cut_tree(n, merges, k))
}

/// Nearest-neighbour chain; returns (slot a, slot b, merge distance)
///
/// A merged cluster lives in the lower of its two slots, so every slot id is
/// also the id of one of the cluster's original points.
fn nn_chain(dist: &mut [f64], n: usize, linkage: Linkage) -> Result<Vec<(usize, usize, f64)>> {
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));
    let mut chain: Vec<usize> = Vec::new();
    let mut remaining = n;

    while remaining > 1 {
        if chain.is_empty() {
            match active.iter().position(|&a| a) {
                Some(first) => chain.push(first),
                None => anyhow::bail!("No active cluster left"),
            }
        }

        loop {
            let a = chain[chain.len() - 1];
            let prev = if chain.len() >= 2 {
                Some(chain[chain.len() - 2])
            } else {
                None
            };

            // the previous chain element wins ties so the chain cannot cycle
            let mut nearest = prev;
            let mut nearest_d = prev.map_or(f64::INFINITY, |p| dist[a * n + p]);
            for b in 0..n {
                if b != a && active[b] && dist[a * n + b] < nearest_d {
                    nearest_d = dist[a * n + b];
                    nearest = Some(b);
                }
            }

            let Some(b) = nearest else {
                anyhow::bail!("Non-finite distances between clusters");
            };

            if Some(b) == prev {
                chain.truncate(chain.len() - 2);
                merges.push((a.min(b), a.max(b), nearest_d));
                merge_slots(dist, n, &mut size, &mut active, a, b, linkage);
                remaining -= 1;
                break;
            }
            chain.push(b);
        }
    }

    Ok(merges)
}

/// Merge slot `b` into `a` (the lower id survives), Lance-Williams update
fn merge_slots(
    dist: &mut [f64],
    n: usize,
    size: &mut [usize],
    active: &mut [bool],
    a: usize,
    b: usize,
    linkage: Linkage,
) {
    let (keep, drop) = (a.min(b), a.max(b));
    let d_ab = dist[keep * n + drop];
    let (n_keep, n_drop) = (size[keep] as f64, size[drop] as f64);

    for k in 0..n {
        if !active[k] || k == keep || k == drop {
            continue;
        }
        let d_keep = dist[keep * n + k];
        let d_drop = dist[drop * n + k];
        let updated = match linkage {
            Linkage::Complete(_) => d_keep.max(d_drop),
            Linkage::Ward => {
                let n_k = size[k] as f64;
                ((n_keep + n_k) * d_keep + (n_drop + n_k) * d_drop - n_k * d_ab)
                    / (n_keep + n_drop + n_k)
            }
        };
        dist[keep * n + k] = updated;
        dist[k * n + keep] = updated;
    }

    size[keep] += size[drop];
    active[drop] = false;
}

/// Replay the `n - k` cheapest merges and label the resulting components
fn cut_tree(n: usize, mut merges: Vec<(usize, usize, f64)>, k: usize) -> Vec<usize> {
    // stable: equal distances keep chain order, which is a valid merge order
    merges.sort_by(|x, y| x.2.total_cmp(&y.2));

    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for &(a, b, _) in merges.iter().take(n - k) {
        let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut compact = std::collections::HashMap::new();
    (0..n)
        .map(|i| {
            let root = find(&mut parent, i);
            let next = compact.len();
            *compact.entry(root).or_insert(next)
        })
        .collect()
}
