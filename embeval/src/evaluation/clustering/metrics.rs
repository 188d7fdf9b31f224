//! External clustering metrics
//!
//! All metrics compare a predicted labelling against the true one through
//! their contingency table. Information-theoretic quantities use the
//! natural logarithm; NMI and AMI normalize by the arithmetic mean of the
//! two entropies.

use anyhow::Result;
use std::collections::HashMap;

/// The seven scores reported for every clustering run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringScores {
    pub adjusted_rand_index: f64,
    pub adjusted_mutual_info_score: f64,
    pub homogeneity_score: f64,
    pub completeness_score: f64,
    pub v_measure_score: f64,
    pub normalized_mutual_info_score: f64,
    pub clustering_accuracy: f64,
}

impl ClusteringScores {
    /// Metric names, in reporting order
    pub const NAMES: [&'static str; 7] = [
        "adjusted_rand_index",
        "adjusted_mutual_info_score",
        "homogeneity_score",
        "completeness_score",
        "v_measure_score",
        "normalized_mutual_info_score",
        "clustering_accuracy",
    ];

    /// Score `labels_pred` against `labels_true`
    pub fn compute(labels_true: &[usize], labels_pred: &[usize]) -> Result<Self> {
        if labels_true.len() != labels_pred.len() {
            anyhow::bail!(
                "Label count mismatch: {} true vs {} predicted",
                labels_true.len(),
                labels_pred.len()
            );
        }
        if labels_true.is_empty() {
            anyhow::bail!("Cannot score an empty labelling");
        }

        let table = Contingency::new(labels_true, labels_pred);
        let (homogeneity, completeness, v_measure) = table.homogeneity_completeness_v_measure();

        Ok(Self {
            adjusted_rand_index: table.adjusted_rand_index(),
            adjusted_mutual_info_score: table.adjusted_mutual_info(),
            homogeneity_score: homogeneity,
            completeness_score: completeness,
            v_measure_score: v_measure,
            normalized_mutual_info_score: table.normalized_mutual_info(),
            clustering_accuracy: table.accuracy(),
        })
    }

    /// (name, value) pairs in [`ClusteringScores::NAMES`] order
    pub fn named(&self) -> Vec<(&'static str, Option<f64>)> {
        let values = [
            self.adjusted_rand_index,
            self.adjusted_mutual_info_score,
            self.homogeneity_score,
            self.completeness_score,
            self.v_measure_score,
            self.normalized_mutual_info_score,
            self.clustering_accuracy,
        ];
        Self::NAMES
            .iter()
            .zip(values)
            .map(|(name, value)| (*name, Some(value)))
            .collect()
    }
}

impl std::fmt::Display for ClusteringScores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Clustering Scores:")?;
        writeln!(f, "  ARI:          {:.4}", self.adjusted_rand_index)?;
        writeln!(f, "  AMI:          {:.4}", self.adjusted_mutual_info_score)?;
        writeln!(f, "  Homogeneity:  {:.4}", self.homogeneity_score)?;
        writeln!(f, "  Completeness: {:.4}", self.completeness_score)?;
        writeln!(f, "  V-measure:    {:.4}", self.v_measure_score)?;
        writeln!(f, "  NMI:          {:.4}", self.normalized_mutual_info_score)?;
        write!(f, "  Accuracy:     {:.4}", self.clustering_accuracy)
    }
}

/// Map arbitrary labels to 0..k in order of first appearance
pub fn compact_labels<T: std::hash::Hash + Eq + Clone>(labels: &[T]) -> Vec<usize> {
    let mut ids: HashMap<T, usize> = HashMap::new();
    labels
        .iter()
        .map(|label| {
            let next = ids.len();
            *ids.entry(label.clone()).or_insert(next)
        })
        .collect()
}

/// Counts of (true class, predicted cluster) pairs
struct Contingency {
    counts: Vec<Vec<usize>>,
    class_sizes: Vec<usize>,
    cluster_sizes: Vec<usize>,
    n: usize,
}

fn comb2(x: usize) -> f64 {
    let x = x as f64;
    x * (x - 1.0) / 2.0
}

fn entropy(sizes: &[usize], n: usize) -> f64 {
    let n = n as f64;
    -sizes
        .iter()
        .filter(|&&s| s > 0)
        .map(|&s| {
            let p = s as f64 / n;
            p * p.ln()
        })
        .sum::<f64>()
}

impl Contingency {
    fn new(labels_true: &[usize], labels_pred: &[usize]) -> Self {
        let classes = compact_labels(labels_true);
        let clusters = compact_labels(labels_pred);
        let n_classes = classes.iter().max().map_or(0, |m| m + 1);
        let n_clusters = clusters.iter().max().map_or(0, |m| m + 1);

        let mut counts = vec![vec![0usize; n_clusters]; n_classes];
        for (&c, &k) in classes.iter().zip(clusters.iter()) {
            counts[c][k] += 1;
        }

        let class_sizes = counts.iter().map(|row| row.iter().sum()).collect();
        let cluster_sizes = (0..n_clusters)
            .map(|k| counts.iter().map(|row| row[k]).sum())
            .collect();

        Self {
            counts,
            class_sizes,
            cluster_sizes,
            n: labels_true.len(),
        }
    }

    /// Both labellings put everything in one group (or nothing anywhere)
    fn trivially_identical(&self) -> bool {
        let (classes, clusters) = (self.class_sizes.len(), self.cluster_sizes.len());
        (classes == 1 && clusters == 1) || (classes == 0 && clusters == 0)
    }

    fn adjusted_rand_index(&self) -> f64 {
        let sum_comb: f64 = self.counts.iter().flatten().map(|&c| comb2(c)).sum();
        let sum_a: f64 = self.class_sizes.iter().map(|&a| comb2(a)).sum();
        let sum_b: f64 = self.cluster_sizes.iter().map(|&b| comb2(b)).sum();
        let total = comb2(self.n);
        if total == 0.0 {
            return 1.0;
        }

        let expected = sum_a * sum_b / total;
        let max_index = (sum_a + sum_b) / 2.0;
        if max_index == expected {
            return 1.0;
        }
        (sum_comb - expected) / (max_index - expected)
    }

    fn mutual_info(&self) -> f64 {
        let n = self.n as f64;
        let mut mi = 0.0;
        for (i, row) in self.counts.iter().enumerate() {
            for (j, &nij) in row.iter().enumerate() {
                if nij == 0 {
                    continue;
                }
                let nij = nij as f64;
                let outer = self.class_sizes[i] as f64 * self.cluster_sizes[j] as f64;
                mi += nij / n * ((n * nij).ln() - outer.ln());
            }
        }
        mi.max(0.0)
    }

    /// Expected mutual information under the hypergeometric model
    fn expected_mutual_info(&self) -> f64 {
        let n = self.n;
        // ln(x!) for x in 0..=n
        let mut ln_fact = vec![0.0f64; n + 1];
        for x in 1..=n {
            ln_fact[x] = ln_fact[x - 1] + (x as f64).ln();
        }

        let nf = n as f64;
        let mut emi = 0.0;
        for &a in &self.class_sizes {
            for &b in &self.cluster_sizes {
                let start = (a + b).saturating_sub(n).max(1);
                let end = a.min(b);
                for nij in start..=end {
                    let term1 = nij as f64 / nf;
                    let term2 = (nf * nij as f64).ln() - (a as f64 * b as f64).ln();
                    let gln = ln_fact[a] + ln_fact[b] + ln_fact[n - a] + ln_fact[n - b]
                        - ln_fact[n]
                        - ln_fact[nij]
                        - ln_fact[a - nij]
                        - ln_fact[b - nij]
                        - ln_fact[n + nij - a - b];
                    emi += term1 * term2 * gln.exp();
                }
            }
        }
        emi
    }

    fn normalized_mutual_info(&self) -> f64 {
        if self.trivially_identical() {
            return 1.0;
        }
        let mi = self.mutual_info();
        if mi == 0.0 {
            return 0.0;
        }
        let h_true = entropy(&self.class_sizes, self.n);
        let h_pred = entropy(&self.cluster_sizes, self.n);
        (mi / ((h_true + h_pred) / 2.0)).clamp(0.0, 1.0)
    }

    fn adjusted_mutual_info(&self) -> f64 {
        if self.trivially_identical() {
            return 1.0;
        }
        let mi = self.mutual_info();
        let emi = self.expected_mutual_info();
        let h_true = entropy(&self.class_sizes, self.n);
        let h_pred = entropy(&self.cluster_sizes, self.n);

        let mut denominator = (h_true + h_pred) / 2.0 - emi;
        // keep the sign, avoid dividing by ~0
        if denominator < 0.0 {
            denominator = denominator.min(-f64::EPSILON);
        } else {
            denominator = denominator.max(f64::EPSILON);
        }
        (mi - emi) / denominator
    }

    fn homogeneity_completeness_v_measure(&self) -> (f64, f64, f64) {
        let h_true = entropy(&self.class_sizes, self.n);
        let h_pred = entropy(&self.cluster_sizes, self.n);
        let mi = self.mutual_info();

        let homogeneity = if h_true > 0.0 { (mi / h_true).min(1.0) } else { 1.0 };
        let completeness = if h_pred > 0.0 { (mi / h_pred).min(1.0) } else { 1.0 };
        let v_measure = if homogeneity + completeness == 0.0 {
            0.0
        } else {
            2.0 * homogeneity * completeness / (homogeneity + completeness)
        };

        (homogeneity, completeness, v_measure)
    }

    /// Fraction of points on the optimal one-to-one class/cluster matching
    fn accuracy(&self) -> f64 {
        let rows = self.class_sizes.len();
        let cols = self.cluster_sizes.len();

        // the assignment below needs rows <= cols
        let weights: Vec<Vec<i64>> = if rows <= cols {
            self.counts
                .iter()
                .map(|row| row.iter().map(|&c| c as i64).collect())
                .collect()
        } else {
            (0..cols)
                .map(|j| self.counts.iter().map(|row| row[j] as i64).collect())
                .collect()
        };

        max_weight_matching(&weights) as f64 / self.n as f64
    }
}

/// Hungarian algorithm with potentials; `weights` must have rows <= cols
fn max_weight_matching(weights: &[Vec<i64>]) -> i64 {
    let n = weights.len();
    if n == 0 {
        return 0;
    }
    let m = weights[0].len();
    const INF: i64 = i64::MAX / 4;

    // 1-based: p[j] is the row matched to column j, 0 for none
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; m + 1];
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0;
        let mut minv = vec![INF; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = INF;
            let mut j1 = 0;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = -weights[i0 - 1][j - 1] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m)
        .filter(|&j| p[j] != 0)
        .map(|j| weights[p[j] - 1][j - 1])
        .sum()
}
