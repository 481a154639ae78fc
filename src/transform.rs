//! Statistics behind each plot kind.
//!
//! Everything here is pure and deterministic: group orders follow first
//! appearance and no randomness is involved.

use std::collections::{HashMap, HashSet};

use crate::ir::{BoxStats, ViolinStats};

/// Resolution of violin density curves.
const VIOLIN_GRID_POINTS: usize = 128;
/// Resolution of histogram density curves.
const HISTOGRAM_KDE_POINTS: usize = 200;

/// Distinct values in order of first appearance.
pub fn unique_in_order<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in values {
        if seen.insert(v) {
            out.push(v.to_string());
        }
    }
    out
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Linear-interpolated percentile of sorted data.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_data[0];
    }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut ys = values.to_vec();
    ys.sort_by(|a, b| a.total_cmp(b));
    ys
}

/// Quartiles, 1.5 IQR whiskers and outliers.
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    let ys = sorted(values);

    let q1 = percentile(&ys, 0.25);
    let median = percentile(&ys, 0.50);
    let q3 = percentile(&ys, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    // Whiskers reach the most extreme values inside the fences.
    let lower_whisker = ys.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = ys.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);

    let outliers: Vec<f64> = ys
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

/// Silverman's rule of thumb for bandwidth selection
pub fn silverman_bandwidth(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if n < 2.0 {
        return 1.0;
    }

    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    // IQR-based estimate for robustness
    let ys = sorted(data);
    let iqr = percentile(&ys, 0.75) - percentile(&ys, 0.25);

    // h = 0.9 * min(std, IQR/1.34) * n^(-1/5)
    let scale = if iqr > 0.0 { std_dev.min(iqr / 1.34) } else { std_dev };
    if scale <= 0.0 {
        return 1.0;
    }
    0.9 * scale * n.powf(-0.2)
}

fn gaussian_kernel(u: f64) -> f64 {
    const SQRT_2PI: f64 = 2.5066282746310002;
    (-0.5 * u * u).exp() / SQRT_2PI
}

/// Gaussian KDE of `data` sampled at each point of `grid`.
pub fn kde_at(data: &[f64], bandwidth: f64, grid: &[f64]) -> Vec<f64> {
    let n = data.len() as f64;
    grid.iter()
        .map(|&y| {
            let d: f64 = data.iter().map(|&xi| gaussian_kernel((y - xi) / bandwidth)).sum();
            d / (n * bandwidth)
        })
        .collect()
}

fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    if points < 2 {
        return vec![start];
    }
    let step = (end - start) / (points - 1) as f64;
    (0..points).map(|i| start + i as f64 * step).collect()
}

/// Density curve and quartiles for one violin.
pub fn violin_stats(values: &[f64]) -> Option<ViolinStats> {
    if values.is_empty() {
        return None;
    }
    let ys = sorted(values);
    let bandwidth = silverman_bandwidth(&ys);

    // Extend range slightly for smooth edges
    let extend = 3.0 * bandwidth;
    let grid = linspace(ys[0] - extend, ys[ys.len() - 1] + extend, VIOLIN_GRID_POINTS);
    let mut density = kde_at(&ys, bandwidth, &grid);

    let peak = density.iter().fold(0.0f64, |a, &b| a.max(b));
    if peak > 0.0 {
        for d in &mut density {
            *d /= peak;
        }
    }

    Some(ViolinStats {
        grid,
        density,
        quartiles: [
            percentile(&ys, 0.25),
            percentile(&ys, 0.50),
            percentile(&ys, 0.75),
        ],
    })
}

/// Equal-width bin edges with one bin per distinct value.
///
/// The bin count is the number of distinct values, even for continuous data
/// where that yields very narrow bins. A zero-width range gets a single bin
/// of width 1 centred on the value.
pub fn histogram_edges(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let distinct: HashSet<u64> = values.iter().map(|v| v.to_bits()).collect();
    let bins = distinct.len();

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![min - 0.5, min + 0.5];
    }
    let width = (max - min) / bins as f64;
    let mut edges: Vec<f64> = (0..bins).map(|i| min + i as f64 * width).collect();
    edges.push(max);
    edges
}

/// Count values per bin. The last bin includes its right edge.
pub fn bin_counts(values: &[f64], edges: &[f64]) -> Vec<usize> {
    let bins = edges.len().saturating_sub(1);
    let mut counts = vec![0usize; bins];
    if bins == 0 {
        return counts;
    }
    let min = edges[0];
    let max = edges[bins];
    let width = (max - min) / bins as f64;
    for &v in values {
        if v < min || v > max {
            continue;
        }
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

/// Density curve over the data range, scaled so its area matches the counts.
pub fn histogram_kde(values: &[f64], bin_width: f64) -> Vec<(f64, f64)> {
    if values.len() < 2 {
        return Vec::new();
    }
    let ys = sorted(values);
    let (min, max) = (ys[0], ys[ys.len() - 1]);
    if min == max {
        return Vec::new();
    }
    let bandwidth = silverman_bandwidth(&ys);
    let grid = linspace(min, max, HISTOGRAM_KDE_POINTS);
    let scale = ys.len() as f64 * bin_width;
    kde_at(&ys, bandwidth, &grid)
        .into_iter()
        .zip(grid)
        .map(|(d, x)| (x, d * scale))
        .collect()
}

/// Average y over points sharing an x value, sorted by x.
pub fn mean_by_x(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut sums: HashMap<u64, (f64, f64, usize)> = HashMap::new();
    for &(x, y) in points {
        let entry = sums.entry(x.to_bits()).or_insert((x, 0.0, 0));
        entry.1 += y;
        entry.2 += 1;
    }
    let mut out: Vec<(f64, f64)> = sums
        .into_values()
        .map(|(x, sum, n)| (x, sum / n as f64))
        .collect();
    out.sort_by(|a, b| a.0.total_cmp(&b.0));
    out
}

/// Pearson correlation of paired values; `None` when undefined.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Pairwise-complete correlation matrix over equally long columns.
///
/// The diagonal is exactly 1 and the lower triangle mirrors the upper one.
pub fn correlation_matrix(columns: &[Vec<Option<f64>>]) -> Vec<Vec<Option<f64>>> {
    let k = columns.len();
    let mut matrix = vec![vec![None; k]; k];
    for i in 0..k {
        matrix[i][i] = Some(1.0);
        for j in (i + 1)..k {
            let pairs: Vec<(f64, f64)> = columns[i]
                .iter()
                .zip(&columns[j])
                .filter_map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
                    _ => None,
                })
                .collect();
            let r = pearson(&pairs);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unique_in_order() {
        assert_eq!(unique_in_order(["b", "a", "b", "c"]), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile(&data, 0.5), 2.5);
        assert_relative_eq!(percentile(&data, 0.25), 1.75);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_box_stats_outlier() {
        let stats = box_stats(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_relative_eq!(stats.median, 3.0);
        assert_relative_eq!(stats.q1, 2.0);
        assert_relative_eq!(stats.q3, 4.0);
        assert_eq!(stats.outliers, vec![100.0]);
        assert_relative_eq!(stats.upper_whisker, 4.0);
        assert_relative_eq!(stats.lower_whisker, 1.0);
    }

    #[test]
    fn test_box_stats_empty() {
        assert!(box_stats(&[]).is_none());
    }

    #[test]
    fn test_violin_stats_normalised() {
        let stats = violin_stats(&[1.0, 2.0, 2.5, 3.0, 7.0]).unwrap();
        assert_eq!(stats.grid.len(), VIOLIN_GRID_POINTS);
        let peak = stats.density.iter().cloned().fold(0.0, f64::max);
        assert_relative_eq!(peak, 1.0);
        assert_relative_eq!(stats.quartiles[1], 2.5);
    }

    #[test]
    fn test_histogram_edges_one_bin_per_distinct_value() {
        let edges = histogram_edges(&[1.0, 2.0, 2.0, 3.0, 5.0]);
        assert_eq!(edges.len(), 5);
        assert_relative_eq!(edges[0], 1.0);
        assert_relative_eq!(edges[4], 5.0);
    }

    #[test]
    fn test_histogram_edges_single_value() {
        assert_eq!(histogram_edges(&[4.0, 4.0]), vec![3.5, 4.5]);
        assert!(histogram_edges(&[]).is_empty());
    }

    #[test]
    fn test_histogram_edges_continuous_boundary() {
        // Every value is distinct, so there are as many bins as rows.
        let values: Vec<f64> = (0..50).map(|i| (i as f64).sqrt()).collect();
        assert_eq!(histogram_edges(&values).len() - 1, 50);
    }

    #[test]
    fn test_bin_counts_includes_right_edge() {
        let values = [1.0, 2.0, 2.0, 3.0];
        let edges = histogram_edges(&values);
        let counts = bin_counts(&values, &edges);
        assert_eq!(counts.iter().sum::<usize>(), 4);
        assert_eq!(counts[counts.len() - 1], 1);
    }

    #[test]
    fn test_histogram_kde_needs_two_values() {
        assert!(histogram_kde(&[1.0], 1.0).is_empty());
        let curve = histogram_kde(&[1.0, 2.0, 3.0], 1.0);
        assert_eq!(curve.len(), HISTOGRAM_KDE_POINTS);
        assert!(curve.iter().all(|&(_, y)| y >= 0.0));
    }

    #[test]
    fn test_mean_by_x_sorts_and_averages() {
        let points = [(2.0, 10.0), (1.0, 4.0), (2.0, 20.0)];
        assert_eq!(mean_by_x(&points), vec![(1.0, 4.0), (2.0, 15.0)]);
    }

    #[test]
    fn test_pearson() {
        let r = pearson(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]).unwrap();
        assert_relative_eq!(r, 1.0);
        let r = pearson(&[(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)]).unwrap();
        assert_relative_eq!(r, -1.0);
        assert!(pearson(&[(1.0, 1.0), (2.0, 1.0)]).is_none());
        assert!(pearson(&[(1.0, 1.0)]).is_none());
    }

    #[test]
    fn test_correlation_matrix_symmetric_with_unit_diagonal() {
        let columns = vec![
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            vec![Some(2.0), Some(1.0), Some(4.0), None],
            vec![Some(5.0), Some(5.0), Some(5.0), Some(5.0)],
        ];
        let m = correlation_matrix(&columns);
        for i in 0..3 {
            assert_eq!(m[i][i], Some(1.0));
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
        assert!(m[0][2].is_none());
        assert!(m[0][1].is_some());
    }
}
