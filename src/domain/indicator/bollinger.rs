//! Bollinger Bands.
//!
//! Middle = SMA(n); Upper/Lower = Middle ± mult × population StdDev(n).
//! Warmup: first (n-1) values are NaN.

use crate::domain::indicator::stddev::population_stddev;

#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn calculate_bollinger(values: &[f64], period: usize, mult: f64) -> BollingerBands {
    let n = values.len();
    let mut bands = BollingerBands {
        upper: vec![f64::NAN; n],
        middle: vec![f64::NAN; n],
        lower: vec![f64::NAN; n],
    };
    if period == 0 {
        return bands;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        let middle = window.iter().sum::<f64>() / period as f64;
        let sd = population_stddev(window);
        bands.middle[i] = middle;
        bands.upper[i] = middle + mult * sd;
        bands.lower[i] = middle - mult * sd;
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bollinger_known_values() {
        let b = calculate_bollinger(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8, 2.0);
        assert_relative_eq!(b.middle[7], 5.0);
        assert_relative_eq!(b.upper[7], 9.0, epsilon = 1e-10);
        assert_relative_eq!(b.lower[7], 1.0, epsilon = 1e-10);
        assert!(b.upper[6].is_nan());
    }
}
