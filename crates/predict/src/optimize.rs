/// Outcome of a [`nelder_mead`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct NelderMeadOptions {
    /// Offset of each initial simplex vertex from the start point.
    pub step: f64,
    pub max_iterations: usize,
    /// Stop once best and worst vertex values are this close.
    pub tolerance: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            step: 0.1,
            max_iterations: 500,
            tolerance: 1e-8,
        }
    }
}

/// Derivative-free minimisation of `f` starting from `start`.
///
/// Non-finite objective values are treated as +∞ so the simplex walks away
/// from them.
pub fn nelder_mead<F>(f: F, start: &[f64], options: NelderMeadOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let n = start.len();
    if n == 0 {
        return Minimum { x: Vec::new(), value: eval(&[]), iterations: 0 };
    }

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((start.to_vec(), eval(start)));
    for i in 0..n {
        let mut vertex = start.to_vec();
        vertex[i] += options.step;
        let value = eval(&vertex);
        simplex.push((vertex, value));
    }

    let mut iterations = 0;
    while iterations < options.max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = simplex[0].1;
        let worst = simplex[n].1;
        if (worst - best).abs() <= options.tolerance {
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|(v, _)| v[j]).sum::<f64>() / n as f64)
            .collect();
        let worst_vertex = simplex[n].0.clone();
        let toward = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst_vertex)
                .map(|(c, w)| c + coef * (w - c))
                .collect()
        };

        let reflected = toward(-1.0);
        let reflected_value = eval(&reflected);

        if reflected_value < best {
            let expanded = toward(-2.0);
            let expanded_value = eval(&expanded);
            simplex[n] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }
        if reflected_value < simplex[n - 1].1 {
            simplex[n] = (reflected, reflected_value);
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < worst {
            let c = toward(-0.5);
            let v = eval(&c);
            (c, v)
        } else {
            let c = toward(0.5);
            let v = eval(&c);
            (c, v)
        };
        if contracted_value < worst.min(reflected_value) {
            simplex[n] = (contracted, contracted_value);
            continue;
        }

        // Shrink everything toward the best vertex.
        let anchor = simplex[0].0.clone();
        for (vertex, value) in simplex.iter_mut().skip(1) {
            for (x, a) in vertex.iter_mut().zip(&anchor) {
                *x = a + 0.5 * (*x - a);
            }
            *value = eval(vertex);
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (x, value) = simplex.swap_remove(0);
    Minimum { x, value, iterations }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quadratic_minimum() {
        let f = |x: &[f64]| (x[0] - 0.3).powi(2) + (x[1] + 0.7).powi(2);
        let m = nelder_mead(
            f,
            &[0.1, 0.1],
            NelderMeadOptions { max_iterations: 2000, tolerance: 1e-14, ..Default::default() },
        );
        assert!((m.x[0] - 0.3).abs() < 1e-4, "{:?}", m.x);
        assert!((m.x[1] + 0.7).abs() < 1e-4, "{:?}", m.x);
        assert!(m.value < 1e-8);
    }

    #[test]
    fn one_dimensional() {
        let m = nelder_mead(|x: &[f64]| (x[0] - 2.0).abs(), &[0.0], NelderMeadOptions::default());
        assert!((m.x[0] - 2.0).abs() < 1e-3);
    }

    #[test]
    fn flat_objective_stops_immediately() {
        let m = nelder_mead(|_: &[f64]| 4.0, &[0.1, 0.1, 0.1], NelderMeadOptions::default());
        assert_eq!(m.iterations, 0);
        assert_eq!(m.value, 4.0);
    }

    #[test]
    fn nan_regions_are_avoided() {
        let f = |x: &[f64]| if x[0] > 0.5 { f64::NAN } else { (x[0] - 0.4).powi(2) };
        let m = nelder_mead(f, &[0.0], NelderMeadOptions::default());
        assert!(m.value.is_finite());
        assert!((m.x[0] - 0.4).abs() < 1e-3);
    }
}
