/// The Lagrange polynomial basis on a set of distinct points in one dimension.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lagrange {
    points: Vec<f64>,
    // 1 / prod_{j != i} (x_i - x_j)
    constants: Vec<f64>,
}

impl Lagrange {
    pub fn new(points: Vec<f64>) -> Self {
        let constants = (0..points.len())
            .map(|i| {
                let product: f64 = (0..points.len())
                    .filter(|&j| j != i)
                    .map(|j| points[i] - points[j])
                    .product();
                1.0 / product
            })
            .collect();
        Self { points, constants }
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, i: usize) -> f64 {
        self.points[i]
    }

    /// Value of the `i`-th basis function at `x`.
    pub fn eval(&self, i: usize, x: f64) -> f64 {
        let product: f64 = (0..self.size())
            .filter(|&j| j != i)
            .map(|j| x - self.points[j])
            .product();
        self.constants[i] * product
    }

    /// Derivative of the `i`-th basis function at `x`.
    pub fn ddx(&self, i: usize, x: f64) -> f64 {
        let n = self.size();
        let mut sum = 0.0;
        for k in (0..n).filter(|&k| k != i) {
            let product: f64 = (0..n)
                .filter(|&j| j != i && j != k)
                .map(|j| x - self.points[j])
                .product();
            sum += product;
        }
        self.constants[i] * sum
    }
}
