/// Numerical differentiation
pub mod calculus;
/// Plain fixed-point iteration
pub mod fixed_point;
/// Newton's method with an explicit Jacobian freshness policy
pub mod newton;
