pub mod one_euro;
pub mod ray;

pub use one_euro::{OneEuroFilter, Point3Filter};
pub use ray::RayFilter;
