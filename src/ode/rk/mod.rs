//! The explicit embedded Runge-Kutta family (C5-C6): a generic engine
//! (`engine`) driven by a plain-data tableau (`tableau`) and whichever
//! concrete method (`methods`) is selected.

pub mod engine;
pub mod methods;
pub mod tableau;

pub use engine::{EmbeddedRungeKutta, ErkMethod, RkStatistics};
pub use methods::dp853::Dp853;
pub use methods::higham_hall54::HighamHall54;
pub use methods::midpoint::Midpoint;
pub use methods::rk4::Rk4;
pub use tableau::ButcherTableau;
