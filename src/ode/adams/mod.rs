//! Nordsieck-vector-based linear multistep methods (C7-C9): the exact
//! transform (`nordsieck`), the shared dense-output/prologue plumbing
//! (`state`), and the explicit/PECE drivers (`bashforth`, `moulton`).

pub mod bashforth;
pub mod moulton;
pub mod nordsieck;
pub mod snapshot;
pub mod state;

pub use bashforth::AdamsBashforth;
pub use moulton::AdamsMoulton;
pub use nordsieck::{transformer, NordsieckTransformer};
pub use snapshot::NordsieckSnapshot;
pub use state::{AdamsStatistics, NordsieckState};
