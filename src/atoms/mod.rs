// ── Velopool Atoms Layer ───────────────────────────────────────────────────
// Pure constants and error types with no side effects and no I/O.
// Dependency rule: atoms may only depend on std and external pure crates.
// Nothing here may import from engine/ or lib.rs.

pub mod constants;
pub mod error;
