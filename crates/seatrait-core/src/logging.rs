//! Structured logging schema for seatrait.
//!
//! `tracing` field names must be literals at the call site, so this module
//! carries the schema as documentation only. Every crate logs with these
//! names so output can be filtered by the same keys across subsystems.
//!
//! ## Identity fields
//!
//! | Field | Meaning | Values |
//! |-------|---------|--------|
//! | `subsystem` | Subsystem originating the event | `db`, `lookup`, `enrich`, `cache`, `config` |
//! | `component` | Component within the subsystem | `pool`, `schema`, `species`, `catalog`, `size_classes`, `taxonomy`, `trait_values`, `queries`, `sheet`, `phytoplankton`, `overlay`, `occurrences`, `summary` |
//! | `op` | Logical operation | `add`, `seed`, `batch`, `load`, `enrich` |
//!
//! ## Entity fields
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `aphia_id` | External taxonomic key |
//! | `species_id` | Internal species id |
//! | `size_class_id` | Internal size-class id |
//! | `trait_name` | Trait definition name |
//! | `cache` | Cache name (workload class) |
//! | `cache_key` | Rendered cache key |
//! | `source` | Overlay source label |
//!
//! ## Measurement fields
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `duration_ms` | Wall-clock duration in milliseconds |
//! | `result_count` | Rows returned or loaded |
//! | `key_count` | Keys in a batch request |
//! | `path` | File path of a tabular source or database |
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Storage unusable, operation aborted |
//! | WARN  | Recoverable issue, record skipped or source treated as empty |
//! | INFO  | Lifecycle events (schema ready, catalog seeded, source loaded) |
//! | DEBUG | Decision points (cache hit/miss, unmapped column, null value) |
//! | TRACE | Per-row iteration |
