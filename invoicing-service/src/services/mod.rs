//! Services module for invoicing-service.

pub mod aggregator;
pub mod clock;
pub mod extraction;
pub mod metrics;
pub mod providers;
pub mod repository;

pub use aggregator::{progressive_tax, quarter_bounds, split_between_owners, PeriodAggregator};
pub use clock::{Clock, FixedClock, SystemClock};
pub use extraction::ExtractionPipeline;
pub use metrics::{get_metrics, init_metrics};
pub use repository::{InMemoryRepository, InvoicingRepository};
