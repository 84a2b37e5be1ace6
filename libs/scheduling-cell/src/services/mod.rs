pub mod reasons;
pub mod scheduler;
pub mod slots;
pub mod source;
pub mod supabase_source;

pub use reasons::{BlockReasonProvider, RuleSummaryReasons};
pub use scheduler::SlotSchedulerService;
pub use source::{InMemorySchedulingSource, SchedulingDataSource};
pub use supabase_source::SupabaseSchedulingSource;
