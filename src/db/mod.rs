//! Database layer (hosted PostgREST store or in-memory tables).

pub mod memory;
pub mod store;
pub mod supabase;
pub mod supabase_realtime;

pub use memory::MemoryTables;
pub use store::PollStore;
pub use supabase::SupabaseClient;
pub use supabase_realtime::RealtimeClient;

/// Table names as constants.
pub mod tables {
    pub const POLLS: &str = "polls";
    pub const VOTES: &str = "votes";
}
