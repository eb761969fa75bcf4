pub mod postgrest;

pub use postgrest::{PostgrestRemote, PostgrestTable};
