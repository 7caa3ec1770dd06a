pub mod manager_cache;
