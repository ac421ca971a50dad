pub mod api_cache;
