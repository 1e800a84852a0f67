/// Get-or-compute against a [`Cache`](crate::cache::Cache).
///
/// Expands to an expression of type `Result<T, E>`: a hit is deserialized and returned,
/// a miss awaits `$future`, queues the value with `$ttl` seconds to live and returns it.
/// Cache and computation errors both propagate with `?`, so the enclosing function's
/// error type must absorb [`CacheError`](crate::error::CacheError).
///
/// ```rust,ignore
/// let details = cached!(self.cache, CacheKey::MovieDetails(id), DETAILS_CACHE_TTL, async move {
///     self.get_json::<TmdbMovieDetails>(&format!("/movie/{}", id), &[]).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $future:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key, $ttl).await? {
            Some(hit) => Ok(hit),
            None => {
                let value = $future.await?;
                $cache.set_in_background(&key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
