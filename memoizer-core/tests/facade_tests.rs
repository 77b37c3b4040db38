/// Integration tests for get / set / clear / clear_all and statistics

#[cfg(test)]
mod tests {
    use memoizer_core::{CacheKey, Cached, Ids, MemoizeError, Memoizer, Scope, SetOptions, StatsSnapshot};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Flag {
        d: bool,
    }

    type Params = (u32, &'static str, Flag);
    type Returned = (u32, String, bool);

    fn params1() -> Params {
        (1, "two", Flag { d: true })
    }

    fn params2() -> Params {
        (2, "four", Flag { d: false })
    }

    fn params3() -> Params {
        (3, "eight", Flag { d: true })
    }

    fn returned(n: u32, s: &str, d: bool) -> Option<Returned> {
        Some((n, s.to_string(), d))
    }

    fn lookup(cache: &Memoizer, scope: &Scope, params: &Params) -> Option<Returned> {
        cache
            .get::<Returned, _>(scope, params)
            .unwrap()
            .map(Cached::into_value)
    }

    #[test]
    fn test_get_nonexistent_value_is_miss() {
        let cache = Memoizer::new();
        let fn1 = Scope::new("fn1");

        assert_eq!(lookup(&cache, &fn1, &params1()), None);
        assert_eq!(cache.stats().gets_misses, 1);
    }

    #[test]
    fn test_set_then_get_with_identical_parameters() {
        let cache = Memoizer::new();
        let fn1 = Scope::new("fn1");

        cache
            .set(&fn1, &params1(), returned(1, "two", true), SetOptions::new())
            .unwrap();

        // a freshly built, structurally equal id sequence finds the entry
        assert_eq!(
            lookup(&cache, &fn1, &(1, "two", Flag { d: true })),
            returned(1, "two", true)
        );
        assert_eq!(lookup(&cache, &fn1, &params2()), None);
    }

    #[test]
    fn test_scope_isolation() {
        let cache = Memoizer::new();
        let fn1 = Scope::new("same-name");
        let fn2 = Scope::new("same-name");

        cache
            .set(&fn1, &params1(), returned(1, "two", true), SetOptions::new())
            .unwrap();

        assert_eq!(lookup(&cache, &fn2, &params1()), None);
        assert_eq!(lookup(&cache, &fn1, &params1()), returned(1, "two", true));
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let cache = Memoizer::new();
        let fn1 = Scope::new("fn1");

        cache
            .set(&fn1, &params1(), returned(1, "two", true), SetOptions::new())
            .unwrap();
        assert_eq!(lookup(&cache, &fn1, &params1()), returned(1, "two", true));

        cache
            .set(&fn1, &params1(), returned(9, "nine", false), SetOptions::new())
            .unwrap();
        assert_eq!(lookup(&cache, &fn1, &params1()), returned(9, "nine", false));

        let stats = cache.stats();
        assert_eq!(stats.sets, 2);
        assert_eq!(stats.sets_created, 1);
        assert_eq!(stats.sets_overwrites, 1);
        assert_eq!(stats.cached_entries, 1);
    }

    #[test]
    fn test_undefined_value_is_noop() {
        let cache = Memoizer::new();
        let fn1 = Scope::new("fn1");

        cache.set::<Returned, _>(&fn1, &params1(), None, SetOptions::new()).unwrap();
        assert_eq!(cache.stats(), StatsSnapshot::default());
        assert_eq!(lookup(&cache, &fn1, &params1()), None);

        // an existing entry survives an undefined overwrite
        cache
            .set(&fn1, &params1(), returned(1, "two", true), SetOptions::new())
            .unwrap();
        cache.set::<Returned, _>(&fn1, &params1(), None, SetOptions::new()).unwrap();
        assert_eq!(lookup(&cache, &fn1, &params1()), returned(1, "two", true));
        assert_eq!(cache.stats().sets, 1);
    }

    #[test]
    fn test_falsy_values_are_cached() {
        let cache = Memoizer::new();
        let scope = Scope::new("falsy");

        cache.set(&scope, &("zero",), Some(0i32), SetOptions::new()).unwrap();
        cache.set(&scope, &("false",), Some(false), SetOptions::new()).unwrap();
        cache.set(&scope, &("null",), Some(None::<String>), SetOptions::new()).unwrap();

        assert_eq!(cache.get::<i32, _>(&scope, &("zero",)).unwrap(), Some(Cached::Value(0)));
        assert_eq!(cache.get::<bool, _>(&scope, &("false",)).unwrap(), Some(Cached::Value(false)));
        assert_eq!(
            cache.get::<Option<String>, _>(&scope, &("null",)).unwrap(),
            Some(Cached::Value(None))
        );
        assert_eq!(cache.get::<i32, _>(&scope, &("missing",)).unwrap(), None);
        assert_eq!(cache.stats().gets_hits, 3);
    }

    #[tokio::test]
    async fn test_deferred_result_round_trip() {
        let cache = Memoizer::new();
        let scope = Scope::new("deferred");

        cache
            .set(&scope, &(7,), Some(vec!["a", "b"]), SetOptions::new().deferred(true))
            .unwrap();

        let hit = cache.get::<Vec<&str>, _>(&scope, &(7,)).unwrap().unwrap();
        assert!(hit.is_deferred());
        assert_eq!(hit.await, vec!["a", "b"]);

        // overwriting without the flag hands back a plain value again
        cache.set(&scope, &(7,), Some(vec!["c"]), SetOptions::new()).unwrap();
        let hit = cache.get::<Vec<&str>, _>(&scope, &(7,)).unwrap().unwrap();
        assert_eq!(hit, Cached::Value(vec!["c"]));
    }

    #[test]
    fn test_not_serializable_leaves_cache_untouched() {
        let cache = Memoizer::new();
        let scope = Scope::new("bad-ids");

        let err = cache
            .set(&scope, &(1u32, u128::MAX), Some("v"), SetOptions::new())
            .unwrap_err();
        match err {
            MemoizeError::NotSerializable { index, type_name, .. } => {
                assert_eq!(index, 1);
                assert_eq!(type_name, "u128");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = cache.get::<&str, _>(&scope, &(1u32, u128::MAX)).unwrap_err();
        assert!(err.is_not_serializable());

        let stats = cache.stats();
        assert_eq!(stats, StatsSnapshot::default());
        assert_eq!(stats.cached_scopes, 0);
    }

    #[test]
    fn test_dynamic_ids_and_keyed_access() {
        let cache = Memoizer::new();
        let scope = Scope::new("dynamic");

        let ids = Ids::new().push(&1).unwrap().push(&"two").unwrap();
        cache.set(&scope, &ids, Some(3u8), SetOptions::new()).unwrap();

        let key = CacheKey::derive(&(1, "two")).unwrap();
        assert_eq!(cache.get_keyed::<u8>(&scope, &key).unwrap(), Some(Cached::Value(3)));

        let with_placeholder = Ids::new().push(&1).unwrap().push(&"two").unwrap().undefined();
        assert_eq!(cache.get::<u8, _>(&scope, &with_placeholder).unwrap(), None);
    }

    #[test]
    fn test_clear_removes_only_given_scopes() {
        let cache = Memoizer::new();
        let fn1 = Scope::new("fn1");
        let fn2 = Scope::new("fn2");
        let fn3 = Scope::new("fn3");

        cache.set(&fn1, &params1(), returned(1, "two", true), SetOptions::new()).unwrap();
        cache.set(&fn2, &params2(), returned(2, "four", false), SetOptions::new()).unwrap();
        cache.set(&fn3, &params3(), returned(3, "eight", true), SetOptions::new()).unwrap();

        cache.clear([&fn3]);

        assert!(lookup(&cache, &fn1, &params1()).is_some());
        assert!(lookup(&cache, &fn2, &params2()).is_some());
        assert!(lookup(&cache, &fn3, &params3()).is_none());

        cache.clear([&fn2, &fn1]);

        assert!(lookup(&cache, &fn1, &params1()).is_none());
        assert!(lookup(&cache, &fn2, &params2()).is_none());
        assert!(lookup(&cache, &fn3, &params3()).is_none());

        let stats = cache.stats();
        assert_eq!(stats.clears, 2);
        assert_eq!(stats.sets, 3);
        assert_eq!(stats.cached_scopes, 3);
        assert_eq!(stats.cached_entries, 0);
    }

    #[test]
    fn test_clear_unknown_scope_is_vacuous() {
        let cache = Memoizer::new();
        let never_used = Scope::new("never-used");

        cache.clear([&never_used]);
        cache.clear(std::iter::empty());

        let stats = cache.stats();
        assert_eq!(stats.clears, 2);
        assert_eq!(stats.cached_scopes, 0);
    }

    #[test]
    fn test_clear_all_removes_everything() {
        let cache = Memoizer::new();
        let fn1 = Scope::new("fn1");
        let fn2 = Scope::new("fn2");

        cache.set(&fn1, &params1(), returned(1, "two", true), SetOptions::new()).unwrap();
        cache.set(&fn2, &params2(), returned(2, "four", false), SetOptions::new()).unwrap();

        cache.clear_all();

        assert_eq!(cache.cached_scopes(), 0);
        assert!(lookup(&cache, &fn1, &params1()).is_none());
        assert!(lookup(&cache, &fn2, &params2()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_lifecycle() {
        let cache = Memoizer::new();
        let fn1 = Scope::new("fn1");
        let fn2 = Scope::new("fn2");
        let fn3 = Scope::new("fn3");

        lookup(&cache, &fn1, &params1());
        lookup(&cache, &fn2, &params2());
        lookup(&cache, &fn3, &params3());

        cache.set(&fn1, &params1(), returned(1, "two", true), SetOptions::new()).unwrap();
        cache.set(&fn2, &params2(), returned(2, "four", false), SetOptions::new()).unwrap();
        cache.set(&fn3, &params3(), returned(3, "eight", true), SetOptions::new()).unwrap();

        lookup(&cache, &fn1, &params1());
        lookup(&cache, &fn2, &params2());
        lookup(&cache, &fn3, &params3());

        cache.clear([&fn1]);

        lookup(&cache, &fn1, &params1());
        lookup(&cache, &fn2, &params2());
        lookup(&cache, &fn3, &params3());

        cache.set(&fn1, &params1(), returned(1, "two", true), SetOptions::new()).unwrap();
        cache
            .set(&fn2, &params2(), returned(2, "four", false), SetOptions::new().max_age_ms(100))
            .unwrap();
        cache.set(&fn3, &params3(), returned(3, "eight", true), SetOptions::new()).unwrap();

        assert_eq!(
            cache.stats(),
            StatsSnapshot {
                gets: 9,
                gets_hits: 5,
                gets_misses: 4,
                sets: 6,
                sets_created: 4,
                sets_overwrites: 2,
                clears: 1,
                expirations: 0,
                pending_expirations: 1,
                cached_entries: 3,
                cached_scopes: 3,
            }
        );

        cache.clear_all();
        assert_eq!(cache.stats(), StatsSnapshot::default());

        lookup(&cache, &fn1, &params1());
        lookup(&cache, &fn2, &params2());
        lookup(&cache, &fn3, &params3());

        assert_eq!(
            cache.stats(),
            StatsSnapshot {
                gets: 3,
                gets_misses: 3,
                cached_scopes: 3,
                ..StatsSnapshot::default()
            }
        );
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let cache = Memoizer::new();
        let json = serde_json::to_value(cache.stats()).unwrap();

        assert_eq!(json["getsHits"], 0);
        assert_eq!(json["pendingExpirations"], 0);
        assert_eq!(json["cachedScopes"], 0);
    }
}
