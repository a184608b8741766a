use proptest::prelude::*;
use solarcms::query::{QueryBuilder, QueryString, ShaperConfig};
use solarcms::collection::{Collection, CollectionSchema};
use std::sync::Arc;

fn empty_col() -> Arc<Collection> {
    Arc::new(Collection::new(CollectionSchema::new("prop")))
}

proptest! {
    #[test]
    fn prop_skip_is_page_minus_one_times_limit(page in 1i64..10_000, limit in 1i64..=100) {
        let col = empty_col();
        let qs = QueryString::parse(&format!("page={page}&limit={limit}"));
        let cfg = ShaperConfig::default();
        let (q, p) = cfg.shaper(col.find(), &qs).paginate().into_parts();
        let p = p.unwrap();
        prop_assert_eq!(p.page, page as u64);
        prop_assert_eq!(p.limit, limit as u64);
        prop_assert_eq!(p.skip, (page as u64 - 1) * limit as u64);
        prop_assert_eq!(q.options().skip, Some(p.skip));
        prop_assert_eq!(q.options().limit, Some(p.limit));
    }

    #[test]
    fn prop_any_input_yields_valid_window(page in any::<i64>(), limit in any::<i64>(), max in 1u64..500) {
        let col = empty_col();
        let qs = QueryString::parse(&format!("page={page}&limit={limit}"));
        let cfg = ShaperConfig { max_page_size: max, default_page_size: 1, ..ShaperConfig::default() };
        let p = cfg.shaper(col.find(), &qs).paginate().pagination().unwrap();
        prop_assert!(p.page >= 1);
        prop_assert!(p.limit >= 1 && p.limit <= max);
        prop_assert_eq!(p.skip, (p.page - 1).saturating_mul(p.limit));
    }

    #[test]
    fn prop_reserved_keys_never_filter(
        key in prop::sample::select(vec!["page", "sort", "limit", "fields", "search", "q"]),
        val in "[a-z0-9]{0,8}",
        field in "[a-z]{1,8}",
    ) {
        let col = empty_col();
        let qs: QueryString = [(key, val.clone()), (field.as_str(), val.clone())].into_iter().collect();
        let cfg = ShaperConfig::default();
        let q = cfg.shaper(col.find(), &qs).filter().into_query();
        let filter = q.filter_document();
        prop_assert!(!filter.contains_key(key));
        if field != key {
            prop_assert!(filter.contains_key(&field));
        }
    }
}
