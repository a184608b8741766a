use proptest::prelude::*;
use solarcms::collection::{Collection, CollectionSchema};
use solarcms::document::Document;
use solarcms::query::{QueryBuilder, QueryString, ShaperConfig};
use std::sync::Arc;

proptest! {
    #[test]
    fn prop_two_key_sort_is_ordered(v in proptest::collection::vec((0i64..20, any::<i64>()), 0..50)) {
        let col = Arc::new(Collection::new(CollectionSchema::new("srt")));
        for (a, b) in &v {
            col.insert_document(Document::new(bson::doc! {"a": *a, "b": *b})).unwrap();
        }
        let qs = QueryString::parse("sort=a,-b&limit=100");
        let cfg = ShaperConfig::default();
        let docs = cfg.shaper(col.find(), &qs).sort().paginate().into_query().exec().unwrap();
        prop_assert_eq!(docs.len(), v.len());
        for w in docs.windows(2) {
            let (a0, b0) = (w[0].get_i64("a").unwrap(), w[0].get_i64("b").unwrap());
            let (a1, b1) = (w[1].get_i64("a").unwrap(), w[1].get_i64("b").unwrap());
            prop_assert!(a0 < a1 || (a0 == a1 && b0 >= b1));
        }
    }
}
