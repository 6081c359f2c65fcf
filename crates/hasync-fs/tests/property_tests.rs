use std::collections::HashSet;

use hasync_fs::{filename_from_name, slugify};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_slug_is_safe_and_stable(s in "\\PC*") {
        let slug = slugify(&s);

        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        prop_assert!(!slug.starts_with('_') && !slug.ends_with('_'));
        prop_assert!(!slug.contains("__"));
        // Slugging a slug changes nothing
        prop_assert_eq!(slugify(&slug), slug);
    }

    #[test]
    fn test_name_filenames_never_collide(names in prop::collection::vec("[A-Za-z ]{0,12}", 1..20)) {
        let mut used = HashSet::new();
        for (i, name) in names.iter().enumerate() {
            let key = format!("entry{i}");
            let filename = filename_from_name(name, &key, &used).unwrap();
            prop_assert!(filename.ends_with(".yaml"));
            prop_assert!(!used.contains(&filename), "duplicate {}", filename);
            used.insert(filename);
        }
    }
}
