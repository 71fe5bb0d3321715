use std::cmp::Ordering;

/// Namespace for comparing strings as **slugs**: only their ASCII
/// alphanumeric characters count, and those are compared case-insensitively.
///
/// Under these rules `"QUEUE_CAPACITY"`, `"QueueCapacity"`, `"queue-capacity"`
/// and `"queuecapacity"` are all the same slug. The accepted drawback is that
/// slugs differing only by punctuation cannot be told apart.
pub struct Slug;

impl Slug {
    /// Reports whether the two strings are equivalent as slugs, without
    /// allocating.
    pub fn eq_as_slugs(a: &str, b: &str) -> bool {
        Self::cmp_as_slugs(a, b) == Ordering::Equal
    }

    /// Totally orders the two strings as slugs, without allocating.
    pub fn cmp_as_slugs(a: &str, b: &str) -> Ordering {
        let iter_a = a
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase());
        let iter_b = b
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase());

        iter_a.cmp(iter_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn equivalent_spellings() {
        for spelling in ["queue_capacity", "QueueCapacity", "queue-capacity", "++QUEUE capacity!"] {
            assert!(
                Slug::eq_as_slugs("queuecapacity", spelling),
                "`{}` should match",
                spelling,
            );
        }
    }

    #[test]
    fn different_slugs() {
        assert!(!Slug::eq_as_slugs("queue_capacity", "queue_capacities"));
        assert!(!Slug::eq_as_slugs("workers", ""));
    }

    #[test]
    fn ordering() {
        assert_eq!(Slug::cmp_as_slugs("a_b", "AB"), Ordering::Equal);
        assert_eq!(Slug::cmp_as_slugs("abc", "abd"), Ordering::Less);
        assert_eq!(Slug::cmp_as_slugs("abcd", "ab-c"), Ordering::Greater);
    }
}
