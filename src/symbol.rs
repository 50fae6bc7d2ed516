use fxhash::FxBuildHasher;
use indexmap::IndexMap;

/// Insertion-ordered map used for variable, label and flag tables.
pub type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

pub fn fx_map<K, V>() -> FxMap<K, V> {
    IndexMap::with_hasher(FxBuildHasher::default())
}

/// Canonical form of a variable or label name: trimmed and lowercase.
pub fn canonical(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Whether `name` can be used as a label or variable name.
pub fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || matches!(c, '_' | '@' | '?' | '$') => (),
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '?' | '$'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names() {
        assert_eq!(canonical("  Msg1 "), "msg1");
        assert_eq!(canonical("LOOP_START"), "loop_start");
    }

    #[test]
    fn identifiers() {
        assert!(is_ident("msg"));
        assert!(is_ident("_tmp2"));
        assert!(is_ident("@@again"));
        assert!(!is_ident("2nd"));
        assert!(!is_ident("buf+2"));
        assert!(!is_ident(""));
        assert!(!is_ident("'a'"));
    }
}
