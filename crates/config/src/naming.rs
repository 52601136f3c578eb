//! Method name tokenization
//!
//! SDK method names are PascalCase; the leading token is the raw verb the
//! manifest keys on and the remainder is the raw noun.

/// Split a PascalCase SDK method name into its raw verb token and the
/// remaining noun part.
///
/// `DescribeInstances` → `("Describe", "Instances")`. A name with no
/// second token yields an empty noun; an empty name yields two empty
/// strings.
pub fn split_method_name(method_name: &str) -> (String, String) {
    let chars: Vec<char> = method_name.chars().collect();
    let mut boundary = chars.len();
    for (index, ch) in chars.iter().enumerate().skip(1) {
        if ch.is_uppercase() {
            boundary = index;
            break;
        }
    }
    (
        chars[..boundary].iter().collect(),
        chars[boundary..].iter().collect(),
    )
}
