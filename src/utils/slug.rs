/// Lowercases ASCII letters and digits, collapsing every other run into a single `-`.
/// Non-ASCII letters are kept as they are.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn collapses_separators() {
        assert_eq!(slugify("  Men's  Shoes & Boots "), "men-s-shoes-boots");
        assert_eq!(slugify("T-Shirts"), "t-shirts");
        assert_eq!(slugify("--"), "");
    }

    #[test]
    fn keeps_unicode_letters() {
        assert_eq!(slugify("Élan Vital"), "élan-vital");
    }
}
