use uuid::Uuid;

const FALLBACK_SLUG: &str = "restaurant";
const DISAMBIGUATOR_LEN: usize = 6;
const MAX_ATTEMPTS: usize = 8;

/// Lowercase, alphanumerics only, separated by single hyphens.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

pub fn base_restaurant_slug(name: &str, city: &str, state: &str) -> String {
    let slug = slugify(&format!("{name} {city} {state}"));
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

pub fn disambiguate(base: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{base}-{}", &token[..DISAMBIGUATOR_LEN])
}

/// Picks `base` when free, otherwise a randomly disambiguated form.
///
/// `taken` must report slugs of every restaurant ever created, removed ones included.
pub fn unique_slug<E>(
    base: &str,
    mut taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<Option<String>, E> {
    if !taken(base)? {
        return Ok(Some(base.to_string()));
    }

    for _ in 0..MAX_ATTEMPTS {
        let candidate = disambiguate(base);
        if !taken(&candidate)? {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}
